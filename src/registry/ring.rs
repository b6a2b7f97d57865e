/*!
 * Finished Ring
 * Fixed-capacity history buffer with explicit head and logical-to-physical mapping
 *
 * `head` is the physical slot the next push writes; `len` counts live entries.
 * The oldest live entry sits at `(head + capacity - len) % capacity`.
 */

/// Mutable ring over caller-owned slots and cursor fields
pub(crate) struct FinishedRing<'a, T> {
    slots: &'a mut [T],
    head: &'a mut u32,
    len: &'a mut u32,
}

impl<'a, T: Copy> FinishedRing<'a, T> {
    pub fn new(slots: &'a mut [T], head: &'a mut u32, len: &'a mut u32) -> Self {
        Self { slots, head, len }
    }

    /// Append, overwriting the oldest entry once full
    pub fn push(&mut self, item: T) {
        let capacity = self.slots.len();
        if capacity == 0 {
            return;
        }
        let head = *self.head as usize % capacity;
        self.slots[head] = item;
        *self.head = ((head + 1) % capacity) as u32;
        if (*self.len as usize) < capacity {
            *self.len += 1;
        }
    }
}

/// Read-only ordered view of a ring
pub(crate) struct RingView<'a, T> {
    slots: &'a [T],
    head: u32,
    len: u32,
}

impl<T> Clone for RingView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RingView<'_, T> {}

impl<'a, T> RingView<'a, T> {
    pub fn new(slots: &'a [T], head: u32, len: u32) -> Self {
        Self { slots, head, len }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live entries, clamped so a corrupt cursor never reads past capacity
    pub fn len(&self) -> usize {
        (self.len as usize).min(self.capacity())
    }

    /// Physical slot of the `logical`-th oldest entry
    pub fn physical_index(&self, logical: usize) -> usize {
        let capacity = self.capacity();
        (self.head as usize % capacity + capacity - self.len() + logical) % capacity
    }

    pub fn get(&self, logical: usize) -> Option<&'a T> {
        if logical >= self.len() {
            return None;
        }
        self.slots.get(self.physical_index(logical))
    }

    /// Most recently pushed entry
    pub fn latest(&self) -> Option<&'a T> {
        self.len().checked_sub(1).and_then(|last| self.get(last))
    }

    /// Oldest surviving entry first
    pub fn iter(&self) -> impl Iterator<Item = &'a T> + 'a {
        let view = *self;
        (0..view.len()).filter_map(move |logical| view.get(logical))
    }
}
