/*!
 * Shared Memory Storage
 * POSIX shared memory segment backing the cross-process registry
 */

use super::layout::segment_len;
use super::storage::RegistryStorage;
use crate::core::errors::TrackerError;
use crate::core::limits::SHM_MODE;
use crate::core::types::{TableLayout, TrackerResult};
use nix::fcntl::OFlag;
use nix::sys::mman::{mmap, munmap, shm_open, shm_unlink, MapFlags, ProtFlags};
use nix::sys::stat::Mode;
use std::fs::File;
use std::num::NonZeroUsize;
use std::ptr::NonNull;
use tracing::{debug, info};

/// Mapping of a named POSIX shared memory segment
#[derive(Debug)]
pub struct ShmStorage {
    name: String,
    base: NonNull<u8>,
    len: usize,
    created: bool,
    mapped: bool,
}

// The mapping is shared memory; access is serialized by the registry lock.
unsafe impl Send for ShmStorage {}

impl ShmStorage {
    /// Open or create the segment `name` sized for `layout` and map it
    pub fn open(name: &str, layout: TableLayout) -> TrackerResult<Self> {
        let expected = segment_len(layout);

        let fd = shm_open(
            name,
            OFlag::O_CREAT | OFlag::O_RDWR,
            Mode::from_bits_truncate(SHM_MODE as libc::mode_t),
        )
        .map_err(shm_error("shm_open", name))?;
        let file = File::from(fd);

        // A fresh segment has length zero and reads as zeroes once sized
        let current = file.metadata()?.len();
        let created = current == 0;
        if created {
            file.set_len(expected as u64)?;
        } else if current != expected as u64 {
            return Err(TrackerError::SegmentSize {
                expected,
                found: current,
            });
        }

        let length = NonZeroUsize::new(expected).ok_or_else(|| {
            TrackerError::InvalidConfig(format!("empty registry layout {}", layout))
        })?;
        // SAFETY: fresh mapping chosen by the kernel, file sized above
        let mapped = unsafe {
            mmap(
                None,
                length,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &file,
                0,
            )
        }
        .map_err(shm_error("mmap", name))?;

        info!(
            segment = name,
            bytes = expected,
            created,
            "Mapped registry shared memory segment"
        );

        Ok(Self {
            name: name.to_string(),
            base: mapped.cast(),
            len: expected,
            created,
            mapped: true,
        })
    }

    /// Whether this open sized a brand-new segment
    pub fn created(&self) -> bool {
        self.created
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remove the segment name. Processes still mapped keep their view.
    pub fn unlink(name: &str) -> TrackerResult<()> {
        shm_unlink(name).map_err(shm_error("shm_unlink", name))
    }

    fn unmap(&mut self) -> TrackerResult<()> {
        if !self.mapped {
            return Ok(());
        }
        self.mapped = false;
        // SAFETY: base/len describe the mapping created in `open`
        unsafe { munmap(self.base.cast(), self.len) }.map_err(shm_error("munmap", &self.name))
    }
}

fn shm_error(op: &'static str, name: &str) -> impl FnOnce(nix::Error) -> TrackerError {
    let name = name.to_string();
    move |source| TrackerError::SharedMemory { op, name, source }
}

unsafe impl RegistryStorage for ShmStorage {
    fn base(&self) -> NonNull<u8> {
        self.base
    }

    fn len(&self) -> usize {
        self.len
    }

    fn describe(&self) -> String {
        format!("shared memory segment {} ({} bytes)", self.name, self.len)
    }

    fn detach(mut self: Box<Self>) -> TrackerResult<()> {
        self.unmap()?;
        debug!(segment = %self.name, "Unmapped registry segment");
        Ok(())
    }
}

impl Drop for ShmStorage {
    fn drop(&mut self) {
        let _ = self.unmap();
    }
}
