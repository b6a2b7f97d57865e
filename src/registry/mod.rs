/*!
 * Registry Module
 * Cross-process allocation registry: layout, storage backends and operations
 */

mod layout;
mod lock;
pub mod manager;
mod ring;
pub mod shm;
pub mod storage;
pub mod types;

// Re-export public API
pub use manager::Registry;
pub use shm::ShmStorage;
pub use storage::{InMemoryStorage, RegistryStorage};
pub use types::{AllocationEvent, ProcessRecord};
