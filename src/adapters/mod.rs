// Adapters layer: concrete implementations of the domain ports (in-memory store, local files, JSON snapshot and its lock, seed import).

pub mod lock;
pub mod memory;
pub mod seed;
pub mod snapshot;
pub mod storage;

pub use lock::SnapshotLock;
pub use memory::{MemoryStore, StoreState};
pub use snapshot::SnapshotFile;
pub use storage::LocalStorage;
