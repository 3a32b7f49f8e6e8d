pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::TomlConfig;

pub use crate::adapters::{LocalStorage, MemoryStore, SnapshotFile, SnapshotLock};
pub use crate::core::manual_assign::AssignmentRequest;
pub use crate::core::partner_match::MatchSession;
pub use crate::core::service::{EngineSettings, FillService, PointsRequest};
pub use crate::utils::error::{FillError, Result};
