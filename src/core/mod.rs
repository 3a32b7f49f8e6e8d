pub mod auto_assign;
pub mod capacity;
pub mod ledger;
pub mod locks;
pub mod manual_assign;
pub mod pairing;
pub mod partner_match;
pub mod service;

pub use crate::domain::model::{FillType, MAX_PER_PROVIDER};
pub use crate::domain::ports::{FillRepository, Storage};
pub use crate::utils::error::Result;
