use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::model::ActivityId;

/// 每個活動一把非同步鎖，讓「讀容量再寫指派」在同一活動內序列化
///
/// Entries are never removed, so an id that comes back after its activity
/// was deleted still maps to the same mutex.
#[derive(Debug, Default, Clone)]
pub struct ActivityLocks {
    locks: Arc<Mutex<HashMap<ActivityId, Arc<AsyncMutex<()>>>>>,
}

impl ActivityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, activity: ActivityId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            locks
                .entry(activity)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
