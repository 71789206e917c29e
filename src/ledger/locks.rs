/// In-process lock registry serializing balance mutations per account
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Held locks; dropping it releases every account
#[derive(Debug)]
pub struct AccountGuard {
    accounts: Vec<i64>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl AccountGuard {
    pub fn accounts(&self) -> &[i64] {
        &self.accounts
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccountLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every account in `ids`, always in ascending order
    pub async fn acquire(&self, ids: &[i64]) -> AccountGuard {
        let mut accounts = ids.to_vec();
        accounts.sort_unstable();
        accounts.dedup();

        let mutexes: Vec<Arc<AsyncMutex<()>>> = {
            let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Nobody else references these, so they are free to go
            map.retain(|_, m| Arc::strong_count(m) > 1);
            accounts
                .iter()
                .map(|id| map.entry(*id).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }

        AccountGuard {
            accounts,
            _guards: guards,
        }
    }

    /// Number of accounts with a live lock entry
    pub fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
