//! Per-learner mutual exclusion.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use upnext_core::UserId;

/// Hands out one async mutex per learner.
///
/// Read-modify-write cycles on a learner's roadmap or timeline hold the
/// learner's guard, so two completions for the same learner never interleave
/// while different learners proceed in parallel.
#[derive(Default, Clone)]
pub struct UserLocks {
    locks: Arc<Mutex<HashMap<UserId, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user`.
    pub async fn lock(&self, user: &UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(user.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_user_is_serialized() {
        let locks = UserLocks::new();
        let user = UserId::from("u1");

        let guard = locks.lock(&user).await;
        let locks2 = locks.clone();
        let user2 = user.clone();
        let waiter = tokio::spawn(async move {
            let _g = locks2.lock(&user2).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_users_do_not_block() {
        let locks = UserLocks::new();
        let _a = locks.lock(&UserId::from("a")).await;
        let acquired = tokio::time::timeout(Duration::from_millis(50), locks.lock(&UserId::from("b"))).await;
        assert!(acquired.is_ok());
    }
}
