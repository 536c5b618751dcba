use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local};

/// What the bot knows about a single user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct UserStats {
    pub username: Option<String>,
    pub first_interaction: DateTime<Local>,
    pub last_interaction: DateTime<Local>,
    pub message_count: u64,
}

impl UserStats {
    /// Days since the first interaction, counting the first day as 1.
    pub fn days_active(&self, now: DateTime<Local>) -> i64 {
        (now - self.first_interaction).num_days() + 1
    }
}

/// In-memory interaction statistics, lost on restart.
#[derive(Clone)]
pub(crate) struct StatsManager {
    inner: Arc<Mutex<StatsManagerInner>>,
}

struct StatsManagerInner {
    users: HashMap<u64, UserStats>,
}

impl StatsManager {
    pub fn new() -> Self {
        let inner = StatsManagerInner {
            users: HashMap::new(),
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn record_interaction(&self, user_id: u64, username: Option<&str>) {
        self.record_interaction_at(user_id, username, Local::now())
    }

    pub fn record_interaction_at(
        &self,
        user_id: u64,
        username: Option<&str>,
        now: DateTime<Local>,
    ) {
        self.with_mut_inner(|inner| {
            let stats = inner.users.entry(user_id).or_insert_with(|| UserStats {
                username: None,
                first_interaction: now,
                last_interaction: now,
                message_count: 0,
            });
            stats.message_count += 1;
            stats.last_interaction = now;
            if let Some(username) = username {
                stats.username = Some(username.to_owned());
            }
        });
    }

    pub fn get_user_stats(&self, user_id: u64) -> Option<UserStats> {
        self.with_mut_inner(|inner| inner.users.get(&user_id).cloned())
    }

    fn with_mut_inner<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut StatsManagerInner) -> R,
    {
        let mut inner_mut = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut inner_mut)
    }
}
