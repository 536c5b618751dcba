use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// The decision made for an incoming message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Admission {
    Accept,
    Reject { remaining: Duration },
}

#[cfg(test)]
impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accept)
    }
}

/// Where a user currently is in its cooldown cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CooldownState {
    Idle,
    Cooling { remaining: Duration },
}

/// Enforces a minimum spacing between two accepted messages of the same
/// user.
///
/// The gate remembers when each user was last accepted. A user leaves the
/// cooling state only by the passage of time, which is evaluated lazily
/// the next time the user shows up. Cloned gates share the same state.
#[derive(Clone)]
pub(crate) struct AdmissionGate {
    inner: Arc<Mutex<AdmissionGateInner>>,
}

struct AdmissionGateInner {
    cooldown: Duration,
    retention: Option<Duration>,
    last_accepted: HashMap<u64, Instant>,
}

impl AdmissionGate {
    /// Creates a gate that keeps every user it has seen.
    pub fn new(cooldown: Duration) -> Self {
        Self::with_inner(AdmissionGateInner {
            cooldown,
            retention: None,
            last_accepted: HashMap::new(),
        })
    }

    /// Creates a gate that forgets users who were last accepted at least
    /// `periods` cooldowns ago. `periods` is clamped to 1, so forgetting a
    /// user never changes a decision. A retention too large to represent
    /// keeps every user.
    pub fn with_retention(cooldown: Duration, periods: u32) -> Self {
        Self::with_inner(AdmissionGateInner {
            cooldown,
            retention: cooldown.checked_mul(periods.max(1)),
            last_accepted: HashMap::new(),
        })
    }

    fn with_inner(inner: AdmissionGateInner) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.with_mut_inner(|inner| inner.cooldown)
    }

    /// Decides on a message sent by `user_id` right now.
    pub fn check(&self, user_id: u64) -> Admission {
        self.check_at(user_id, Instant::now())
    }

    /// Decides on a message sent by `user_id` at `now`, recording `now` as
    /// the user's last accepted time on acceptance.
    pub fn check_at(&self, user_id: u64, now: Instant) -> Admission {
        self.with_mut_inner(|inner| {
            if let Some(remaining) = inner.remaining_at(user_id, now) {
                return Admission::Reject { remaining };
            }

            inner.last_accepted.insert(user_id, now);
            if let Some(retention) = inner.retention {
                inner
                    .last_accepted
                    .retain(|_, last| now.saturating_duration_since(*last) < retention);
            }
            Admission::Accept
        })
    }

    /// Returns the state of `user_id` at `now`, without recording anything.
    pub fn state_at(&self, user_id: u64, now: Instant) -> CooldownState {
        self.with_mut_inner(|inner| match inner.remaining_at(user_id, now) {
            Some(remaining) => CooldownState::Cooling { remaining },
            None => CooldownState::Idle,
        })
    }

    /// Number of users currently remembered by the gate.
    pub fn tracked_users(&self) -> usize {
        self.with_mut_inner(|inner| inner.last_accepted.len())
    }

    fn with_mut_inner<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut AdmissionGateInner) -> R,
    {
        // Every update is a single insert or retain, so a poisoned lock
        // still guards a consistent map.
        let mut inner_mut = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut inner_mut)
    }
}

impl AdmissionGateInner {
    fn remaining_at(&self, user_id: u64, now: Instant) -> Option<Duration> {
        let last = self.last_accepted.get(&user_id)?;
        let elapsed = now.saturating_duration_since(*last);
        if elapsed >= self.cooldown {
            None
        } else {
            Some(self.cooldown - elapsed)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(3);

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn unseen_user_is_accepted() {
        let gate = AdmissionGate::new(COOLDOWN);
        let now = Instant::now();
        assert_eq!(gate.state_at(7, now), CooldownState::Idle);
        assert_eq!(gate.check_at(7, now), Admission::Accept);
        assert_eq!(gate.tracked_users(), 1);
    }

    #[test]
    fn cooldown_scenario() {
        let gate = AdmissionGate::new(COOLDOWN);
        let t0 = Instant::now();

        assert_eq!(gate.check_at(42, t0), Admission::Accept);
        assert_eq!(
            gate.check_at(42, t0 + secs(1)),
            Admission::Reject {
                remaining: secs(2)
            }
        );
        assert_eq!(gate.check_at(42, t0 + secs(4)), Admission::Accept);
    }

    #[test]
    fn rejection_does_not_extend_cooldown() {
        let gate = AdmissionGate::new(COOLDOWN);
        let t0 = Instant::now();

        assert!(gate.check_at(1, t0).is_accepted());
        assert!(!gate.check_at(1, t0 + Duration::from_millis(2500)).is_accepted());
        // Still measured from t0, not from the rejected message.
        assert!(gate.check_at(1, t0 + COOLDOWN).is_accepted());
    }

    #[test]
    fn remaining_wait_is_exact() {
        let gate = AdmissionGate::new(COOLDOWN);
        let t0 = Instant::now();
        gate.check_at(5, t0);

        for millis in [1, 999, 1500, 2999] {
            let elapsed = Duration::from_millis(millis);
            assert_eq!(
                gate.check_at(5, t0 + elapsed),
                Admission::Reject {
                    remaining: COOLDOWN - elapsed
                }
            );
        }
    }

    #[test]
    fn elapsed_cooldown_is_accepted_exactly_at_boundary() {
        let gate = AdmissionGate::new(COOLDOWN);
        let t0 = Instant::now();
        gate.check_at(5, t0);
        assert_eq!(gate.state_at(5, t0 + COOLDOWN), CooldownState::Idle);
        assert_eq!(gate.check_at(5, t0 + COOLDOWN), Admission::Accept);
    }

    #[test]
    fn users_are_independent() {
        let gate = AdmissionGate::new(COOLDOWN);
        let now = Instant::now();

        assert!(gate.check_at(1, now).is_accepted());
        assert!(gate.check_at(2, now).is_accepted());
        assert!(!gate.check_at(1, now + secs(1)).is_accepted());
        assert_eq!(
            gate.state_at(2, now + secs(1)),
            CooldownState::Cooling {
                remaining: secs(2)
            }
        );
        assert_eq!(gate.state_at(3, now + secs(1)), CooldownState::Idle);
    }

    #[test]
    fn state_inspection_does_not_mutate() {
        let gate = AdmissionGate::new(COOLDOWN);
        let now = Instant::now();
        gate.state_at(9, now);
        assert_eq!(gate.tracked_users(), 0);
    }

    #[test]
    fn zero_cooldown_never_rejects() {
        let gate = AdmissionGate::new(Duration::ZERO);
        let now = Instant::now();
        assert!(gate.check_at(1, now).is_accepted());
        assert!(gate.check_at(1, now).is_accepted());
    }

    #[test]
    fn without_retention_map_keeps_growing() {
        let gate = AdmissionGate::new(COOLDOWN);
        let t0 = Instant::now();
        for user in 0..100 {
            gate.check_at(user, t0 + secs(user * 10));
        }
        assert_eq!(gate.tracked_users(), 100);
    }

    #[test]
    fn retention_evicts_stale_users() {
        let gate = AdmissionGate::with_retention(COOLDOWN, 2);
        let t0 = Instant::now();

        gate.check_at(1, t0);
        gate.check_at(2, t0 + secs(2));
        assert_eq!(gate.tracked_users(), 2);

        // User 1 is 6s old (== 2 cooldowns) and goes away, user 2 stays.
        gate.check_at(3, t0 + secs(6));
        assert_eq!(gate.tracked_users(), 2);
        assert_eq!(gate.state_at(1, t0 + secs(6)), CooldownState::Idle);
        assert!(gate.check_at(1, t0 + secs(6)).is_accepted());
    }

    #[test]
    fn retention_never_changes_decisions() {
        let gate = AdmissionGate::with_retention(COOLDOWN, 0);
        let t0 = Instant::now();

        gate.check_at(1, t0);
        gate.check_at(2, t0 + secs(1));
        assert_eq!(
            gate.check_at(1, t0 + secs(2)),
            Admission::Reject {
                remaining: secs(1)
            }
        );
    }

    #[test]
    fn oversized_retention_keeps_every_user() {
        let cooldown = Duration::from_secs(10_000_000_000_000_000_000);
        let gate = AdmissionGate::with_retention(cooldown, 2);
        let t0 = Instant::now();

        assert!(gate.check_at(1, t0).is_accepted());
        assert!(gate.check_at(2, t0 + secs(10)).is_accepted());
        assert_eq!(gate.tracked_users(), 2);
        assert!(!gate.check_at(1, t0 + secs(20)).is_accepted());
    }

    #[test]
    fn concurrent_messages_accept_only_once() {
        let gate = AdmissionGate::new(COOLDOWN);
        let now = Instant::now();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = gate.clone();
                thread::spawn(move || gate.check_at(42, now))
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Admission::is_accepted)
            .count();

        assert_eq!(accepted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn check_uses_the_runtime_clock() {
        let gate = AdmissionGate::new(COOLDOWN);

        assert_eq!(gate.check(42), Admission::Accept);
        tokio::time::advance(secs(1)).await;
        assert_eq!(
            gate.check(42),
            Admission::Reject {
                remaining: secs(2)
            }
        );
        tokio::time::advance(secs(3)).await;
        assert_eq!(gate.check(42), Admission::Accept);
    }
}
