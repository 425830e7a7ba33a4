//! Failed login tracking.
//!
//! Counts failures per key inside a window. Once the limit is reached the
//! key is locked until the window has passed.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Clone, Debug)]
struct AttemptEntry {
    failures: u32,
    window_start: DateTime<Utc>,
    locked_until: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct LoginGuard {
    entries: Mutex<HashMap<String, AttemptEntry>>,
    max_attempts: u32,
    lockout: Duration,
}

impl LoginGuard {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_attempts,
            lockout,
        }
    }

    fn normalize(identifier: &str) -> String {
        identifier.trim().to_lowercase()
    }

    /// Err carries the seconds left on an active lock
    pub fn check(&self, identifier: &str, now: DateTime<Utc>) -> Result<(), i64> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        match entries
            .get(&Self::normalize(identifier))
            .and_then(|entry| entry.locked_until)
        {
            Some(until) if until > now => Err((until - now).num_seconds().max(1)),
            _ => Ok(()),
        }
    }

    /// Record a failure; returns the lock expiry if this failure triggered a lock
    pub fn record_failure(&self, identifier: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let entry = entries
            .entry(Self::normalize(identifier))
            .or_insert_with(|| AttemptEntry {
                failures: 0,
                window_start: now,
                locked_until: None,
            });

        // Check if window has expired
        if now >= entry.window_start + self.lockout {
            entry.failures = 0;
            entry.window_start = now;
            entry.locked_until = None;
        }

        entry.failures += 1;
        if entry.failures >= self.max_attempts && entry.locked_until.is_none() {
            let until = now + self.lockout;
            entry.locked_until = Some(until);
            return Some(until);
        }
        None
    }

    pub fn record_success(&self, identifier: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.remove(&Self::normalize(identifier));
    }

    /// Drop entries whose window and lock have both passed
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| {
            let window_open = now < entry.window_start + self.lockout;
            let locked = entry.locked_until.is_some_and(|until| until > now);
            window_open || locked
        });
        before - entries.len()
    }
}
