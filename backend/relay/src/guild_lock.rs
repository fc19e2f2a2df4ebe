//! Per-guild playback exclusivity.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use encore_core::{BusyPolicy, GuildId, RelayError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Held for the whole life of one relay. Dropping it lets the next `play`
/// for the guild proceed.
#[derive(Debug)]
pub struct GuildGuard {
    guild: GuildId,
    _guard: OwnedMutexGuard<()>,
}

impl GuildGuard {
    pub fn guild(&self) -> GuildId {
        self.guild
    }
}

/// At most one relay per guild holds a [`GuildGuard`] at a time.
pub struct GuildLocks {
    policy: BusyPolicy,
    locks: StdMutex<HashMap<GuildId, Arc<Mutex<()>>>>,
}

impl GuildLocks {
    pub fn new(policy: BusyPolicy) -> Self {
        Self {
            policy,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> BusyPolicy {
        self.policy
    }

    fn lock_for(&self, guild: GuildId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Entries nobody holds or waits on can go.
        locks.retain(|g, lock| *g == guild || Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(guild).or_default())
    }

    /// Take the guild's playback slot according to the busy policy.
    pub async fn acquire(&self, guild: GuildId) -> Result<GuildGuard, RelayError> {
        let lock = self.lock_for(guild);
        let guard = match self.policy {
            BusyPolicy::Reject => lock.try_lock_owned().map_err(|_| {
                debug!(%guild, "Guild already has an active playback; rejecting");
                RelayError::Busy(guild)
            })?,
            BusyPolicy::Queue => {
                if let Ok(guard) = Arc::clone(&lock).try_lock_owned() {
                    guard
                } else {
                    debug!(%guild, "Guild busy; waiting for the current playback");
                    lock.lock_owned().await
                }
            }
        };
        Ok(GuildGuard {
            guild,
            _guard: guard,
        })
    }

    /// Whether a relay currently holds the guild's slot.
    pub fn is_busy(&self, guild: GuildId) -> bool {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .get(&guild)
            .is_some_and(|lock| lock.try_lock().is_err())
    }
}
