//! The coordinator's lease registry: one entry per leased ino, each
//! independently CAS-renewed. Grounded in `manager/lease/lease_table.cpp`.

use super::LEASE_PERIOD;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::Instant;

struct LeaseEntry {
    state: Mutex<(Instant, String)>,
}

impl LeaseEntry {
    fn new(holder: String) -> Self {
        Self {
            state: Mutex::new((Instant::now() + LEASE_PERIOD, holder)),
        }
    }

    /// Atomically renew the lease for `holder` if it has expired.
    fn cas(&self, holder: &str) -> LeaseOutcome {
        let mut state = self.state.lock().unwrap();
        let (due, current_holder) = &mut *state;
        if Instant::now() >= *due {
            *due = Instant::now() + LEASE_PERIOD;
            *current_holder = holder.to_string();
            LeaseOutcome::Granted { expires_at: *due }
        } else {
            LeaseOutcome::Held {
                current_holder: current_holder.clone(),
                expires_at: *due,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseOutcome {
    Granted { expires_at: Instant },
    Held { current_holder: String, expires_at: Instant },
}

impl LeaseOutcome {
    pub fn granted(&self) -> bool {
        matches!(self, LeaseOutcome::Granted { .. })
    }
}

/// The coordinator's process-wide lease registry.
///
/// The original's destructor treats tearing down a live lease table as
/// fatal (it logs and calls `exit(1)`): a C++ process could reach that
/// destructor early through a dangling global pointer while clients still
/// held leases, silently losing track of who owned what. In this design
/// the table is owned by the coordinator's single long-lived
/// `Environment` (see `environment.rs`) rather than a global, so nothing
/// in normal operation ever drops it before process exit — the ownership
/// model itself rules out the scenario the original's abort guarded
/// against, and no runtime check is needed to reproduce that guarantee.
pub struct LeaseTable {
    entries: RwLock<HashMap<u64, std::sync::Arc<LeaseEntry>>>,
}

impl LeaseTable {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Try to acquire (or renew) the lease on `ino` for `holder`.
    pub fn acquire(&self, ino: u64, holder: &str) -> LeaseOutcome {
        if let Some(entry) = self.entries.read().unwrap().get(&ino) {
            return entry.cas(holder);
        }

        let mut entries = self.entries.write().unwrap();
        match entries.get(&ino) {
            Some(entry) => entry.cas(holder),
            None => {
                let entry = std::sync::Arc::new(LeaseEntry::new(holder.to_string()));
                let expires_at = entry.state.lock().unwrap().0;
                entries.insert(ino, entry);
                LeaseOutcome::Granted { expires_at }
            }
        }
    }
}

impl Default for LeaseTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn first_acquire_grants() {
        let t = LeaseTable::new();
        assert!(t.acquire(1, "a").granted());
    }

    #[test]
    fn second_holder_is_denied_before_expiry() {
        let t = LeaseTable::new();
        assert!(t.acquire(1, "a").granted());
        let outcome = t.acquire(1, "b");
        match outcome {
            LeaseOutcome::Held { current_holder, .. } => assert_eq!(current_holder, "a"),
            LeaseOutcome::Granted { .. } => panic!("expected denial"),
        }
    }

    #[test]
    fn same_holder_is_held_before_expiry() {
        // The table never re-grants a live lease, even to its own holder:
        // the client short-circuits via `is_mine` before ever calling the
        // coordinator, so a second acquire this soon only happens if that
        // cache was stale.
        let t = LeaseTable::new();
        assert!(t.acquire(1, "a").granted());
        let outcome = t.acquire(1, "a");
        match outcome {
            LeaseOutcome::Held { current_holder, .. } => assert_eq!(current_holder, "a"),
            LeaseOutcome::Granted { .. } => panic!("expected the live lease to be held, not re-granted"),
        }
    }

    #[test]
    #[ignore = "sleeps past LEASE_PERIOD; run explicitly, not in the default fast suite"]
    fn same_holder_renews_after_expiry() {
        let t = LeaseTable::new();
        assert!(t.acquire(1, "a").granted());
        sleep(LEASE_PERIOD + std::time::Duration::from_millis(50));
        assert!(t.acquire(1, "a").granted());
    }

    #[test]
    fn distinct_inos_are_independent() {
        let t = LeaseTable::new();
        assert!(t.acquire(1, "a").granted());
        assert!(t.acquire(2, "b").granted());
    }

    #[test]
    #[ignore = "sleeps past LEASE_PERIOD; run explicitly, not in the default fast suite"]
    fn lease_is_reassignable_after_expiry() {
        let t = LeaseTable::new();
        assert!(t.acquire(1, "a").granted());
        sleep(LEASE_PERIOD + std::time::Duration::from_millis(50));
        assert!(t.acquire(1, "b").granted());
    }
}
