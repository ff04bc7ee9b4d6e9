//! In-process timers backing the durable action table

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use relay_core::{ActionKind, ScheduledAction};
use tokio::task::AbortHandle;

/// (tenant, customer, kind); at most one live timer per key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerKey {
    pub tenant_id: String,
    pub customer_phone: String,
    pub kind: ActionKind,
}

impl From<&ScheduledAction> for TimerKey {
    fn from(action: &ScheduledAction) -> Self {
        Self {
            tenant_id: action.tenant_id.clone(),
            customer_phone: action.customer_phone.clone(),
            kind: action.kind,
        }
    }
}

struct TimerEntry {
    action_id: String,
    handle: AbortHandle,
}

/// Sleeping timer tasks by key
#[derive(Default)]
pub struct TimerTable {
    entries: DashMap<TimerKey, TimerEntry>,
}

impl TimerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the timer spawned by `spawn`, aborting a sleeping
    /// predecessor with the same key.
    ///
    /// The key stays locked while `spawn` runs, so the new task cannot
    /// release itself before it is registered.
    pub fn arm<F>(&self, key: TimerKey, action_id: String, spawn: F)
    where
        F: FnOnce() -> AbortHandle,
    {
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                occupied.get().handle.abort();
                let handle = spawn();
                occupied.insert(TimerEntry { action_id, handle });
            }
            Entry::Vacant(vacant) => {
                let handle = spawn();
                vacant.insert(TimerEntry { action_id, handle });
            }
        }
    }

    /// Called by a timer when it wakes. Returns `false` if the key now
    /// belongs to another action.
    pub fn release(&self, key: &TimerKey, action_id: &str) -> bool {
        self.entries
            .remove_if(key, |_, entry| entry.action_id == action_id)
            .is_some()
    }

    /// Number of sleeping timers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Abort every sleeping timer; armed rows stay in the store
    pub fn abort_all(&self) {
        for entry in self.entries.iter() {
            entry.handle.abort();
        }
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn key() -> TimerKey {
        TimerKey {
            tenant_id: "t1".into(),
            customer_phone: "+1".into(),
            kind: ActionKind::CartReminder1,
        }
    }

    fn sleeper() -> AbortHandle {
        tokio::spawn(tokio::time::sleep(Duration::from_secs(3600))).abort_handle()
    }

    #[tokio::test]
    async fn test_rearm_aborts_previous() {
        let table = TimerTable::new();
        table.arm(key(), "a1".into(), sleeper);
        table.arm(key(), "a2".into(), sleeper);

        assert_eq!(table.len(), 1);
        assert!(!table.release(&key(), "a1"));
        assert!(table.release(&key(), "a2"));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_abort_all() {
        let table = TimerTable::new();
        table.arm(key(), "a1".into(), sleeper);
        table.abort_all();
        assert!(table.is_empty());
    }
}
