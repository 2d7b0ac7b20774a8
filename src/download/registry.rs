// Player Core - Video download and playback core
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Latest-status table for hosts that poll instead of subscribing
//!
//! A terminal status is handed out once and then forgotten. Terminal
//! entries nobody asks for are pruned once the table grows past
//! [`MAX_FINISHED_ENTRIES`].

use crate::download::progress::TransferStatus;
use std::collections::HashMap;
use std::sync::Mutex;

/// Unread terminal statuses kept before the oldest are dropped
pub const MAX_FINISHED_ENTRIES: usize = 64;

#[derive(Debug, Default)]
pub struct StatusRegistry {
    entries: Mutex<HashMap<String, Entry>>,
}

#[derive(Debug)]
struct Entry {
    status: TransferStatus,
    seq: u64,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the newest status for `task_id`
    pub fn record(&self, task_id: &str, status: TransferStatus) {
        let mut entries = self.lock();
        let seq = entries.values().map(|e| e.seq).max().map_or(0, |s| s + 1);
        entries.insert(task_id.to_string(), Entry { status, seq });
        prune_finished(&mut entries);
    }

    /// Latest status for `task_id`; terminal statuses are removed on read
    pub fn take(&self, task_id: &str) -> Option<TransferStatus> {
        let mut entries = self.lock();
        let status = entries.get(task_id)?.status.clone();
        if status.is_terminal() {
            entries.remove(task_id);
        }
        Some(status)
    }

    /// Number of tracked tasks
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn prune_finished(entries: &mut HashMap<String, Entry>) {
    let mut finished: Vec<(u64, String)> = entries
        .iter()
        .filter(|(_, e)| e.status.is_terminal())
        .map(|(id, e)| (e.seq, id.clone()))
        .collect();
    if finished.len() <= MAX_FINISHED_ENTRIES {
        return;
    }

    finished.sort_unstable();
    let excess = finished.len() - MAX_FINISHED_ENTRIES;
    for (_, id) in finished.into_iter().take(excess) {
        entries.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_status_stays_until_terminal_read() {
        let registry = StatusRegistry::new();
        registry.record("t1", TransferStatus::started());
        registry.record("t1", TransferStatus::running(40));

        assert_eq!(registry.take("t1"), Some(TransferStatus::running(40)));
        assert_eq!(registry.take("t1"), Some(TransferStatus::running(40)));

        registry.record("t1", TransferStatus::succeeded());
        assert_eq!(registry.take("t1"), Some(TransferStatus::succeeded()));
        assert_eq!(registry.take("t1"), None);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_unread_finished_entries_are_bounded() {
        let registry = StatusRegistry::new();
        registry.record("running", TransferStatus::running(10));
        for i in 0..(MAX_FINISHED_ENTRIES + 20) {
            registry.record(&format!("done-{}", i), TransferStatus::failed(0, "Download cancelled"));
        }

        assert_eq!(registry.len(), MAX_FINISHED_ENTRIES + 1);
        assert_eq!(registry.take("running"), Some(TransferStatus::running(10)));
        assert_eq!(registry.take("done-0"), None);
        let newest = format!("done-{}", MAX_FINISHED_ENTRIES + 19);
        assert!(registry.take(&newest).is_some());
    }
}
