// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide per-conversation flow state.
//!
//! An injectable keyed store rather than a static, so tests get
//! isolated instances. Entries live for process uptime; conversation
//! close does not evict them, the next delivery simply finds the old
//! state and the engine resets via its own rules.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::state::FlowState;

/// Concurrent map of conversation id to its flow state. The per-entry
/// mutex is the lock granularity for read-modify-write of one
/// conversation.
#[derive(Default)]
pub struct FlowStateStore {
    map: DashMap<String, Arc<Mutex<FlowState>>>,
}

impl FlowStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or lazily create the state cell for a conversation.
    pub fn entry(&self, conversation_id: &str) -> Arc<Mutex<FlowState>> {
        self.map
            .entry(conversation_id.to_string())
            .or_default()
            .clone()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Stage;

    #[tokio::test]
    async fn entry_is_get_or_create_and_stable() {
        let store = FlowStateStore::new();
        let a = store.entry("c1");
        {
            let mut state = a.lock().await;
            state.stage = Stage::FollowUpPrompt;
        }
        let b = store.entry("c1");
        assert_eq!(b.lock().await.stage, Stage::FollowUpPrompt);
        assert_eq!(store.len(), 1);

        store.entry("c2");
        assert_eq!(store.len(), 2);
    }
}
