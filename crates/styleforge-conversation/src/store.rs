// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrent conversation state store.
//!
//! A dashmap keyed by account id: different accounts' conversations make
//! progress concurrently without cross-account interference, while one
//! account's accesses are last-write-wins. No process-wide singleton; the
//! store is constructed once and injected.

use dashmap::DashMap;
use styleforge_core::AccountId;
use tracing::debug;

use crate::state::ConversationState;

/// Injected state-store abstraction over a concurrency-safe map.
#[derive(Default)]
pub struct ConversationStore {
    states: DashMap<AccountId, ConversationState>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the account's current state, if any.
    pub fn get(&self, account: AccountId) -> Option<ConversationState> {
        self.states.get(&account).map(|entry| entry.clone())
    }

    /// Store (or overwrite) the account's state. Last write wins.
    pub fn set(&self, state: ConversationState) {
        debug!(account = %state.account, action = %state.action, "conversation state stored");
        self.states.insert(state.account, state);
    }

    /// Remove the account's state, if any.
    pub fn clear(&self, account: AccountId) {
        if self.states.remove(&account).is_some() {
            debug!(account = %account, "conversation state cleared");
        }
    }

    /// Apply a transition result: store the next state or clear the slot.
    pub fn apply(&self, account: AccountId, next: Option<ConversationState>) {
        match next {
            Some(state) => self.set(state),
            None => self.clear(account),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Action;
    use styleforge_core::MessageRef;

    fn state(account: i64, prompt: &str) -> ConversationState {
        ConversationState::new(
            AccountId(account),
            Action::AwaitingStyleSelection,
            prompt.into(),
            MessageRef(format!("msg-{account}")),
        )
    }

    #[test]
    fn set_get_clear_roundtrip() {
        let store = ConversationStore::new();
        assert!(store.get(AccountId(1)).is_none());

        store.set(state(1, "a fox"));
        assert_eq!(store.get(AccountId(1)).unwrap().prompt, "a fox");

        store.clear(AccountId(1));
        assert!(store.get(AccountId(1)).is_none());
    }

    #[test]
    fn last_write_wins() {
        let store = ConversationStore::new();
        store.set(state(1, "first"));
        store.set(state(1, "second"));
        assert_eq!(store.get(AccountId(1)).unwrap().prompt, "second");
    }

    #[test]
    fn apply_clears_on_none() {
        let store = ConversationStore::new();
        store.set(state(1, "a fox"));
        store.apply(AccountId(1), None);
        assert!(store.get(AccountId(1)).is_none());
    }

    #[tokio::test]
    async fn concurrent_accounts_do_not_interfere() {
        let store = std::sync::Arc::new(ConversationStore::new());

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.set(state(i, &format!("prompt-{i}")));
                    store.get(AccountId(i)).unwrap()
                })
            })
            .collect();

        for (i, task) in tasks.into_iter().enumerate() {
            let seen = task.await.unwrap();
            assert_eq!(seen.prompt, format!("prompt-{i}"));
        }
        for i in 0..32 {
            assert_eq!(store.get(AccountId(i)).unwrap().prompt, format!("prompt-{i}"));
        }
    }
}
