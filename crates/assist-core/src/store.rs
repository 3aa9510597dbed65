use super::actions::decode_action;
use super::actions::Action;
use super::config::JournalConfig;
use super::error::Result;
use super::journal::ActionJournal;
use super::journal::StateSnapshot;
use super::journal::SNAPSHOT_VERSION;
use super::reducer::reduce;
use super::reducer::AssistEffect;
use super::state::AppState;

/// Serial owner of the current state. Each dispatch is journaled (when a
/// journal is attached) before its transition is applied.
#[derive(Debug, Default)]
pub struct Store {
    state: AppState,
    journal: Option<ActionJournal>,
    snapshot_every: u64,
    since_snapshot: u64,
}

impl Store {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// Restores the latest state from `journal` and keeps appending to it.
    pub fn with_journal(journal: ActionJournal, snapshot_every: u64) -> Result<Self> {
        let state = journal.restore()?;
        tracing::info!(
            path = %journal.path().display(),
            seq = journal.last_seq(),
            "restored state from journal"
        );
        Ok(Self {
            state,
            journal: Some(journal),
            snapshot_every,
            since_snapshot: 0,
        })
    }

    /// Store for the given settings; an in-memory store when journaling is
    /// disabled or has no path.
    pub fn open(config: &JournalConfig) -> Result<Self> {
        match (&config.path, config.enabled) {
            (Some(path), true) => {
                Self::with_journal(ActionJournal::open(path)?, config.snapshot_every)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn snapshot(&self) -> AppState {
        self.state.clone()
    }

    pub fn into_state(self) -> AppState {
        self.state
    }

    pub fn dispatch(&mut self, action: Action) -> Result<Vec<AssistEffect>> {
        let seq = match self.journal.as_mut() {
            Some(journal) => Some(journal.append(&action)?),
            None => None,
        };

        let transition = reduce(std::mem::take(&mut self.state), action);
        self.state = transition.state;

        if let Some(seq) = seq {
            self.since_snapshot = self.since_snapshot.saturating_add(1);
            if self.snapshot_every > 0 && self.since_snapshot >= self.snapshot_every {
                // The action is already journaled and applied; a failed
                // snapshot only costs replay time.
                if let Err(err) = self.write_snapshot(seq) {
                    tracing::warn!(seq, error = %err, "failed to write state snapshot");
                }
            }
        }
        Ok(transition.effects)
    }

    /// Dispatches a raw wire value. Unknown kinds leave state untouched and
    /// are not journaled.
    pub fn dispatch_value(&mut self, value: serde_json::Value) -> Result<Vec<AssistEffect>> {
        match decode_action(value)? {
            Some(action) => self.dispatch(action),
            None => Ok(Vec::new()),
        }
    }

    fn write_snapshot(&mut self, seq: u64) -> Result<()> {
        let Some(journal) = self.journal.as_ref() else {
            return Ok(());
        };
        journal.save_snapshot(&StateSnapshot {
            version: SNAPSHOT_VERSION,
            seq,
            state: self.state.clone(),
        })?;
        self.since_snapshot = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;
    use crate::state::ChatSession;
    use crate::state::SessionId;

    #[test]
    fn dispatch_applies_transition_and_returns_effects() {
        let mut store = Store::new(AppState::new());
        store
            .dispatch(Action::FetchChatHistory(Some(vec![ChatSession::new("1", "one")])))
            .expect("dispatch");

        let effects = store
            .dispatch(Action::DeleteChatEntry(SessionId::from("1")))
            .expect("dispatch");

        assert_eq!(
            effects,
            vec![AssistEffect::DeleteConversation {
                id: SessionId::from("1"),
            }]
        );
        assert_eq!(store.state().chat_history, Some(Vec::new()));
    }

    #[test]
    fn unknown_wire_kind_is_identity() {
        let mut store = Store::new(AppState::new());
        store
            .dispatch_value(json!({ "type": "TOGGLE_CHAT_HISTORY" }))
            .expect("dispatch");
        let before = store.snapshot();

        let effects = store
            .dispatch_value(json!({ "type": "SOMETHING_NEW", "payload": 1 }))
            .expect("dispatch");

        assert!(effects.is_empty());
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn malformed_wire_payload_is_rejected_without_change() {
        let mut store = Store::new(AppState::new());
        let before = store.snapshot();

        let result = store.dispatch_value(json!({ "type": "UPDATE_SECTION", "payload": "x" }));

        assert!(result.is_err());
        assert_eq!(store.into_state(), before);
    }

    #[test]
    fn journaled_store_restores_after_reopen() {
        let dir = tempdir().expect("tmpdir");
        let config = JournalConfig {
            enabled: true,
            path: Some(dir.path().join("journal").join("actions.jsonl")),
            snapshot_every: 2,
        };

        let mut store = Store::open(&config).expect("open");
        store
            .dispatch(Action::FetchChatHistory(Some(vec![
                ChatSession::new("1", "one"),
                ChatSession::new("2", "two"),
            ])))
            .expect("dispatch");
        store
            .dispatch(Action::UpdateCurrentChat(Some(ChatSession::new("2", "two"))))
            .expect("dispatch");
        store.dispatch(Action::ToggleChatHistory).expect("dispatch");
        let expected = store.into_state();

        let reopened = Store::open(&config).expect("reopen");
        assert_eq!(reopened.state(), &expected);

        let journal = ActionJournal::open(config.path.as_ref().expect("path")).expect("journal");
        let snapshot = journal
            .load_snapshot()
            .expect("load snapshot")
            .expect("snapshot written");
        assert_eq!(snapshot.seq, 2);
        assert_eq!(journal.load_since(snapshot.seq).expect("tail").len(), 1);
    }

    #[test]
    fn snapshot_failure_does_not_fail_dispatch() {
        let dir = tempdir().expect("tmpdir");
        let path = dir.path().join("actions.jsonl");
        let journal = ActionJournal::open(&path).expect("open");
        let snapshot_path = journal.snapshot_path().to_path_buf();
        let mut store = Store::with_journal(journal, 1).expect("store");
        std::fs::create_dir_all(&snapshot_path).expect("block snapshot path");

        let effects = store.dispatch(Action::ToggleChatHistory).expect("dispatch");

        assert!(effects.is_empty());
        assert!(store.state().is_chat_history_open);
        let journal = ActionJournal::open(&path).expect("reopen");
        assert_eq!(journal.last_seq(), 1);
    }

    #[test]
    fn disabled_journal_keeps_store_in_memory() {
        let dir = tempdir().expect("tmpdir");
        let path = dir.path().join("actions.jsonl");
        let config = JournalConfig {
            enabled: false,
            path: Some(path.clone()),
            snapshot_every: 1,
        };

        let mut store = Store::open(&config).expect("open");
        store.dispatch(Action::ToggleChatHistory).expect("dispatch");

        assert!(store.state().is_chat_history_open);
        assert!(!path.exists());
    }
}
