use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use super::actions::Action;
use super::error::AssistError;
use super::state::AppState;
use super::state::ChatSession;
use super::state::CurrentChat;
use super::state::RequestStatus;
use super::state::Section;
use super::state::SessionId;

/// Persistence work a transition asks the network layer to carry out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssistEffect {
    PersistChatTitle { id: SessionId, title: String },
    DeleteConversation { id: SessionId },
    DeleteAllConversations,
    ClearConversationMessages { id: SessionId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: AppState,
    pub effects: Vec<AssistEffect>,
}

/// `(state, action) -> state`, dropping the effects.
pub fn transition(state: AppState, action: Action) -> AppState {
    reduce(state, action).state
}

/// Applies one action. Never performs I/O and never panics; the only
/// failure (an invalid section update) is logged and leaves state as is.
pub fn reduce(state: AppState, action: Action) -> Transition {
    let mut state = state;
    let mut effects = Vec::new();
    tracing::debug!(kind = action.kind(), "reduce");

    match action {
        Action::SetLoading(status) => {
            state.loading = status;
        }
        Action::ToggleChatHistory => {
            state.is_chat_history_open = !state.is_chat_history_open;
        }
        Action::UpdateCurrentChat(session) => {
            state.current_chat = session.map(|session| {
                CurrentChat::new(state.sessions.upsert(Arc::new(session)))
            });
            state.loading = RequestStatus::Idle;
            state.prune_sessions();
        }
        Action::UpdateChatHistoryLoadingState(status) => {
            state.chat_history_loading = status;
        }
        Action::UpdateChatHistory(session) => {
            update_chat_history(&mut state, session);
        }
        Action::UpdateChatTitle { id, title } => {
            effects.extend(update_chat_title(&mut state, id, title));
        }
        Action::DeleteChatEntry(id) => {
            effects.extend(delete_chat_entry(&mut state, id));
        }
        Action::DeleteChatHistory => {
            state.chat_history = Some(Vec::new());
            state.filtered_chat_history.clear();
            state.current_chat = None;
            state.sessions.clear();
            effects.push(AssistEffect::DeleteAllConversations);
        }
        Action::DeleteCurrentChatMessages => {
            effects.extend(delete_current_chat_messages(&mut state));
        }
        Action::FetchChatHistory(sessions) => {
            fetch_chat_history(&mut state, sessions);
        }
        Action::SetCosmosDbStatus(health) => {
            state.cosmos_db = health;
        }
        Action::FetchFrontendSettings(settings) => {
            state.frontend_settings = settings.map(Arc::new);
        }
        Action::SetFeedbackState {
            answer_id,
            feedback,
        } => {
            state.feedback.insert(answer_id, feedback);
        }
        Action::UpdateSection {
            section_idx,
            section,
        } => {
            update_section(&mut state, section_idx, section);
        }
        Action::UpdateDraftedDocument(document) => {
            state.drafted_document = document.map(Arc::new);
        }
        Action::UpdateBrowseChat(session) => {
            state.browse_chat = session.map(Arc::new);
        }
        Action::UpdateGenerateChat(session) => {
            state.generate_chat = session.map(Arc::new);
        }
        Action::UpdateDraftedDocumentTitle(title) => {
            state.drafted_document_title = title;
        }
        Action::SetGenerating(status) => {
            state.generation = status;
        }
        Action::SetIsRequestInitiated(status) => {
            state.section_request = status;
        }
        Action::AddFailedSection(section) => {
            add_failed_section(&mut state, section);
        }
        Action::RemoveFailedSection { section } => {
            state
                .failed_sections
                .retain(|failed| failed.title != section.title);
        }
        Action::SetSectionApiReqStatus(status) => {
            state.failed_section_retry = status;
        }
        Action::FilterChatHistory { query } => {
            filter_chat_history(&mut state, &query);
        }
    }

    Transition { state, effects }
}

// A matching history slot takes the live current chat, not the payload.
fn update_chat_history(state: &mut AppState, session: ChatSession) {
    let (Some(history), Some(current)) = (state.chat_history.as_mut(), state.current_chat.as_mut())
    else {
        return;
    };

    match history.iter().position(|id| *id == session.id) {
        Some(index) => {
            if current.messages_cleared {
                state.sessions.clear_messages(&current.id);
                current.messages_cleared = false;
            }
            history[index] = current.id.clone();
            // Ids stay unique: an older slot holding the current id is
            // dropped. No DeleteConversation is emitted for the replaced entry.
            let mut slot = 0;
            history.retain(|id| {
                let keep = slot == index || *id != current.id;
                slot += 1;
                keep
            });
        }
        None if session.id == current.id => {
            if current.messages_cleared {
                state.sessions.clear_messages(&current.id);
                current.messages_cleared = false;
            }
            history.push(current.id.clone());
        }
        None => {
            history.push(state.sessions.upsert(Arc::new(session)));
        }
    }
    state.prune_sessions();
}

fn update_chat_title(state: &mut AppState, id: SessionId, title: String) -> Option<AssistEffect> {
    let Some(history) = state.chat_history.as_ref() else {
        state.chat_history = Some(Vec::new());
        return None;
    };
    if !history.contains(&id) || !state.sessions.set_title(&id, &title) {
        return None;
    }
    Some(AssistEffect::PersistChatTitle { id, title })
}

fn delete_chat_entry(state: &mut AppState, id: SessionId) -> Option<AssistEffect> {
    state.current_chat = None;
    let effect = match state.chat_history.as_mut() {
        Some(history) => {
            history.retain(|entry| *entry != id);
            Some(AssistEffect::DeleteConversation { id })
        }
        None => None,
    };
    if state.chat_history.is_none() {
        state.chat_history = Some(Vec::new());
    }
    state.prune_sessions();
    effect
}

// The history entry keeps its messages; only the current view is cleared.
fn delete_current_chat_messages(state: &mut AppState) -> Option<AssistEffect> {
    if state.chat_history.is_none() {
        return None;
    }
    let current = state.current_chat.as_mut()?;
    current.messages_cleared = true;
    Some(AssistEffect::ClearConversationMessages {
        id: current.id.clone(),
    })
}

fn fetch_chat_history(state: &mut AppState, sessions: Option<Vec<ChatSession>>) {
    let Some(sessions) = sessions else {
        state.chat_history = None;
        state.prune_sessions();
        return;
    };

    // The live current chat keeps its table entry; the fetched copy of it
    // is only listed by id.
    let current = state.current_chat.as_ref().map(|chat| chat.id.clone());
    let mut seen = BTreeSet::new();
    let mut history = Vec::with_capacity(sessions.len());
    for session in sessions {
        if !seen.insert(session.id.clone()) {
            tracing::warn!(id = %session.id, "duplicate session id in fetched history");
            continue;
        }
        if current.as_ref() == Some(&session.id) {
            history.push(session.id);
            continue;
        }
        history.push(state.sessions.upsert(Arc::new(session)));
    }
    state.chat_history = Some(history);
    state.prune_sessions();
}

fn update_section(state: &mut AppState, section_idx: usize, section: Section) {
    let updated = state
        .drafted_document
        .as_deref()
        .ok_or(AssistError::NoDraftedDocument)
        .and_then(|document| document.with_section(section_idx, section));

    match updated {
        Ok(document) => state.drafted_document = Some(Arc::new(document)),
        Err(err) => tracing::error!(error = %err, "section not found"),
    }
}

fn add_failed_section(state: &mut AppState, section: Section) {
    if state
        .failed_sections
        .iter()
        .any(|failed| failed.title == section.title)
    {
        return;
    }
    state.failed_sections.push(section);
}

fn filter_chat_history(state: &mut AppState, query: &str) {
    let needle = query.trim().to_lowercase();
    let history = state.chat_history.as_deref().unwrap_or_default();
    state.filtered_chat_history = history
        .iter()
        .filter(|id| {
            needle.is_empty()
                || state
                    .sessions
                    .get(id)
                    .is_some_and(|session| session.title.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect();
}

#[cfg(test)]
mod tests;
