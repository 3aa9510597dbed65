use std::sync::Arc;

pub(super) use super::reduce;
pub(super) use super::transition;
pub(super) use super::AssistEffect;
pub(super) use crate::actions::Action;
pub(super) use crate::state::AppState;
pub(super) use crate::state::ChatSession;
pub(super) use crate::state::CosmosDbHealth;
pub(super) use crate::state::CosmosDbStatus;
pub(super) use crate::state::DraftedDocument;
pub(super) use crate::state::Feedback;
pub(super) use crate::state::Message;
pub(super) use crate::state::MessageRole;
pub(super) use crate::state::RequestStatus;
pub(super) use crate::state::Section;
pub(super) use crate::state::SessionId;


fn state() -> AppState {
    AppState::new()
}

fn session(id: &str, title: &str) -> ChatSession {
    ChatSession::new(id, title)
}

fn session_with_messages(id: &str, title: &str, contents: &[&str]) -> ChatSession {
    let messages = contents
        .iter()
        .enumerate()
        .map(|(idx, content)| Message::new(format!("{id}-m{idx}"), MessageRole::User, *content))
        .collect();
    ChatSession::new(id, title).with_messages(messages)
}

fn section(title: &str, content: &str) -> Section {
    Section::new(title, content)
}

fn document(sections: Vec<Section>) -> DraftedDocument {
    DraftedDocument {
        title: "Draft".to_string(),
        sections,
    }
}

fn run(state: AppState, action: Action) -> AppState {
    transition(state, action)
}

fn with_history(history: Vec<ChatSession>, current: Option<ChatSession>) -> AppState {
    let state = run(state(), Action::FetchChatHistory(Some(history)));
    match current {
        Some(current) => run(state, Action::UpdateCurrentChat(Some(current))),
        None => state,
    }
}

fn history_ids(state: &AppState) -> Vec<String> {
    state
        .history_sessions()
        .unwrap_or_default()
        .iter()
        .map(|session| session.id.to_string())
        .collect()
}

fn history_titles(state: &AppState) -> Vec<String> {
    state
        .history_sessions()
        .unwrap_or_default()
        .iter()
        .map(|session| session.title.clone())
        .collect()
}

fn current_title(state: &AppState) -> Option<String> {
    state.current_session().map(|session| session.title.clone())
}

fn shared(a: Option<&Arc<ChatSession>>, b: Option<&Arc<ChatSession>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}
