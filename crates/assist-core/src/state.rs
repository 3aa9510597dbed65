use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use super::error::AssistError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Arc<str>);

impl SessionId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of one request concern.
///
/// Dispatchers may still send the legacy boolean flags: `true` decodes as
/// `Pending` and `false` as `Idle`. The history-fetch names `loading`,
/// `success` and `fail` are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RequestStatusRepr", rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

impl RequestStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl From<bool> for RequestStatus {
    fn from(active: bool) -> Self {
        if active {
            Self::Pending
        } else {
            Self::Idle
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RequestStatusRepr {
    Flag(bool),
    Named(NamedRequestStatus),
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum NamedRequestStatus {
    Idle,
    #[serde(alias = "loading")]
    Pending,
    #[serde(alias = "success")]
    Succeeded,
    #[serde(alias = "fail")]
    Failed,
}

impl From<RequestStatusRepr> for RequestStatus {
    fn from(repr: RequestStatusRepr) -> Self {
        match repr {
            RequestStatusRepr::Flag(active) => active.into(),
            RequestStatusRepr::Named(NamedRequestStatus::Idle) => Self::Idle,
            RequestStatusRepr::Named(NamedRequestStatus::Pending) => Self::Pending,
            RequestStatusRepr::Named(NamedRequestStatus::Succeeded) => Self::Succeeded,
            RequestStatusRepr::Named(NamedRequestStatus::Failed) => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Neutral,
    Positive,
    Negative,
    MissingCitation,
    WrongCitation,
    OutOfScope,
    InaccurateOrIrrelevant,
    OtherUnhelpful,
    HateSpeech,
    Violent,
    Sexual,
    Manipulative,
    #[serde(alias = "other_harmlful")]
    OtherHarmful,
}

impl Feedback {
    pub fn is_negative(self) -> bool {
        !matches!(self, Self::Neutral | Self::Positive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    Tool,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_turn: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

impl Message {
    pub fn new(id: impl Into<String>, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            end_turn: None,
            date: None,
            feedback: None,
        }
    }
}

fn no_messages() -> Arc<[Message]> {
    Arc::from(Vec::new())
}

/// One conversation. Messages sit behind an `Arc` so title edits and
/// history moves share them with earlier snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: SessionId,
    #[serde(default)]
    pub title: String,
    #[serde(default = "no_messages")]
    pub messages: Arc<[Message]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl ChatSession {
    pub fn new(id: impl Into<SessionId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            messages: no_messages(),
            date: None,
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Arc::from(messages);
        self
    }

    fn without_messages(&self) -> Self {
        Self {
            messages: no_messages(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
}

impl Section {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DraftedDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl DraftedDocument {
    /// Copy of this document with the section at `index` replaced.
    pub fn with_section(&self, index: usize, section: Section) -> Result<Self, AssistError> {
        let len = self.sections.len();
        if index >= len {
            return Err(AssistError::SectionOutOfBounds { index, len });
        }
        let mut sections = self.sections.clone();
        sections[index] = section;
        Ok(Self {
            title: self.title.clone(),
            sections,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CosmosDbStatus {
    #[default]
    #[serde(alias = "CosmosDB is not configured")]
    NotConfigured,
    #[serde(alias = "CosmosDB is not working")]
    NotWorking,
    #[serde(alias = "CosmosDB has invalid credentials")]
    InvalidCredentials,
    #[serde(alias = "CosmosDB has invalid database")]
    InvalidDatabase,
    #[serde(alias = "CosmosDB is configured and working")]
    Working,
}

impl CosmosDbStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::NotConfigured => "CosmosDB is not configured",
            Self::NotWorking => "CosmosDB is not working",
            Self::InvalidCredentials => "CosmosDB has invalid credentials",
            Self::InvalidDatabase => "CosmosDB has invalid database",
            Self::Working => "CosmosDB is configured and working",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CosmosDbHealth {
    #[serde(alias = "cosmosDB")]
    pub cosmos_db: bool,
    pub status: CosmosDbStatus,
}

/// The active conversation, held as an id into [`SessionTable`].
///
/// `messages_cleared` masks the table entry's messages: the current chat
/// shows none while the history entry keeps them, until the live session
/// is written back into history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentChat {
    pub id: SessionId,
    #[serde(default)]
    pub messages_cleared: bool,
}

impl CurrentChat {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            messages_cleared: false,
        }
    }
}

/// Single owner of every chat session a view refers to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionTable {
    entries: BTreeMap<SessionId, Arc<ChatSession>>,
}

impl SessionTable {
    pub fn get(&self, id: &SessionId) -> Option<&Arc<ChatSession>> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SessionId, &Arc<ChatSession>)> {
        self.entries.iter()
    }

    pub fn upsert(&mut self, session: Arc<ChatSession>) -> SessionId {
        let id = session.id.clone();
        self.entries.insert(id.clone(), session);
        id
    }

    pub fn set_title(&mut self, id: &SessionId, title: &str) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        *entry = Arc::new(ChatSession {
            title: title.to_string(),
            ..ChatSession::clone(entry)
        });
        true
    }

    pub fn clear_messages(&mut self, id: &SessionId) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        *entry = Arc::new(entry.without_messages());
        true
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&SessionId) -> bool) {
        self.entries.retain(|id, _| keep(id));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Full snapshot of UI state. Replaced wholesale on every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub loading: RequestStatus,
    pub is_chat_history_open: bool,
    pub sessions: SessionTable,
    pub current_chat: Option<CurrentChat>,
    pub chat_history: Option<Vec<SessionId>>,
    pub filtered_chat_history: Vec<SessionId>,
    pub chat_history_loading: RequestStatus,
    pub cosmos_db: CosmosDbHealth,
    pub frontend_settings: Option<Arc<serde_json::Value>>,
    pub feedback: BTreeMap<String, Feedback>,
    pub drafted_document: Option<Arc<DraftedDocument>>,
    pub drafted_document_title: String,
    pub browse_chat: Option<Arc<ChatSession>>,
    pub generate_chat: Option<Arc<ChatSession>>,
    pub generation: RequestStatus,
    pub section_request: RequestStatus,
    pub failed_sections: Vec<Section>,
    pub failed_section_retry: RequestStatus,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            loading: RequestStatus::Idle,
            is_chat_history_open: false,
            sessions: SessionTable::default(),
            current_chat: None,
            chat_history: None,
            filtered_chat_history: Vec::new(),
            chat_history_loading: RequestStatus::Idle,
            cosmos_db: CosmosDbHealth::default(),
            frontend_settings: None,
            feedback: BTreeMap::new(),
            drafted_document: None,
            drafted_document_title: String::new(),
            browse_chat: None,
            generate_chat: None,
            generation: RequestStatus::Idle,
            section_request: RequestStatus::Idle,
            failed_sections: Vec::new(),
            failed_section_retry: RequestStatus::Idle,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current chat as the UI sees it, with cleared messages applied.
    pub fn current_session(&self) -> Option<Arc<ChatSession>> {
        let current = self.current_chat.as_ref()?;
        let session = self.sessions.get(&current.id)?;
        if current.messages_cleared {
            Some(Arc::new(session.without_messages()))
        } else {
            Some(Arc::clone(session))
        }
    }

    pub fn history_sessions(&self) -> Option<Vec<Arc<ChatSession>>> {
        self.chat_history
            .as_ref()
            .map(|ids| self.resolve_sessions(ids))
    }

    pub fn filtered_sessions(&self) -> Vec<Arc<ChatSession>> {
        self.resolve_sessions(&self.filtered_chat_history)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_pending()
    }

    pub fn is_generating(&self) -> bool {
        self.generation.is_pending()
    }

    pub fn is_request_initiated(&self) -> bool {
        self.section_request.is_pending()
    }

    pub fn is_failed_req_initiated(&self) -> bool {
        self.failed_section_retry.is_pending()
    }

    fn resolve_sessions(&self, ids: &[SessionId]) -> Vec<Arc<ChatSession>> {
        ids.iter()
            .filter_map(|id| self.sessions.get(id).cloned())
            .collect()
    }

    /// Drops table entries and filtered ids no view refers to anymore.
    pub(crate) fn prune_sessions(&mut self) {
        let history = self.chat_history.as_deref().unwrap_or_default();
        self.filtered_chat_history.retain(|id| history.contains(id));
        let current = self.current_chat.as_ref().map(|chat| &chat.id);
        self.sessions
            .retain(|id| history.contains(id) || current == Some(id));
    }
}
