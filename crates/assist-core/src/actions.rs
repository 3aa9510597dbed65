use serde::Deserialize;
use serde::Serialize;

use super::error::AssistError;
use super::error::Result;
use super::state::ChatSession;
use super::state::CosmosDbHealth;
use super::state::DraftedDocument;
use super::state::Feedback;
use super::state::RequestStatus;
use super::state::Section;
use super::state::SessionId;

/// Every state change the UI core understands.
///
/// On the wire an action is `{"type": KIND, "payload": ...}`; see
/// [`decode_action`] for handling kinds this enum does not know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    SetLoading(RequestStatus),
    ToggleChatHistory,
    UpdateCurrentChat(Option<ChatSession>),
    UpdateChatHistoryLoadingState(RequestStatus),
    UpdateChatHistory(ChatSession),
    UpdateChatTitle {
        id: SessionId,
        title: String,
    },
    DeleteChatEntry(SessionId),
    DeleteChatHistory,
    DeleteCurrentChatMessages,
    FetchChatHistory(Option<Vec<ChatSession>>),
    #[serde(rename = "SET_COSMOSDB_STATUS")]
    SetCosmosDbStatus(CosmosDbHealth),
    FetchFrontendSettings(Option<serde_json::Value>),
    SetFeedbackState {
        #[serde(rename = "answerId", alias = "answer_id")]
        answer_id: String,
        feedback: Feedback,
    },
    UpdateSection {
        #[serde(rename = "sectionIdx", alias = "section_idx")]
        section_idx: usize,
        section: Section,
    },
    UpdateDraftedDocument(Option<DraftedDocument>),
    UpdateBrowseChat(Option<ChatSession>),
    UpdateGenerateChat(Option<ChatSession>),
    UpdateDraftedDocumentTitle(String),
    #[serde(alias = "GENERATE_ISLODING")]
    SetGenerating(RequestStatus),
    SetIsRequestInitiated(RequestStatus),
    AddFailedSection(Section),
    #[serde(alias = "REMOVED_FAILED_SECTION")]
    RemoveFailedSection {
        section: Section,
    },
    #[serde(alias = "UPDATE_SECTION_API_REQ_STATUS")]
    SetSectionApiReqStatus(RequestStatus),
    FilterChatHistory {
        query: String,
    },
}

pub const ACTION_KINDS: [&str; 24] = [
    "SET_LOADING",
    "TOGGLE_CHAT_HISTORY",
    "UPDATE_CURRENT_CHAT",
    "UPDATE_CHAT_HISTORY_LOADING_STATE",
    "UPDATE_CHAT_HISTORY",
    "UPDATE_CHAT_TITLE",
    "DELETE_CHAT_ENTRY",
    "DELETE_CHAT_HISTORY",
    "DELETE_CURRENT_CHAT_MESSAGES",
    "FETCH_CHAT_HISTORY",
    "SET_COSMOSDB_STATUS",
    "FETCH_FRONTEND_SETTINGS",
    "SET_FEEDBACK_STATE",
    "UPDATE_SECTION",
    "UPDATE_DRAFTED_DOCUMENT",
    "UPDATE_BROWSE_CHAT",
    "UPDATE_GENERATE_CHAT",
    "UPDATE_DRAFTED_DOCUMENT_TITLE",
    "SET_GENERATING",
    "SET_IS_REQUEST_INITIATED",
    "ADD_FAILED_SECTION",
    "REMOVE_FAILED_SECTION",
    "SET_SECTION_API_REQ_STATUS",
    "FILTER_CHAT_HISTORY",
];

// Spellings older dispatchers still emit.
const LEGACY_ACTION_KINDS: [&str; 3] = [
    "GENERATE_ISLODING",
    "REMOVED_FAILED_SECTION",
    "UPDATE_SECTION_API_REQ_STATUS",
];

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetLoading(_) => "SET_LOADING",
            Self::ToggleChatHistory => "TOGGLE_CHAT_HISTORY",
            Self::UpdateCurrentChat(_) => "UPDATE_CURRENT_CHAT",
            Self::UpdateChatHistoryLoadingState(_) => "UPDATE_CHAT_HISTORY_LOADING_STATE",
            Self::UpdateChatHistory(_) => "UPDATE_CHAT_HISTORY",
            Self::UpdateChatTitle { .. } => "UPDATE_CHAT_TITLE",
            Self::DeleteChatEntry(_) => "DELETE_CHAT_ENTRY",
            Self::DeleteChatHistory => "DELETE_CHAT_HISTORY",
            Self::DeleteCurrentChatMessages => "DELETE_CURRENT_CHAT_MESSAGES",
            Self::FetchChatHistory(_) => "FETCH_CHAT_HISTORY",
            Self::SetCosmosDbStatus(_) => "SET_COSMOSDB_STATUS",
            Self::FetchFrontendSettings(_) => "FETCH_FRONTEND_SETTINGS",
            Self::SetFeedbackState { .. } => "SET_FEEDBACK_STATE",
            Self::UpdateSection { .. } => "UPDATE_SECTION",
            Self::UpdateDraftedDocument(_) => "UPDATE_DRAFTED_DOCUMENT",
            Self::UpdateBrowseChat(_) => "UPDATE_BROWSE_CHAT",
            Self::UpdateGenerateChat(_) => "UPDATE_GENERATE_CHAT",
            Self::UpdateDraftedDocumentTitle(_) => "UPDATE_DRAFTED_DOCUMENT_TITLE",
            Self::SetGenerating(_) => "SET_GENERATING",
            Self::SetIsRequestInitiated(_) => "SET_IS_REQUEST_INITIATED",
            Self::AddFailedSection(_) => "ADD_FAILED_SECTION",
            Self::RemoveFailedSection { .. } => "REMOVE_FAILED_SECTION",
            Self::SetSectionApiReqStatus(_) => "SET_SECTION_API_REQ_STATUS",
            Self::FilterChatHistory { .. } => "FILTER_CHAT_HISTORY",
        }
    }
}

pub fn is_known_kind(kind: &str) -> bool {
    ACTION_KINDS.contains(&kind) || LEGACY_ACTION_KINDS.contains(&kind)
}

/// Decodes a dispatched wire value.
///
/// An unrecognized kind yields `Ok(None)`, which callers apply as the
/// identity transition. A known kind with a malformed payload is an error.
pub fn decode_action(value: serde_json::Value) -> Result<Option<Action>> {
    let Some(kind) = value.get("type").and_then(serde_json::Value::as_str) else {
        return Err(AssistError::MissingActionKind);
    };
    if !is_known_kind(kind) {
        tracing::debug!(kind, "ignoring unrecognized action kind");
        return Ok(None);
    }
    let kind = kind.to_string();
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| AssistError::InvalidAction { kind, source })
}
