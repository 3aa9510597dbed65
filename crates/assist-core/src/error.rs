use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssistError>;

#[derive(Error, Debug)]
pub enum AssistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Action value has no \"type\" tag")]
    MissingActionKind,

    #[error("Invalid payload for {kind}: {source}")]
    InvalidAction {
        kind: String,
        source: serde_json::Error,
    },

    #[error("Section {index} not found (document has {len} sections)")]
    SectionOutOfBounds { index: usize, len: usize },

    #[error("Section update without a drafted document")]
    NoDraftedDocument,
}
