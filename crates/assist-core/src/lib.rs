pub mod actions;
pub mod config;
pub mod error;
pub mod journal;
pub mod reducer;
pub mod state;
pub mod store;

pub use actions::*;
pub use reducer::*;
pub use state::*;

pub use config::Config;
pub use error::{AssistError, Result};
pub use journal::*;
pub use store::Store;
