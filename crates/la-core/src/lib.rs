pub mod error;
pub mod imaging;
pub mod job;
pub mod prompt;
mod model_types;

pub use error::{Error, Result};
pub use job::{LineartJob, PromptInputs};
pub use model_types::LineartMode;
