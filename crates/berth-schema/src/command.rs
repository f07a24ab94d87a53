use crate::types::Action;
use serde::{Deserialize, Serialize};

/// Body of a lifecycle request: `{"command": "run"}`.
///
/// The command is kept as raw text so that a missing key and an unknown verb
/// can both be answered with an unchanged outcome instead of a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
        }
    }

    /// The recognized action, if the request carries one.
    pub fn action(&self) -> Option<Action> {
        self.command.as_deref().and_then(|c| c.parse().ok())
    }
}

impl From<Action> for CommandRequest {
    fn from(action: Action) -> Self {
        Self::new(action.as_str())
    }
}
