//! Intent routing: maps NLU intent identifiers to device handlers.

mod dispatcher;
pub mod handlers;

pub use dispatcher::Dispatcher;
pub use dispatcher::DispatcherBuilder;
pub use dispatcher::Handler;
pub use dispatcher::FALLBACK_REPLY;

use crate::devices::Device;

/// Parameters extracted by the NLU service, keyed by parameter name.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// What a handler answers with.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Conversational response, shown and spoken.
    pub text: String,

    /// The device that changed, so its UI row can be refreshed.
    pub updated: Option<Device>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            updated: None,
        }
    }

    pub fn with_update(text: impl Into<String>, device: Device) -> Self {
        Self {
            text: text.into(),
            updated: Some(device),
        }
    }
}
