use std::collections::HashMap;

use tracing::debug;

use super::handlers;
use super::Params;
use super::Reply;
use crate::devices::DeviceStore;
use crate::devices::StoreError;

/// Reply used when no handler matches and the NLU service offered nothing.
pub const FALLBACK_REPLY: &str = "I'm not sure how to respond to that.";

/// A handler receives the store, the raw utterance and the NLU parameters.
pub type Handler = fn(&mut DeviceStore, &str, &Params) -> Result<Reply, StoreError>;

/// Table from intent identifier to handler.
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Handler>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut intents: Vec<_> = self.handlers.keys().collect();
        intents.sort();
        f.debug_struct("Dispatcher")
            .field("intents", &intents)
            .finish()
    }
}

/// Builds a [`Dispatcher`] at start-up.
#[derive(Default)]
pub struct DispatcherBuilder {
    handlers: HashMap<String, Handler>,
}

impl DispatcherBuilder {
    /// Bind `handler` to each of `intents`. A later binding for the same
    /// intent replaces an earlier one.
    pub fn on(mut self, intents: &[&str], handler: Handler) -> Self {
        for intent in intents {
            self.handlers.insert((*intent).to_string(), handler);
        }
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            handlers: self.handlers,
        }
    }
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// The smart-home intent table: switching and temperature control.
    pub fn smart_home() -> Self {
        Self::builder()
            .on(
                &["smarthome.lights.switch.on", "smarthome.device.switch.on"],
                handlers::turn_on,
            )
            .on(
                &["smarthome.lights.switch.off", "smarthome.device.switch.off"],
                handlers::turn_off,
            )
            .on(&["smarthome.heating.set"], handlers::set_temperature)
            .on(&["smarthome.heating.up"], handlers::increase_temperature)
            .on(&["smarthome.heating.down"], handlers::decrease_temperature)
            .build()
    }

    pub fn handles(&self, intent: &str) -> bool {
        self.handlers.contains_key(intent)
    }

    /// Route an utterance to the handler for `intent`.
    ///
    /// Without a handler the NLU fulfillment text is returned as-is, or
    /// [`FALLBACK_REPLY`] when that is blank.
    pub fn dispatch(
        &self,
        store: &mut DeviceStore,
        utterance: &str,
        intent: Option<&str>,
        fulfillment: &str,
        params: &Params,
    ) -> Result<Reply, StoreError> {
        if let Some(handler) = intent.and_then(|i| self.handlers.get(i)) {
            debug!("Dispatching intent {:?}", intent);
            return handler(store, utterance, params);
        }

        debug!("No handler for intent {:?}, using fulfillment text", intent);
        let fulfillment = fulfillment.trim();
        if fulfillment.is_empty() {
            Ok(Reply::text(FALLBACK_REPLY))
        } else {
            Ok(Reply::text(fulfillment))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn empty_store(dir: &TempDir) -> DeviceStore {
        DeviceStore::open(dir.path().join("devices.json")).unwrap()
    }

    fn echo(_: &mut DeviceStore, utterance: &str, _: &Params) -> Result<Reply, StoreError> {
        Ok(Reply::text(format!("echo: {}", utterance)))
    }

    #[test]
    fn test_registered_handler_is_called() {
        let dir = TempDir::new().unwrap();
        let mut store = empty_store(&dir);
        let dispatcher = Dispatcher::builder().on(&["test.echo"], echo).build();

        let reply = dispatcher
            .dispatch(&mut store, "hello", Some("test.echo"), "ignored", &Params::new())
            .unwrap();
        assert_eq!(reply.text, "echo: hello");
    }

    #[test]
    fn test_aliases_share_handler() {
        let dispatcher = Dispatcher::builder().on(&["a", "b"], echo).build();
        assert!(dispatcher.handles("a"));
        assert!(dispatcher.handles("b"));
        assert!(!dispatcher.handles("c"));
    }

    #[test]
    fn test_unregistered_intent_uses_fulfillment() {
        let dir = TempDir::new().unwrap();
        let mut store = empty_store(&dir);
        let dispatcher = Dispatcher::smart_home();

        let reply = dispatcher
            .dispatch(
                &mut store,
                "hi there",
                Some("smalltalk.greetings.hello"),
                "  Hello! How can I help?  ",
                &Params::new(),
            )
            .unwrap();
        assert_eq!(reply.text, "Hello! How can I help?");
        assert!(reply.updated.is_none());
    }

    #[test]
    fn test_missing_intent_and_fulfillment_falls_back() {
        let dir = TempDir::new().unwrap();
        let mut store = empty_store(&dir);
        let dispatcher = Dispatcher::smart_home();

        let reply = dispatcher
            .dispatch(&mut store, "blah", None, "   ", &Params::new())
            .unwrap();
        assert_eq!(reply.text, FALLBACK_REPLY);
    }

    #[test]
    fn test_smart_home_table() {
        let dispatcher = Dispatcher::smart_home();
        for intent in [
            "smarthome.lights.switch.on",
            "smarthome.device.switch.on",
            "smarthome.lights.switch.off",
            "smarthome.device.switch.off",
            "smarthome.heating.set",
            "smarthome.heating.up",
            "smarthome.heating.down",
        ] {
            assert!(dispatcher.handles(intent), "missing handler for {}", intent);
        }
    }
}
