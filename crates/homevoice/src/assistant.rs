use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::devices::Device;
use crate::devices::DeviceStore;
use crate::devices::StoreError;
use crate::intents::Dispatcher;
use crate::nlu::IntentDetector;
use crate::speech::Muted;
use crate::speech::RecognitionError;
use crate::speech::Recognizer;
use crate::speech::Speaker;
use crate::speech::Unavailable;

/// Placeholder shown in an empty free-text input; never sent to the NLU service.
pub const TEXT_PLACEHOLDER: &str = "Use text to talk to the assistant...";

/// Where the assistant shows its conversation and device rows.
pub trait Console: Send + Sync {
    /// Append a line to the conversation log.
    fn log(&self, line: &str);

    /// One device changed state; refresh its row.
    fn device_changed(&self, device: &Device);

    /// The device list was reloaded; redraw every row.
    fn devices_refreshed(&self, devices: &[Device]);

    /// Listening started or stopped.
    fn listening_changed(&self, _listening: bool) {}
}

/// How a Speak request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenOutcome {
    /// A transcript was heard and answered with this reply.
    Answered(String),

    /// Recognition failed; the user has been told why.
    Failed(RecognitionError),

    /// Another recognition is already running.
    Busy,
}

/// Clears the listening flag when dropped, whatever happened in between.
struct ListeningGuard<'a> {
    flag: &'a AtomicBool,
    console: &'a dyn Console,
}

impl Drop for ListeningGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.console.listening_changed(false);
    }
}

/// The assistant
///
/// Ties the device store, intent dispatcher and the external speech and NLU
/// services together: input text goes to the NLU service, the detected intent
/// is dispatched against the store, and the reply is logged and spoken.
pub struct Assistant {
    /// Device records, shared between typed commands and background listening
    store: Mutex<DeviceStore>,

    dispatcher: Dispatcher,

    detector: Arc<dyn IntentDetector>,

    recognizer: Arc<dyn Recognizer>,

    speaker: Arc<dyn Speaker>,

    console: Arc<dyn Console>,

    /// Set while a recognition is in progress
    listening: AtomicBool,
}

impl Assistant {
    /// Create an assistant with the smart-home intent table, no recognizer
    /// and muted speech output.
    pub fn new(
        store: DeviceStore,
        detector: Arc<dyn IntentDetector>,
        console: Arc<dyn Console>,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            dispatcher: Dispatcher::smart_home(),
            detector,
            recognizer: Arc::new(Unavailable),
            speaker: Arc::new(Muted),
            console,
            listening: AtomicBool::new(false),
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.recognizer = recognizer;
        self
    }

    pub fn with_speaker(mut self, speaker: Arc<dyn Speaker>) -> Self {
        self.speaker = speaker;
        self
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    /// Snapshot of the current device records.
    pub async fn devices(&self) -> Vec<Device> {
        self.store.lock().await.devices().to_vec()
    }

    /// Append a line to the log, optionally speaking it too.
    pub async fn log(&self, message: &str, speak: bool) {
        self.console.log(message);
        if speak {
            self.speak(message).await;
        }
    }

    async fn speak(&self, text: &str) {
        if let Err(e) = self.speaker.say(text).await {
            warn!("Failed to speak: {}", e);
        }
    }

    /// Handle typed input. Blank input and the placeholder text are ignored.
    pub async fn ask(&self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() || text == TEXT_PLACEHOLDER {
            return None;
        }
        self.log(&format!("You: {}", text), false).await;
        Some(self.process_command(text).await)
    }

    /// Run an utterance through NLU and the dispatcher, then log and speak the reply.
    ///
    /// Failures are reported to the user as `Error: ...` and never propagate.
    pub async fn process_command(&self, text: &str) -> String {
        match self.respond(text).await {
            Ok(reply) => {
                self.log(&format!("Assistant: {}", reply), false).await;
                self.speak(&reply).await;
                reply
            }
            Err(e) => {
                error!("Failed to process {:?}: {}", text, e);
                let message = format!("Error: {}", e);
                self.log(&message, true).await;
                message
            }
        }
    }

    async fn respond(&self, text: &str) -> anyhow::Result<String> {
        let detected = self.detector.detect_intent(text).await?;
        info!("Intent {:?} for {:?}", detected.intent, text);

        let reply = {
            let mut store = self.store.lock().await;
            self.dispatcher.dispatch(
                &mut store,
                text,
                detected.intent.as_deref(),
                &detected.fulfillment,
                &detected.params,
            )?
        };

        if let Some(device) = &reply.updated {
            self.console.device_changed(device);
        }
        Ok(reply.text)
    }

    /// Listen for one utterance and answer it.
    ///
    /// Only one recognition runs at a time; a concurrent request returns
    /// [`ListenOutcome::Busy`] without touching the recognizer.
    pub async fn listen(&self) -> ListenOutcome {
        if self
            .listening
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.log("Already listening.", false).await;
            return ListenOutcome::Busy;
        }
        let _guard = ListeningGuard {
            flag: &self.listening,
            console: self.console.as_ref(),
        };
        self.console.listening_changed(true);
        self.log("Listening...", false).await;

        match self.recognizer.recognize().await {
            Ok(text) => {
                self.log(&format!("You: {}", text), false).await;
                ListenOutcome::Answered(self.process_command(&text).await)
            }
            Err(e) => {
                info!("Recognition ended: {}", e);
                self.log(e.user_message(), true).await;
                ListenOutcome::Failed(e)
            }
        }
    }

    /// Run [`Assistant::listen`] in a background task so the caller stays responsive.
    pub fn spawn_listen(self: &Arc<Self>) -> JoinHandle<ListenOutcome> {
        let assistant = Arc::clone(self);
        tokio::spawn(async move { assistant.listen().await })
    }

    /// Add a device by name and redraw the device list.
    pub async fn add_device(&self, name: &str) -> Result<Device, StoreError> {
        let result = {
            let mut store = self.store.lock().await;
            store.add(name).cloned()
        };

        match &result {
            Ok(device) => {
                self.log(&format!("Device '{}' added successfully.", device.name), false)
                    .await;
                self.refresh().await;
            }
            Err(StoreError::InvalidName) => {
                self.log(&StoreError::InvalidName.to_string(), true).await;
            }
            Err(e @ StoreError::Duplicate(_)) => {
                self.log(&e.to_string(), false).await;
            }
            Err(e) => {
                self.log(&format!("Error: {}", e), true).await;
            }
        }
        result
    }

    /// Remove every device with this name (ignoring case) and redraw the list.
    pub async fn remove_device(&self, name: &str) -> Result<usize, StoreError> {
        let result = self.store.lock().await.remove(name);

        match &result {
            Ok(0) => self.log(&format!("No device named '{}'.", name), false).await,
            Ok(_) => self.log(&format!("Device '{}' removed.", name), false).await,
            Err(e) => self.log(&format!("Error: {}", e), true).await,
        }
        self.refresh().await;
        result
    }

    /// Reload the device file and redraw every row.
    pub async fn refresh(&self) {
        let devices = {
            let mut store = self.store.lock().await;
            if let Err(e) = store.reload() {
                warn!("Failed to reload devices: {}", e);
            }
            store.devices().to_vec()
        };
        self.console.devices_refreshed(&devices);
    }
}

/// Console that records everything, for testing
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingConsole {
    pub lines: std::sync::Mutex<Vec<String>>,
    pub changed: std::sync::Mutex<Vec<String>>,
    pub refreshes: std::sync::Mutex<usize>,
}

#[cfg(test)]
impl RecordingConsole {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Console for RecordingConsole {
    fn log(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }

    fn device_changed(&self, device: &Device) {
        self.changed.lock().unwrap().push(device.label());
    }

    fn devices_refreshed(&self, _devices: &[Device]) {
        *self.refreshes.lock().unwrap() += 1;
    }
}
