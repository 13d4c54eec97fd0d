pub mod assistant;
pub mod config;
pub mod devices;
pub mod intents;
pub mod nlu;
pub mod shell;
pub mod speech;

pub use assistant::Assistant;
pub use assistant::Console;
pub use assistant::ListenOutcome;
pub use config::Config;
pub use config::LogLevel;
pub use devices::Device;
pub use devices::DeviceKind;
pub use devices::DeviceStore;
pub use devices::PowerState;
pub use devices::StoreError;
pub use intents::Dispatcher;
pub use intents::Reply;
pub use nlu::DetectedIntent;
pub use nlu::IntentDetector;
