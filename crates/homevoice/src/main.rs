use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use homevoice::config::LoggingConfig;
use homevoice::shell::TerminalConsole;
use homevoice::speech::CommandRecognizer;
use homevoice::speech::CommandSpeaker;
use homevoice::speech::Muted;
use homevoice::speech::Recognizer;
use homevoice::speech::Speaker;
use homevoice::speech::Unavailable;
use homevoice::Assistant;
use homevoice::Config;
use homevoice::DeviceStore;
use homevoice::IntentDetector;
use homevoice::StoreError;
use tracing::info;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "homevoice", version, about = "Voice and text assistant for smart-home devices")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device file to use instead of the configured one
    #[arg(short, long)]
    devices: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the interactive shell (default)
    Shell,

    /// Send a single question to the assistant
    Ask {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Add a device
    Add { name: String },

    /// Remove a device
    Remove { name: String },

    /// List all devices
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(devices) = cli.devices {
        config.assistant.devices_path = devices;
    }

    init_logging(&config.logging);
    info!("homevoice starting");
    if let Some(path) = &cli.config {
        info!("Loaded config from: {}", path.display());
    }

    let mut store = DeviceStore::open(&config.assistant.devices_path).with_context(|| {
        format!(
            "Failed to open device file {}",
            config.assistant.devices_path.display()
        )
    })?;
    let console = TerminalConsole::new(std::io::stdout().is_terminal());

    match cli.command.unwrap_or(Command::Shell) {
        Command::List => {
            if store.devices().is_empty() {
                println!("(no devices)");
            }
            for device in store.devices() {
                println!("{}", console.row(device));
            }
        }
        Command::Add { name } => match store.add(&name) {
            Ok(device) => println!("Device '{}' added successfully.", device.name),
            Err(e @ (StoreError::InvalidName | StoreError::Duplicate(_))) => {
                println!("{}", e);
            }
            Err(e) => return Err(e.into()),
        },
        Command::Remove { name } => match store.remove(&name)? {
            0 => println!("No device named '{}'.", name),
            _ => println!("Device '{}' removed.", name),
        },
        Command::Ask { text } => {
            let assistant = build_assistant(&config, store, console)?;
            assistant.ask(&text.join(" ")).await;
        }
        Command::Shell => {
            let assistant = Arc::new(build_assistant(&config, store, console)?);
            homevoice::shell::run(assistant).await?;
        }
    }

    info!("homevoice shutdown complete");
    Ok(())
}

fn build_assistant(
    config: &Config,
    store: DeviceStore,
    console: TerminalConsole,
) -> anyhow::Result<Assistant> {
    let detector = build_detector(config)?;

    let speaker: Arc<dyn Speaker> = match &config.speech.tts {
        Some(tts) => Arc::new(CommandSpeaker::new(tts.program.clone(), tts.args.clone())),
        None => Arc::new(Muted),
    };
    let recognizer: Arc<dyn Recognizer> = match &config.speech.recognizer {
        Some(r) => Arc::new(CommandRecognizer::new(
            r.program.clone(),
            r.args.clone(),
            Duration::from_secs(r.timeout_secs),
        )),
        None => Arc::new(Unavailable),
    };

    Ok(Assistant::new(store, detector, Arc::new(console))
        .with_speaker(speaker)
        .with_recognizer(recognizer))
}

#[cfg(feature = "dialogflow")]
fn build_detector(config: &Config) -> anyhow::Result<Arc<dyn IntentDetector>> {
    use homevoice::nlu::DialogflowClient;
    use homevoice::nlu::ServiceAccount;

    let account = ServiceAccount::from_file(&config.dialogflow.credentials_path)
        .context("Failed to load Dialogflow credentials")?;
    info!("Using Dialogflow project {}", account.project_id);

    Ok(Arc::new(DialogflowClient::new(
        account,
        config.dialogflow.endpoint.clone(),
        config.assistant.language_code.clone(),
        config.assistant.session_id.clone(),
    )))
}

#[cfg(not(feature = "dialogflow"))]
fn build_detector(_config: &Config) -> anyhow::Result<Arc<dyn IntentDetector>> {
    anyhow::bail!("homevoice was built without an NLU backend (enable the `dialogflow` feature)")
}

fn init_logging(logging: &LoggingConfig) {
    let filter = logging
        .overrides
        .iter()
        .fold(Targets::new().with_default(logging.level), |targets, (target, level)| {
            targets.with_target(target.clone(), *level)
        });

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
