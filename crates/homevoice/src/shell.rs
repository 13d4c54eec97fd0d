//! Interactive terminal front end.
//!
//! Plain lines are sent to the assistant as typed questions; lines starting
//! with `:` are shell commands.

use std::io::Write;
use std::sync::Arc;

use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tracing::debug;

use crate::assistant::Assistant;
use crate::assistant::Console;
use crate::devices::Device;

const HELP: &str = "\
Type a question or command for the assistant, or:
  :speak          listen for a spoken command
  :add NAME       add a device
  :remove NAME    remove a device
  :devices        show all devices
  :help           show this help
  :quit           exit";

/// One parsed line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Ask(String),
    Speak,
    Add(String),
    Remove(String),
    Devices,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix(':') else {
            if line.is_empty() {
                return ShellCommand::Empty;
            }
            return ShellCommand::Ask(line.to_string());
        };

        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        match name {
            "speak" | "s" => ShellCommand::Speak,
            "add" => ShellCommand::Add(rest.to_string()),
            "remove" | "rm" => ShellCommand::Remove(rest.to_string()),
            "devices" | "ls" => ShellCommand::Devices,
            "help" | "h" | "?" => ShellCommand::Help,
            "quit" | "q" | "exit" => ShellCommand::Quit,
            other => ShellCommand::Unknown(other.to_string()),
        }
    }
}

/// Console that writes to the terminal.
///
/// Device rows are prefixed with a coloured dot: green when on, red when off.
#[derive(Debug, Default)]
pub struct TerminalConsole {
    color: bool,
}

impl TerminalConsole {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// The row printed for a device.
    pub fn row(&self, device: &Device) -> String {
        let dot = match (self.color, device.is_on()) {
            (true, true) => "\x1b[32m●\x1b[0m",
            (true, false) => "\x1b[31m●\x1b[0m",
            (false, true) => "[on] ",
            (false, false) => "[off]",
        };
        format!("  {} {}", dot, device.label())
    }

    fn print(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", text);
        let _ = stdout.flush();
    }
}

impl Console for TerminalConsole {
    fn log(&self, line: &str) {
        self.print(line);
    }

    fn device_changed(&self, device: &Device) {
        self.print(&self.row(device));
    }

    fn devices_refreshed(&self, devices: &[Device]) {
        if devices.is_empty() {
            self.print("  (no devices)");
            return;
        }
        for device in devices {
            self.print(&self.row(device));
        }
    }

    fn listening_changed(&self, listening: bool) {
        if !listening {
            self.print("(ready)");
        }
    }
}

/// Read commands from stdin until `:quit` or end of input.
pub async fn run(assistant: Arc<Assistant>) -> std::io::Result<()> {
    println!("{}", HELP);
    assistant.refresh().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = ShellCommand::parse(&line);
        debug!("Shell command: {:?}", command);

        match command {
            ShellCommand::Empty => {}
            ShellCommand::Ask(text) => {
                assistant.ask(&text).await;
            }
            ShellCommand::Speak => {
                if assistant.is_listening() {
                    println!("Already listening.");
                } else {
                    // Detached; the listening flag keeps a second attempt out.
                    drop(assistant.spawn_listen());
                }
            }
            ShellCommand::Add(name) => {
                let _ = assistant.add_device(&name).await;
            }
            ShellCommand::Remove(name) => {
                let _ = assistant.remove_device(&name).await;
            }
            ShellCommand::Devices => assistant.refresh().await,
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::Quit => break,
            ShellCommand::Unknown(name) => {
                println!("Unknown command ':{}'. Type :help for a list.", name)
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::PowerState;

    #[test]
    fn test_parse() {
        assert_eq!(
            ShellCommand::parse("  turn on the fan "),
            ShellCommand::Ask("turn on the fan".to_string())
        );
        assert_eq!(ShellCommand::parse(""), ShellCommand::Empty);
        assert_eq!(ShellCommand::parse(":speak"), ShellCommand::Speak);
        assert_eq!(
            ShellCommand::parse(":add   Porch Light "),
            ShellCommand::Add("Porch Light".to_string())
        );
        assert_eq!(ShellCommand::parse(":add"), ShellCommand::Add(String::new()));
        assert_eq!(
            ShellCommand::parse(":rm AC"),
            ShellCommand::Remove("AC".to_string())
        );
        assert_eq!(ShellCommand::parse(":q"), ShellCommand::Quit);
        assert_eq!(
            ShellCommand::parse(":frobnicate"),
            ShellCommand::Unknown("frobnicate".to_string())
        );
    }

    #[test]
    fn test_plain_rows() {
        let console = TerminalConsole::new(false);
        let mut ac = Device::new("AC");
        assert_eq!(console.row(&ac), "  [off] AC is OFF | Temp: 24°C");
        ac.status = PowerState::On;
        assert_eq!(console.row(&ac), "  [on]  AC is ON | Temp: 24°C");
    }
}
