use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use tracing::warn;

use super::RecognitionError;
use super::Recognizer;
use super::SpeechError;
use super::Speaker;

/// Recognizer backed by an external program.
///
/// The program is expected to listen on the microphone and print the
/// transcript on stdout. Empty output means nothing was recognized. If it
/// does not finish within the listen timeout it is killed.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRecognizer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

#[async_trait]
impl Recognizer for CommandRecognizer {
    async fn recognize(&self) -> Result<String, RecognitionError> {
        debug!("Running recognizer {} {:?}", self.program, self.args);
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecognitionError::Service(format!("{}: {}", self.program, e)))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| RecognitionError::Service(e.to_string()))?,
            Err(_) => {
                debug!("Recognizer timed out after {:?}", self.timeout);
                return Err(RecognitionError::Timeout);
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Recognizer exited with {}: {}", output.status, stderr.trim());
            return Err(RecognitionError::Service(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if transcript.is_empty() {
            return Err(RecognitionError::NoMatch);
        }
        Ok(transcript)
    }
}

/// Speaker backed by an external TTS program, e.g. `espeak -s 150`.
///
/// The text is passed as the last argument and the call waits for playback
/// to finish.
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
}

impl CommandSpeaker {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl Speaker for CommandSpeaker {
    async fn say(&self, text: &str) -> Result<(), SpeechError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| SpeechError::Spawn(self.program.clone(), e))?;

        if !status.success() {
            return Err(SpeechError::Failed(self.program.clone(), status));
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> CommandRecognizer {
        CommandRecognizer::new("sh", vec!["-c".to_string(), script.to_string()], timeout)
    }

    #[tokio::test]
    async fn test_transcript_from_stdout() {
        let recognizer = sh("echo '  turn on the fan  '", Duration::from_secs(5));
        assert_eq!(recognizer.recognize().await.unwrap(), "turn on the fan");
    }

    #[tokio::test]
    async fn test_empty_output_is_no_match() {
        let recognizer = sh("true", Duration::from_secs(5));
        assert_eq!(
            recognizer.recognize().await.unwrap_err(),
            RecognitionError::NoMatch
        );
    }

    #[tokio::test]
    async fn test_failure_is_service_error() {
        let recognizer = sh("exit 3", Duration::from_secs(5));
        assert!(matches!(
            recognizer.recognize().await.unwrap_err(),
            RecognitionError::Service(_)
        ));

        let missing = CommandRecognizer::new(
            "/nonexistent/recognizer",
            Vec::new(),
            Duration::from_secs(5),
        );
        assert!(matches!(
            missing.recognize().await.unwrap_err(),
            RecognitionError::Service(_)
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        let recognizer = sh("sleep 5", Duration::from_millis(100));
        assert_eq!(
            recognizer.recognize().await.unwrap_err(),
            RecognitionError::Timeout
        );
    }

    #[tokio::test]
    async fn test_speaker_status() {
        assert!(CommandSpeaker::new("true", Vec::new()).say("hello").await.is_ok());
        assert!(matches!(
            CommandSpeaker::new("false", Vec::new()).say("hello").await,
            Err(SpeechError::Failed(..))
        ));
    }
}
