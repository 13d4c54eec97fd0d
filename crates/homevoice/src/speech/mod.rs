//! Speech input and output.
//!
//! Recognition and synthesis are external services; the assistant talks to
//! them through [`Recognizer`] and [`Speaker`].

mod command;

use async_trait::async_trait;

pub use command::CommandRecognizer;
pub use command::CommandSpeaker;

/// Ways a recognition attempt can end without a transcript.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionError {
    /// Audio was captured but no words were recognized.
    #[error("speech was not understood")]
    NoMatch,

    /// Nothing was heard before the listen timeout.
    #[error("no speech before timeout")]
    Timeout,

    /// The recognizer could not be reached or failed.
    #[error("speech service error: {0}")]
    Service(String),
}

impl RecognitionError {
    /// Message shown and spoken to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            RecognitionError::NoMatch => "Couldn't understand, please try again.",
            RecognitionError::Timeout => "No speech detected.",
            RecognitionError::Service(_) => "Error connecting to speech service.",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("failed to start speech program {0}: {1}")]
    Spawn(String, #[source] std::io::Error),

    #[error("speech program {0} exited with {1}")]
    Failed(String, std::process::ExitStatus),
}

/// Speech-to-text.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Listen for one utterance and return its transcript.
    async fn recognize(&self) -> Result<String, RecognitionError>;
}

/// Text-to-speech.
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn say(&self, text: &str) -> Result<(), SpeechError>;
}

/// Recognizer used when none is configured; every attempt is a service error.
#[derive(Debug, Default)]
pub struct Unavailable;

#[async_trait]
impl Recognizer for Unavailable {
    async fn recognize(&self) -> Result<String, RecognitionError> {
        Err(RecognitionError::Service(
            "no recognizer configured".to_string(),
        ))
    }
}

/// Speaker that discards everything.
#[derive(Debug, Default)]
pub struct Muted;

#[async_trait]
impl Speaker for Muted {
    async fn say(&self, _text: &str) -> Result<(), SpeechError> {
        Ok(())
    }
}

/// Mock recognizer for testing
#[cfg(test)]
#[derive(Debug)]
pub struct MockRecognizer {
    pub result: Result<String, RecognitionError>,
    pub delay: std::time::Duration,
}

#[cfg(test)]
impl MockRecognizer {
    pub fn hearing(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            delay: std::time::Duration::ZERO,
        }
    }

    pub fn failing(error: RecognitionError) -> Self {
        Self {
            result: Err(error),
            delay: std::time::Duration::ZERO,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl Recognizer for MockRecognizer {
    async fn recognize(&self) -> Result<String, RecognitionError> {
        tokio::time::sleep(self.delay).await;
        self.result.clone()
    }
}

/// Mock speaker for testing, records everything it is asked to say
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockSpeaker {
    pub spoken: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockSpeaker {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Speaker for MockSpeaker {
    async fn say(&self, text: &str) -> Result<(), SpeechError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            RecognitionError::NoMatch.user_message(),
            "Couldn't understand, please try again."
        );
        assert_eq!(RecognitionError::Timeout.user_message(), "No speech detected.");
        assert_eq!(
            RecognitionError::Service("down".to_string()).user_message(),
            "Error connecting to speech service."
        );
    }

    #[tokio::test]
    async fn test_unavailable_recognizer() {
        let err = Unavailable.recognize().await.unwrap_err();
        assert!(matches!(err, RecognitionError::Service(_)));
    }
}
