use thiserror::Error;

use crate::replies;

/// Failures that can end a turn early. Each one maps to a fixed, user-safe
/// reply; none of them is allowed to reach the transport as a crash.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("intent interpreter failure: {0}")]
    Interpreter(String),
    #[error("transcription failure: {0}")]
    Transcription(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl ApplicationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Interpreter(_) => replies::INTERPRETER_ERROR,
            Self::Transcription(_) => replies::NOT_UNDERSTOOD,
            Self::Transport(_) | Self::Configuration(_) | Self::Internal(_) => {
                replies::INTERNAL_ERROR
            }
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Interpreter(_) => "interpreter",
            Self::Transcription(_) => "transcription",
            Self::Transport(_) => "transport",
            Self::Configuration(_) => "configuration",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::ApplicationError;
    use crate::replies;

    #[test]
    fn interpreter_failure_maps_to_ai_error_notice() {
        let error = ApplicationError::Interpreter("timeout".to_owned());
        assert_eq!(error.user_message(), replies::INTERPRETER_ERROR);
        assert_eq!(error.error_class(), "interpreter");
    }

    #[test]
    fn transcription_failure_asks_user_to_repeat() {
        let error = ApplicationError::Transcription("recognizer exited with 1".to_owned());
        assert_eq!(error.user_message(), replies::NOT_UNDERSTOOD);
    }

    #[test]
    fn infrastructure_failures_do_not_leak_details() {
        let error = ApplicationError::Internal("worker pool join failed".to_owned());
        assert_eq!(error.user_message(), replies::INTERNAL_ERROR);
        assert!(!error.user_message().contains("worker"));
    }
}
