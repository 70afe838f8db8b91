//! Failure taxonomy for actions

use crate::console::Message;
use crate::process::MonitorError;
use std::any::Any;
use thiserror::Error;

/// Why an action did not produce a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// Non-retryable: user cancellation or an explicit abort
    #[error("aborted: {}", .0.join("; "))]
    Abort(Vec<String>),

    /// Retryable application-level error
    #[error("{}", .0.join("; "))]
    Recoverable(Vec<String>),

    /// An error or panic escaped user code
    #[error("unhandled error: {0}")]
    Unhandled(String),
}

impl Failure {
    pub fn abort(message: impl Into<String>) -> Self {
        Failure::Abort(vec![message.into()])
    }

    pub fn recoverable(message: impl Into<String>) -> Self {
        Failure::Recoverable(vec![message.into()])
    }

    /// Whether a retry wrapper may run the action again
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Failure::Abort(_))
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, Failure::Abort(_))
    }

    /// Display lines describing the failure
    pub fn messages(&self) -> Vec<String> {
        match self {
            Failure::Abort(messages) | Failure::Recoverable(messages) => messages.clone(),
            Failure::Unhandled(error) => error.lines().map(str::to_string).collect(),
        }
    }

    /// The failure as error-level console messages
    pub fn to_console(&self) -> Vec<Message> {
        self.messages().into_iter().map(Message::error).collect()
    }

    /// Convert a caught panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let text = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "step panicked".to_string()
        };
        Failure::Unhandled(format!("panic: {text}"))
    }
}

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        Failure::Unhandled(format!("{error:?}"))
    }
}

impl From<std::io::Error> for Failure {
    fn from(error: std::io::Error) -> Self {
        Failure::Unhandled(error.to_string())
    }
}

impl From<MonitorError> for Failure {
    fn from(error: MonitorError) -> Self {
        Failure::abort(error.to_string())
    }
}
