//! Structured error types shared across RepEx crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`RepexError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (replica ids, cycle numbers, paths).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the replica-exchange coordinator.
///
/// Only failures from the fatal family of the error taxonomy surface as
/// values of this type; degraded per-job failures are substituted with safe
/// defaults by the orchestrator and never propagate as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum RepexError {
    /// Run configuration and ensemble construction errors.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Swap matrix composition errors (a column is absent or duplicated).
    #[error("matrix error: {0}")]
    Matrix(ErrorInfo),
    /// Exchange decision errors.
    #[error("exchange error: {0}")]
    Exchange(ErrorInfo),
    /// Exchange history bookkeeping errors.
    #[error("history error: {0}")]
    History(ErrorInfo),
    /// Job submission or barrier errors from the execution collaborator.
    #[error("job error: {0}")]
    Job(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl RepexError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            RepexError::Config(info)
            | RepexError::Matrix(info)
            | RepexError::Exchange(info)
            | RepexError::History(info)
            | RepexError::Job(info)
            | RepexError::Serde(info) => info,
        }
    }
}
