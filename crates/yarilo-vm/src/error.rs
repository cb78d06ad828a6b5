//! Runtime error types for the Yarilo virtual machine.

use serde::Serialize;
use thiserror::Error;
use yarilo_types::SyntaxErrors;

/// Evaluation error. Every variant is fatal to the current evaluation; the
/// VM itself stays usable afterwards.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Malformed source text (parser boundary).
    #[error(transparent)]
    Syntax(#[from] SyntaxErrors),
    /// A symbol was read or written but no scope bound it.
    #[error("unbound reference: {0}")]
    UnboundReference(String),
    /// The cursor was asked for a value past the end of its code.
    #[error("code exhausted: expected another value")]
    ExhaustedCode,
    #[error("not invocable: {0}")]
    NotInvocable(String),
    #[error("unsupported parameter kind: /{0}")]
    UnsupportedParameterKind(String),
    /// Bad parameter list, assignment to `in`, stale frame access and similar.
    #[error("malformed use: {0}")]
    MalformedUse(String),
    /// `pipe` target has no input side.
    #[error("pipe target does not accept input")]
    MissingInputCapability,
    /// Raised by the `throw` word.
    #[error("{0}")]
    Thrown(String),
    /// An asynchronous native operation failed.
    #[error("host task failed: {0}")]
    HostTaskFailure(String),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("suspend already resumed")]
    AlreadyResumed,
    #[error("publisher already has a subscriber")]
    AlreadySubscribed,
    #[error("call depth limit of {0} exceeded")]
    CallDepthExceeded(usize),
    #[error("module error: {0}")]
    Module(String),
}

/// Stable, serializable classification of an [`EvalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Syntax,
    UnboundReference,
    ExhaustedCode,
    NotInvocable,
    UnsupportedParameterKind,
    MalformedUse,
    MissingInputCapability,
    UserThrown,
    HostTaskFailure,
    TypeMismatch,
    AlreadyResumed,
    AlreadySubscribed,
    CallDepthExceeded,
    Module,
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax(_) => ErrorKind::Syntax,
            Self::UnboundReference(_) => ErrorKind::UnboundReference,
            Self::ExhaustedCode => ErrorKind::ExhaustedCode,
            Self::NotInvocable(_) => ErrorKind::NotInvocable,
            Self::UnsupportedParameterKind(_) => ErrorKind::UnsupportedParameterKind,
            Self::MalformedUse(_) => ErrorKind::MalformedUse,
            Self::MissingInputCapability => ErrorKind::MissingInputCapability,
            Self::Thrown(_) => ErrorKind::UserThrown,
            Self::HostTaskFailure(_) => ErrorKind::HostTaskFailure,
            Self::TypeMismatch(_) => ErrorKind::TypeMismatch,
            Self::AlreadyResumed => ErrorKind::AlreadyResumed,
            Self::AlreadySubscribed => ErrorKind::AlreadySubscribed,
            Self::CallDepthExceeded(_) => ErrorKind::CallDepthExceeded,
            Self::Module(_) => ErrorKind::Module,
        }
    }

    /// What a hosting shell prints before accepting the next input.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
            diagnostics: match self {
                Self::Syntax(errors) => Some(errors.clone()),
                _ => None,
            },
        }
    }
}

/// Serializable error summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<SyntaxErrors>,
}

impl ErrorReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
