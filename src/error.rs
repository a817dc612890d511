//! Error types for the assemblage runtime

use thiserror::Error;

/// Errors that can occur while registering, resolving or initializing units
#[derive(Error, Debug, Clone)]
pub enum AssemblerError {
    /// A definition option failed validation
    #[error("invalid definition option `{option}`: {reason}")]
    InvalidDefinition { option: String, reason: String },

    /// An identifier was registered twice with differing concretes
    #[error(
        "identifier `{identifier}` is already registered with concrete `{existing}` (attempted `{attempted}`)"
    )]
    DuplicateRegistration {
        identifier: &'static str,
        existing: &'static str,
        attempted: &'static str,
    },

    /// A required identifier is not present in the registry
    #[error("unknown dependency `{requested}` requested by `{requester}` (resolution stack: {stack})")]
    UnknownDependency {
        requested: String,
        requester: String,
        stack: String,
    },

    /// The requested identifier is currently being resolved
    #[error("circular resolution: {path}")]
    CircularResolution { path: String },

    /// A keyed value was bound twice
    #[error("key `{key}` is already bound")]
    DuplicateObject { key: String },

    /// No value is bound under the requested key
    #[error("no value bound under key `{key}`")]
    UnknownObject { key: String },

    /// The value bound under a key has a different type than requested
    #[error("value under key `{key}` is not a `{expected}`")]
    ObjectType {
        key: String,
        expected: &'static str,
    },

    /// The root instance disappeared from the init queue
    #[error("root instance missing from the init queue")]
    MissingRoot,

    /// Registration attempted while the resolve phase runs
    #[error("registry is locked during resolution")]
    Locked,

    /// The assembler behind a context has been dropped
    #[error("assembler has been disposed")]
    Disposed,

    /// A user lifecycle hook failed
    #[error("hook `{hook}` of `{unit}` failed: {message}")]
    Hook {
        unit: String,
        hook: &'static str,
        message: String,
    },

    /// Internal error
    #[error("internal assembler error: {0}")]
    Internal(String),
}

impl AssemblerError {
    /// Create an InvalidDefinition error
    #[inline]
    pub fn invalid_definition(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Create a Hook error, typically from inside a user hook body
    #[inline]
    pub fn hook(unit: impl Into<String>, hook: &'static str, message: impl Into<String>) -> Self {
        Self::Hook {
            unit: unit.into(),
            hook,
            message: message.into(),
        }
    }

    /// Create an Internal error
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Result type alias for assemblage operations
pub type Result<T> = std::result::Result<T, AssemblerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_identifiers() {
        let err = AssemblerError::DuplicateRegistration {
            identifier: "Logger",
            existing: "ConsoleLogger",
            attempted: "FileLogger",
        };
        let msg = err.to_string();
        assert!(msg.contains("Logger"));
        assert!(msg.contains("ConsoleLogger"));
        assert!(msg.contains("FileLogger"));
    }

    #[test]
    fn test_unknown_dependency_reports_stack() {
        let err = AssemblerError::UnknownDependency {
            requested: "Database".into(),
            requester: "UserService".into(),
            stack: "App -> UserService".into(),
        };
        assert!(err.to_string().contains("App -> UserService"));
    }

    #[test]
    fn test_hook_helper() {
        let err = AssemblerError::hook("App", "onInit", "boom");
        match err {
            AssemblerError::Hook { unit, hook, .. } => {
                assert_eq!(unit, "App");
                assert_eq!(hook, "onInit");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
