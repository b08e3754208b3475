use thiserror::Error;

/// A stored document did not match the expected schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Missing required field `{field}` in {path}")]
    MissingField { path: String, field: &'static str },

    #[error("Field `{field}` in {path} has the wrong type (expected {expected})")]
    WrongType {
        path: String,
        field: &'static str,
        expected: &'static str,
    },

    #[error("Field `{field}` in {path} has an invalid value: {value}")]
    InvalidValue {
        path: String,
        field: &'static str,
        value: String,
    },
}

/// User input rejected locally, before any remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message is empty")]
    EmptyText,

    #[error("You cannot message yourself")]
    SelfChat,

    #[error("First message must be one of: {}", crate::constants::OPENERS.join(", "))]
    NotAnOpener,

    #[error("Avatar must be between 1 and {}", crate::constants::AVATAR_COUNT)]
    InvalidAvatar,

    #[error("Please fill the {0} field")]
    EmptyField(&'static str),

    #[error("File is empty")]
    EmptyFile,

    #[error("File too large: {size} bytes (max {max})")]
    FileTooLarge { size: usize, max: usize },
}
