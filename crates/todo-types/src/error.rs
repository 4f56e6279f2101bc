use thiserror::Error;

/// Errors produced while building or validating model values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("the name of the todo/task must not be empty")]
    EmptyName,

    #[error("the name of the project must not be empty")]
    EmptyProjectName,

    #[error("invalid due date {input:?}: {reason}")]
    InvalidDueDate { input: String, reason: String },
}
