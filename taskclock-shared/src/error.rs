/// Command error taxonomy
///
/// Every guard, the status state machine and the store report failures
/// through [`CommandError`]. Each variant carries one stable, user-facing
/// message and belongs to exactly one [`ErrorKind`], which the HTTP layer
/// maps to a status code.
///
/// # Classes
///
/// | Kind | Variants |
/// |---|---|
/// | NotFound | ProjectNotFound, TaskNotFound, UserNotFound, PerformerNotFound |
/// | Authorization | NotAuthor, NotAMember, NotInitiator, NotPerformer, CannotRemoveSelf |
/// | Conflict | AlreadyMember, SameStatus |
/// | InvalidTransition | InvalidTransition |
/// | Infrastructure | MissingBeginAt, Storage |
///
/// Only infrastructure errors raised by the store as transient
/// ([`StoreError::is_retryable`]) may be retried, and only by re-running the
/// whole command.

use crate::models::task::TaskStatus;
use crate::store::StoreError;
use serde::Serialize;

/// Error class of a [`CommandError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A referenced entity doesn't exist
    NotFound,

    /// The caller may not perform the operation
    Authorization,

    /// The operation would not change anything or duplicates existing state
    Conflict,

    /// The requested status change is not allowed
    InvalidTransition,

    /// Storage or data-integrity failure
    Infrastructure,
}

/// Error returned by commands
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Project not found.")]
    ProjectNotFound,

    #[error("Task not found.")]
    TaskNotFound,

    #[error("User not found.")]
    UserNotFound,

    #[error("Performer not found.")]
    PerformerNotFound,

    #[error("You are not the owner of this project.")]
    NotAuthor,

    #[error("User is not a member of this project.")]
    NotAMember,

    #[error("You are not the initiator of this task.")]
    NotInitiator,

    #[error("You are not the performer of this task.")]
    NotPerformer,

    #[error("You cannot remove yourself.")]
    CannotRemoveSelf,

    #[error("User is already a member of this project.")]
    AlreadyMember,

    #[error("Task already has this status.")]
    SameStatus,

    #[error("Cannot change task status from {from} to {to}.")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    /// An IN_PROGRESS task without a start time; the row is inconsistent
    #[error("Task has no start time recorded.")]
    MissingBeginAt,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl CommandError {
    /// Error class
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::ProjectNotFound
            | CommandError::TaskNotFound
            | CommandError::UserNotFound
            | CommandError::PerformerNotFound => ErrorKind::NotFound,

            CommandError::NotAuthor
            | CommandError::NotAMember
            | CommandError::NotInitiator
            | CommandError::NotPerformer
            | CommandError::CannotRemoveSelf => ErrorKind::Authorization,

            CommandError::AlreadyMember | CommandError::SameStatus => ErrorKind::Conflict,

            CommandError::InvalidTransition { .. } => ErrorKind::InvalidTransition,

            CommandError::MissingBeginAt | CommandError::Storage(_) => ErrorKind::Infrastructure,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::ProjectNotFound => "project_not_found",
            CommandError::TaskNotFound => "task_not_found",
            CommandError::UserNotFound => "user_not_found",
            CommandError::PerformerNotFound => "performer_not_found",
            CommandError::NotAuthor => "not_author",
            CommandError::NotAMember => "not_a_member",
            CommandError::NotInitiator => "not_initiator",
            CommandError::NotPerformer => "not_performer",
            CommandError::CannotRemoveSelf => "cannot_remove_self",
            CommandError::AlreadyMember => "already_member",
            CommandError::SameStatus => "same_status",
            CommandError::InvalidTransition { .. } => "invalid_transition",
            CommandError::MissingBeginAt => "missing_begin_at",
            CommandError::Storage(e) if e.is_retryable() => "storage_unavailable",
            CommandError::Storage(_) => "storage_error",
        }
    }

    /// Whether re-running the command may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CommandError::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Command result type alias
pub type CommandResult<T> = Result<T, CommandError>;
