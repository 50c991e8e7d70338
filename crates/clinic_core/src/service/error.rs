//! Service-level error taxonomy.
//!
//! Callers match on variants, never on message text.

use crate::model::ModelValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Entity family named by a `NotFound` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Organization,
    Professional,
    Patient,
    Program,
    Meeting,
    NutritionPlan,
    Task,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Professional => "professional",
            Self::Patient => "patient",
            Self::Program => "program",
            Self::Meeting => "meeting",
            Self::NutritionPlan => "nutrition_plan",
            Self::Task => "task",
        }
    }
}

/// Business rule rejected by a state conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictRule {
    /// The patient is already enrolled in the program.
    AlreadyParticipant,
    /// The patient is not enrolled in the program.
    NotParticipant,
    /// The professional email is already registered.
    EmailInUse,
}

impl ConflictRule {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyParticipant => "already_participant",
            Self::NotParticipant => "not_participant",
            Self::EmailInUse => "email_in_use",
        }
    }
}

#[derive(Debug)]
pub enum ServiceError {
    /// Target entity does not exist within the caller's organization.
    NotFound { kind: EntityKind, id: Uuid },
    Conflict(ConflictRule),
    /// Input rejected by model validation.
    Invalid(ModelValidationError),
    /// Unexpected storage failure, propagated unchanged.
    Repo(RepoError),
    /// Broken internal assumption, e.g. a panicked worker thread.
    Internal(&'static str),
}

impl ServiceError {
    pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{} not found: {id}", kind.as_str()),
            Self::Conflict(rule) => write!(f, "conflict: {}", rule.as_str()),
            Self::Invalid(err) => write!(f, "invalid input: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NotFound { .. } | Self::Conflict(_) | Self::Internal(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Invalid(err),
            other => Self::Repo(other),
        }
    }
}

/// Maps a repository `NotFound` to a typed service `NotFound` for `kind`.
pub(crate) fn missing_as(kind: EntityKind) -> impl FnOnce(RepoError) -> ServiceError {
    move |err| match err {
        RepoError::NotFound(id) => ServiceError::not_found(kind, id),
        other => other.into(),
    }
}

impl From<ModelValidationError> for ServiceError {
    fn from(value: ModelValidationError) -> Self {
        Self::Invalid(value)
    }
}
