//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce cross-entity rules that a single repository cannot see.
//!
//! # Invariants
//! - Services are stateless; each receives its repository ports in `new`.
//! - No service depends on another service.
//! - Every operation is scoped by the caller's organization.

pub mod analytics_service;
pub mod error;
pub mod nutrition_plan_service;
pub mod organization_service;
pub mod program_service;
pub mod task_service;

pub use error::{ConflictRule, EntityKind, ServiceError, ServiceResult};
