//! Core domain logic for the clinic practice platform.
//! This crate is the single source of truth for tenant-scoped business
//! invariants; transport, authentication and UI live outside it.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DatabaseConfig, LoggingConfig};
pub use db::{Database, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::analytics::{DateRange, OrganizationAnalytics};
pub use model::patch::Patch;
pub use model::ModelValidationError;
pub use repo::{RepoError, RepoResult};
pub use service::analytics_service::AnalyticsService;
pub use service::nutrition_plan_service::NutritionPlanService;
pub use service::organization_service::OrganizationService;
pub use service::program_service::ProgramLifecycleService;
pub use service::task_service::TaskService;
pub use service::{ConflictRule, EntityKind, ServiceError, ServiceResult};

/// Minimal health-check API for wiring probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
