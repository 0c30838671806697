//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod display;
pub mod error;
pub mod firewall;
pub mod launch;
pub mod readiness;
pub mod session;
pub mod stage;
pub mod summary;
pub mod tunnel;

pub use config::{Artifact, DeskcastConfig};
pub use error::{ConfigError, ProvisionError, StageFailure};
pub use firewall::PortRule;
pub use launch::{LaunchMode, LaunchPlan};
pub use readiness::PollPolicy;
pub use session::{CommandLine, DetachedSpec, SessionSpec};
pub use stage::StageId;
pub use summary::ProvisionSummary;
