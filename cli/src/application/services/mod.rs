//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod cleanup_service;
pub mod desktop;
pub mod display;
pub mod firewall;
pub mod install;
pub mod provision;
pub mod readiness;
pub mod streaming;
pub mod tunnel;
