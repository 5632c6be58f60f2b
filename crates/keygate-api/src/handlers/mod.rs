//! API request handlers
//!
//! Author: hephaex@gmail.com

pub mod auth;
pub mod health;
pub mod verify;

pub use health::{health_check, prometheus_metrics, readiness_check};
