//! Client for the UzStudents teacher backend.
//!
//! - [`api`]: request client, upload client and typed endpoints
//! - [`poller`]: foreground-only interval scheduler
//! - [`session`] and [`guard`]: signed-in state and route gating
//! - [`views`]: view models for dashboard, groups and assignments

pub mod api;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod poller;
pub mod session;
pub mod views;

pub use error::ApiError;
