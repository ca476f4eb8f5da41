//! Core use-case services.
//!
//! # Responsibility
//! - Expose the operations a front end calls, with structured errors.
//! - Keep callers decoupled from store and SQL details.

pub mod scheduler_service;
