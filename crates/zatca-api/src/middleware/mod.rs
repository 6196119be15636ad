//! # Middleware
//!
//! Request-level layers applied to every API route.

pub mod metrics;
