//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Guest fetch attempt fails:
//!     → backoff.rs (optional delay before the next attempt)
//!     → retry bound and credential refresh live in guest::fetcher
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline (http::transport)
//! - Backoff defaults to off: a fresh credential is usually the whole fix

pub mod backoff;
