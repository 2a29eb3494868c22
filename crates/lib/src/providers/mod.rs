//! # Providers
//!
//! Outbound integrations used by the intake pipeline.

pub mod ai;
