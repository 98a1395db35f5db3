//! # bd-core
//!
//! Core types, traits, and utilities for BizDev CRM RS.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - The error taxonomy (`CrmError`, `ValidationErrors`)
//! - Result type aliases
//! - Core traits (Identifiable, Timestamped)
//! - Configuration types

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::*;
pub use result::*;
pub use traits::*;
