//! Shared utilities for the conference registration backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Email shape checks and normalization
//! - Trimming helpers for optional free-text fields

pub mod validation;
