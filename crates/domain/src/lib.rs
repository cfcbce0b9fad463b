//! Domain layer for the conference registration backend.
//!
//! This crate contains:
//! - Domain models (Registration, NotificationLogEntry, RegistrationStats)
//! - The intake validator and the registration lifecycle service
//! - The store and notifier seams, with in-memory/mock implementations

pub mod models;
pub mod services;
