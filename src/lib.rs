//! Consentd - consent management service
//!
//! Relying services submit signed consent requests, subjects approve them
//! through a front end, and consentd answers point lookups for standing
//! consent. This library exposes all modules for testing purposes.

pub mod consent;
pub mod entities;
pub mod errors;
pub mod identity;
pub mod keys;
pub mod manager;
pub mod request;
pub mod settings;
pub mod storage;
pub mod web;
