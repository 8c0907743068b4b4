//! Infrastructure adapters. Implement outbound ports.
//!
//! Classifier, storage, facility catalog, terminal UI. Map errors to DomainError.

pub mod ai;
pub mod catalog;
pub mod persistence;
pub mod ui;
