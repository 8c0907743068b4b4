//! Facility reference data. Implements FacilityCatalog.

pub mod file_catalog;

pub use file_catalog::FileCatalog;
