//! Cross-cutting helpers shared by main and adapters.

pub mod config;
