//! AI adapter module. Implements ClassifierPort for LLM-backed symptom hints.
//!
//! Provides an OpenAI-compatible adapter and a mock adapter for testing.

pub mod mock_adapter;
pub mod openai_adapter;

pub use mock_adapter::MockClassifier;
pub use openai_adapter::OpenAiClassifier;
