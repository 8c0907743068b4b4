//! Mock classifier for running without API calls.
//!
//! Returns a canned hint, or fails like an unreachable service.

use crate::domain::{ClassifierOutput, DomainError, LanguageCode};
use crate::ports::ClassifierPort;
use std::time::Duration;
use tracing::info;

/// Mock classifier.
///
/// Returns a predetermined response without making API calls.
/// Simulates network latency with configurable delay.
pub struct MockClassifier {
    /// `None` behaves like an unreachable service.
    output: Option<ClassifierOutput>,
    /// Simulated network delay in milliseconds.
    delay_ms: u64,
}

impl MockClassifier {
    /// Mock that always answers with `output`, without delay.
    pub fn with_output(output: ClassifierOutput) -> Self {
        Self {
            output: Some(output),
            delay_ms: 0,
        }
    }

    /// Mock whose every call fails with `DependencyUnavailable`.
    pub fn unavailable() -> Self {
        Self {
            output: None,
            delay_ms: 0,
        }
    }

    /// Add simulated latency.
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

#[async_trait::async_trait]
impl ClassifierPort for MockClassifier {
    async fn classify(
        &self,
        text: &str,
        language: &LanguageCode,
    ) -> Result<ClassifierOutput, DomainError> {
        info!(
            text_len = text.len(),
            language = %language,
            "[MOCK] Simulating symptom classification"
        );

        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        self.output
            .clone()
            .ok_or_else(|| DomainError::DependencyUnavailable("[MOCK] classifier offline".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_classifier() {
        let mock = MockClassifier::with_output(ClassifierOutput {
            category: Some("FEVER".into()),
            red_flags: vec!["stiff neck".into()],
            duration: Some("3 days".into()),
        })
        .with_delay(10);

        let out = mock
            .classify("fever and stiff neck", &LanguageCode::default())
            .await
            .unwrap();
        assert_eq!(out.category.as_deref(), Some("FEVER"));
        assert_eq!(out.red_flags.len(), 1);

        let offline = MockClassifier::unavailable();
        assert!(matches!(
            offline.classify("x", &LanguageCode::default()).await,
            Err(DomainError::DependencyUnavailable(_))
        ));
    }
}
