//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    Category, ClassifierOutput, Consultation, Disposition, DomainError, Facility, LanguageCode,
    Role, Utterance,
};

/// Consultation store. Transcripts are append-only and read back in append order.
#[async_trait::async_trait]
pub trait ConsultationRepo: Send + Sync {
    /// Persist a freshly started consultation.
    async fn create(&self, consultation: &Consultation) -> Result<(), DomainError>;

    /// Consultation header (no transcript). `None` if it does not exist.
    async fn get(&self, id: &str) -> Result<Option<Consultation>, DomainError>;

    /// Headers owned by `owner_id`, newest first.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Consultation>, DomainError>;

    /// Append one utterance; the store assigns the next sequence number.
    async fn append_utterance(
        &self,
        id: &str,
        role: Role,
        content: &str,
    ) -> Result<Utterance, DomainError>;

    /// Full transcript ordered by sequence number.
    async fn utterances(&self, id: &str) -> Result<Vec<Utterance>, DomainError>;

    /// Record the category detected so far on an ACTIVE consultation.
    async fn update_category(&self, id: &str, category: Category) -> Result<(), DomainError>;

    /// Atomically append the closing SYSTEM utterance, set category and disposition,
    /// and mark the consultation COMPLETED. Nothing is written if any part fails.
    async fn complete(
        &self,
        id: &str,
        category: Category,
        disposition: &Disposition,
        closing_message: &str,
    ) -> Result<Utterance, DomainError>;

    /// Hard delete the consultation and its transcript.
    async fn delete(&self, id: &str) -> Result<(), DomainError>;
}

/// Free-text classifier. Advisory only: the caller validates the output and
/// treats any error as "no hint".
#[async_trait::async_trait]
pub trait ClassifierPort: Send + Sync {
    async fn classify(
        &self,
        text: &str,
        language: &LanguageCode,
    ) -> Result<ClassifierOutput, DomainError>;
}

/// Read-only facility reference data, refreshed out-of-band.
#[async_trait::async_trait]
pub trait FacilityCatalog: Send + Sync {
    /// Current snapshot of all facilities, in catalog order.
    async fn facilities(&self) -> Result<Vec<Facility>, DomainError>;
}
