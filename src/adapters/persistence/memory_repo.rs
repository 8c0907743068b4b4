//! Implements ConsultationRepo in process memory.
//!
//! Used by tests and by the TUI when no data directory is writable.

use crate::domain::{
    Category, Consultation, ConsultationStatus, Disposition, DomainError, Role, Utterance,
};
use crate::ports::ConsultationRepo;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug)]
struct Entry {
    consultation: Consultation,
    transcript: Vec<Utterance>,
}

/// In-memory consultation store.
#[derive(Default)]
pub struct MemoryRepo {
    entries: tokio::sync::RwLock<HashMap<String, Entry>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn not_found(id: &str) -> DomainError {
    DomainError::NotFound(id.to_string())
}

/// Writable entry: exists and is still ACTIVE.
fn active_entry<'a>(
    entries: &'a mut HashMap<String, Entry>,
    id: &str,
) -> Result<&'a mut Entry, DomainError> {
    let entry = entries.get_mut(id).ok_or_else(|| not_found(id))?;
    if entry.consultation.is_completed() {
        return Err(DomainError::ConsultationClosed(id.to_string()));
    }
    Ok(entry)
}

impl Entry {
    fn push(&mut self, role: Role, content: &str, now: i64) -> Utterance {
        let utterance = Utterance {
            seq: self.transcript.len() as i64 + 1,
            role,
            content: content.to_string(),
            created_at: now,
        };
        self.transcript.push(utterance.clone());
        self.consultation.updated_at = now;
        utterance
    }
}

#[async_trait::async_trait]
impl ConsultationRepo for MemoryRepo {
    async fn create(&self, consultation: &Consultation) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&consultation.id) {
            return Err(DomainError::Repo(format!(
                "consultation {} already exists",
                consultation.id
            )));
        }
        entries.insert(
            consultation.id.clone(),
            Entry {
                consultation: consultation.clone(),
                transcript: Vec::new(),
            },
        );
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Consultation>, DomainError> {
        let entries = self.entries.read().await;
        Ok(entries.get(id).map(|e| e.consultation.clone()))
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Consultation>, DomainError> {
        let entries = self.entries.read().await;
        let mut out: Vec<Consultation> = entries
            .values()
            .filter(|e| e.consultation.owner_id == owner_id)
            .map(|e| e.consultation.clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn append_utterance(
        &self,
        id: &str,
        role: Role,
        content: &str,
    ) -> Result<Utterance, DomainError> {
        let mut entries = self.entries.write().await;
        let entry = active_entry(&mut entries, id)?;
        Ok(entry.push(role, content, now_secs()))
    }

    async fn utterances(&self, id: &str) -> Result<Vec<Utterance>, DomainError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(id)
            .map(|e| e.transcript.clone())
            .unwrap_or_default())
    }

    async fn update_category(&self, id: &str, category: Category) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        let entry = active_entry(&mut entries, id)?;
        entry.consultation.category = Some(category);
        entry.consultation.updated_at = now_secs();
        Ok(())
    }

    async fn complete(
        &self,
        id: &str,
        category: Category,
        disposition: &Disposition,
        closing_message: &str,
    ) -> Result<Utterance, DomainError> {
        let mut entries = self.entries.write().await;
        let entry = active_entry(&mut entries, id)?;
        let closing = entry.push(Role::System, closing_message, now_secs());
        entry.consultation.status = ConsultationStatus::Completed;
        entry.consultation.category = Some(category);
        entry.consultation.disposition = Some(disposition.clone());
        Ok(closing)
    }

    async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        entries.remove(id).map(|_| ()).ok_or_else(|| not_found(id))
    }
}
