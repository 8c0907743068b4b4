//! Triage interview use case: start a consultation, submit answers, read or delete it.
//!
//! - Validates input before touching the store
//! - Serializes submissions per consultation id (keyed async lock)
//! - Asks the optional classifier for a hint under a timeout; any failure means "no hint"
//! - Persists the detected category each turn and the disposition once, at completion

use crate::domain::detector::requester_text;
use crate::domain::{
    Consultation, ConsultationStatus, DomainError, Hint, LanguageCode, Role, TurnOutcome,
    Utterance, advance, ensure_writable, format_disposition,
};
use crate::ports::{ClassifierPort, ConsultationRepo};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// One async mutex per consultation id. Entries are weak so idle ids drop out.
#[derive(Default)]
struct SessionLocks {
    inner: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl SessionLocks {
    async fn acquire(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.retain(|_, w| w.strong_count() > 0);
            match map.get(id).and_then(Weak::upgrade) {
                Some(existing) => existing,
                None => {
                    let fresh = Arc::new(AsyncMutex::new(()));
                    map.insert(id.to_string(), Arc::downgrade(&fresh));
                    fresh
                }
            }
        };
        lock.lock_owned().await
    }
}

/// Consultation service. Drives the conversation state machine against the store.
pub struct ConsultationService {
    repo: Arc<dyn ConsultationRepo>,
    classifier: Option<Arc<dyn ClassifierPort>>,
    classifier_timeout: Duration,
    locks: SessionLocks,
}

impl ConsultationService {
    /// Create a new consultation service.
    ///
    /// # Arguments
    /// * `repo` - Consultation store (SQLite, in-memory, ...)
    /// * `classifier` - Optional hint source; `None` runs keyword rules only
    /// * `classifier_timeout` - Upper bound for one classifier call
    pub fn new(
        repo: Arc<dyn ConsultationRepo>,
        classifier: Option<Arc<dyn ClassifierPort>>,
        classifier_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            classifier,
            classifier_timeout,
            locks: SessionLocks::default(),
        }
    }

    /// Create a consultation and return the first prompt.
    ///
    /// A non-blank `initial_utterance` is recorded as the first requester turn.
    pub async fn start_consultation(
        &self,
        owner_id: &str,
        language: &str,
        initial_utterance: Option<&str>,
    ) -> Result<TurnOutcome, DomainError> {
        let owner_id = validate_owner(owner_id)?;
        let language = LanguageCode::parse(language)?;
        let initial = initial_utterance.map(str::trim).filter(|t| !t.is_empty());

        let consultation = Consultation::new(owner_id, language.clone(), now_secs());
        let _guard = self.locks.acquire(&consultation.id).await;
        self.repo.create(&consultation).await?;
        if let Some(text) = initial {
            self.repo
                .append_utterance(&consultation.id, Role::Requester, text)
                .await?;
        }

        info!(
            consultation_id = %consultation.id,
            language = %language,
            with_initial = initial.is_some(),
            "consultation started"
        );

        self.step(&consultation, owner_id, &language).await
    }

    /// Append a requester answer and advance the interview.
    ///
    /// Returns the next question, or the formatted disposition when the interview completes.
    pub async fn submit_utterance(
        &self,
        consultation_id: &str,
        owner_id: &str,
        text: &str,
        language: &str,
    ) -> Result<TurnOutcome, DomainError> {
        let language = LanguageCode::parse(language)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::Validation("utterance text is empty".into()));
        }

        let _guard = self.locks.acquire(consultation_id).await;
        let consultation = self.load(consultation_id).await?;
        ensure_writable(&consultation, owner_id)?;

        self.repo
            .append_utterance(consultation_id, Role::Requester, text)
            .await?;

        self.step(&consultation, owner_id, &language).await
    }

    /// Consultation header and transcript. Readable in any state by its owner.
    pub async fn get_consultation(
        &self,
        consultation_id: &str,
        owner_id: &str,
    ) -> Result<(Consultation, Vec<Utterance>), DomainError> {
        let consultation = self.load(consultation_id).await?;
        ensure_owner(&consultation, owner_id)?;
        let transcript = self.repo.utterances(consultation_id).await?;
        Ok((consultation, transcript))
    }

    /// Consultations owned by `owner_id`, newest first.
    pub async fn list_consultations(&self, owner_id: &str) -> Result<Vec<Consultation>, DomainError> {
        let owner_id = validate_owner(owner_id)?;
        self.repo.list_by_owner(owner_id).await
    }

    /// Hard delete. Allowed for the owner regardless of status.
    pub async fn delete_consultation(
        &self,
        consultation_id: &str,
        owner_id: &str,
    ) -> Result<(), DomainError> {
        let _guard = self.locks.acquire(consultation_id).await;
        let consultation = self.load(consultation_id).await?;
        ensure_owner(&consultation, owner_id)?;
        self.repo.delete(consultation_id).await?;
        info!(consultation_id, "consultation deleted");
        Ok(())
    }

    async fn load(&self, consultation_id: &str) -> Result<Consultation, DomainError> {
        self.repo
            .get(consultation_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(consultation_id.to_string()))
    }

    /// Replay the transcript through the state machine and persist the result.
    /// Caller holds the consultation lock.
    async fn step(
        &self,
        consultation: &Consultation,
        owner_id: &str,
        language: &LanguageCode,
    ) -> Result<TurnOutcome, DomainError> {
        let history = self.repo.utterances(&consultation.id).await?;
        let hint = self.hint_for(&history, language).await;
        let outcome = advance(consultation, owner_id, &history, language, &hint)?;

        match (&outcome.disposition, &outcome.next_question) {
            (Some(disposition), _) => {
                let prompt = format_disposition(disposition);
                self.repo
                    .complete(&consultation.id, outcome.category, disposition, &prompt)
                    .await?;
                info!(
                    consultation_id = %consultation.id,
                    category = %outcome.category,
                    severity = %disposition.severity,
                    "consultation completed"
                );
                Ok(TurnOutcome {
                    consultation_id: consultation.id.clone(),
                    category: outcome.category,
                    status: ConsultationStatus::Completed,
                    severity: Some(disposition.severity),
                    prompt,
                })
            }
            (None, Some(question)) => {
                if consultation.category != Some(outcome.category) {
                    self.repo
                        .update_category(&consultation.id, outcome.category)
                        .await?;
                }
                self.repo
                    .append_utterance(&consultation.id, Role::System, question)
                    .await?;
                debug!(
                    consultation_id = %consultation.id,
                    category = %outcome.category,
                    "next question asked"
                );
                Ok(TurnOutcome {
                    consultation_id: consultation.id.clone(),
                    category: outcome.category,
                    status: ConsultationStatus::Active,
                    severity: None,
                    prompt: question.clone(),
                })
            }
            (None, None) => Err(DomainError::Validation(
                "conversation step produced neither a question nor a disposition".into(),
            )),
        }
    }

    /// Classifier hint for the current requester text. Never fails: errors and timeouts give `Hint::None`.
    async fn hint_for(&self, history: &[Utterance], language: &LanguageCode) -> Hint {
        let Some(classifier) = &self.classifier else {
            return Hint::None;
        };
        let text = requester_text(history);
        if text.is_empty() {
            return Hint::None;
        }

        match tokio::time::timeout(self.classifier_timeout, classifier.classify(&text, language))
            .await
        {
            Ok(Ok(output)) => {
                let hint = Hint::from_output(output);
                match &hint {
                    Hint::Valid {
                        category,
                        red_flags,
                        duration,
                    } => debug!(
                        category = %category,
                        red_flags = red_flags.len(),
                        duration = duration.as_deref().unwrap_or("-"),
                        "classifier hint accepted"
                    ),
                    Hint::Invalid => warn!("classifier returned malformed hint, using keyword rules"),
                    Hint::None => {}
                }
                hint
            }
            Ok(Err(e)) => {
                warn!(error = %e, "classifier unavailable, using keyword rules");
                Hint::None
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.classifier_timeout.as_millis() as u64,
                    "classifier timed out, using keyword rules"
                );
                Hint::None
            }
        }
    }
}

fn validate_owner(owner_id: &str) -> Result<&str, DomainError> {
    let owner_id = owner_id.trim();
    if owner_id.is_empty() {
        return Err(DomainError::Validation("owner id is empty".into()));
    }
    Ok(owner_id)
}

fn ensure_owner(consultation: &Consultation, owner_id: &str) -> Result<(), DomainError> {
    if consultation.owner_id != owner_id {
        return Err(DomainError::PermissionDenied(consultation.id.clone()));
    }
    Ok(())
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockClassifier;
    use crate::adapters::persistence::memory_repo::MemoryRepo;
    use crate::domain::{Category, ClassifierOutput, Disposition, Severity, questions_for};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn service(classifier: Option<Arc<dyn ClassifierPort>>) -> (ConsultationService, Arc<MemoryRepo>) {
        let repo = Arc::new(MemoryRepo::new());
        let svc = ConsultationService::new(
            Arc::clone(&repo) as Arc<dyn ConsultationRepo>,
            classifier,
            Duration::from_millis(50),
        );
        (svc, repo)
    }

    fn en() -> LanguageCode {
        LanguageCode::parse("en").unwrap()
    }

    #[tokio::test]
    async fn test_chest_pain_scenario_end_to_end() {
        let (svc, _) = service(None);
        let start = svc
            .start_consultation("alice", "en", Some("I have chest pain and pressure"))
            .await
            .unwrap();
        assert_eq!(start.category, Category::Chest);
        assert_eq!(start.status, ConsultationStatus::Active);
        assert_eq!(start.prompt, questions_for(Category::Chest, &en())[1]);

        let answers = [
            "Yes, trouble breathing",
            "Spreads to left arm",
            "Sweating heavily",
            "9 out of 10",
        ];
        let mut last = None;
        for (i, answer) in answers.iter().enumerate() {
            let out = svc
                .submit_utterance(&start.consultation_id, "alice", answer, "en")
                .await
                .unwrap();
            let final_turn = i == answers.len() - 1;
            assert_eq!(out.status == ConsultationStatus::Completed, final_turn);
            last = Some(out);
        }
        let last = last.unwrap();
        assert_eq!(last.category, Category::Chest);
        assert_eq!(last.severity, Some(Severity::Critical));

        let (consultation, transcript) = svc
            .get_consultation(&start.consultation_id, "alice")
            .await
            .unwrap();
        assert!(consultation.is_completed());
        assert_eq!(consultation.category, Some(Category::Chest));
        let disposition = consultation.disposition.unwrap();
        assert!(disposition.specialty.contains("Cardiology"));
        assert_eq!(disposition.summary, "CHEST triage completed with severity CRITICAL.");
        // 5 requester turns, each answered by a system utterance.
        assert_eq!(transcript.len(), 10);
    }

    /// MemoryRepo whose first `complete` call fails.
    struct FlakyCompleteRepo {
        inner: MemoryRepo,
        fail_next_complete: AtomicBool,
    }

    #[async_trait::async_trait]
    impl ConsultationRepo for FlakyCompleteRepo {
        async fn create(&self, consultation: &Consultation) -> Result<(), DomainError> {
            self.inner.create(consultation).await
        }
        async fn get(&self, id: &str) -> Result<Option<Consultation>, DomainError> {
            self.inner.get(id).await
        }
        async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Consultation>, DomainError> {
            self.inner.list_by_owner(owner_id).await
        }
        async fn append_utterance(
            &self,
            id: &str,
            role: Role,
            content: &str,
        ) -> Result<Utterance, DomainError> {
            self.inner.append_utterance(id, role, content).await
        }
        async fn utterances(&self, id: &str) -> Result<Vec<Utterance>, DomainError> {
            self.inner.utterances(id).await
        }
        async fn update_category(&self, id: &str, category: Category) -> Result<(), DomainError> {
            self.inner.update_category(id, category).await
        }
        async fn complete(
            &self,
            id: &str,
            category: Category,
            disposition: &Disposition,
            closing_message: &str,
        ) -> Result<Utterance, DomainError> {
            if self.fail_next_complete.swap(false, Ordering::SeqCst) {
                return Err(DomainError::Repo("disk full".into()));
            }
            self.inner
                .complete(id, category, disposition, closing_message)
                .await
        }
        async fn delete(&self, id: &str) -> Result<(), DomainError> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_failed_completion_leaves_consultation_retryable() {
        let repo = Arc::new(FlakyCompleteRepo {
            inner: MemoryRepo::new(),
            fail_next_complete: AtomicBool::new(true),
        });
        let svc = ConsultationService::new(
            Arc::clone(&repo) as Arc<dyn ConsultationRepo>,
            None,
            Duration::from_millis(50),
        );
        let start = svc
            .start_consultation("erin", "en", Some("I have chest pain and pressure"))
            .await
            .unwrap();
        let id = start.consultation_id.clone();
        for answer in ["Yes, trouble breathing", "Spreads to left arm", "Sweating heavily"] {
            svc.submit_utterance(&id, "erin", answer, "en").await.unwrap();
        }

        let err = svc
            .submit_utterance(&id, "erin", "9 out of 10", "en")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Repo(_)));
        let (consultation, transcript) = svc.get_consultation(&id, "erin").await.unwrap();
        assert!(!consultation.is_completed());
        assert!(consultation.disposition.is_none());
        assert_eq!(transcript.last().unwrap().role, Role::Requester);

        let retry = svc
            .submit_utterance(&id, "erin", "9 out of 10", "en")
            .await
            .unwrap();
        assert_eq!(retry.status, ConsultationStatus::Completed);
        assert_eq!(retry.severity, Some(Severity::Critical));
        assert!(retry.prompt.contains("triage completed"));

        let (consultation, transcript) = svc.get_consultation(&id, "erin").await.unwrap();
        assert!(consultation.is_completed());
        let closing = transcript.last().unwrap();
        assert_eq!(closing.role, Role::System);
        assert_eq!(closing.content, retry.prompt);
        assert_eq!(
            transcript.iter().filter(|u| u.role == Role::System).count(),
            5
        );
    }

    #[tokio::test]
    async fn test_closed_consultation_rejects_new_utterances() {
        let (svc, repo) = service(None);
        let start = svc.start_consultation("bob", "en", None).await.unwrap();
        let total = questions_for(Category::General, &en()).len();
        for _ in 0..total {
            svc.submit_utterance(&start.consultation_id, "bob", "not sure", "en")
                .await
                .unwrap();
        }
        let before = repo.utterances(&start.consultation_id).await.unwrap().len();
        let err = svc
            .submit_utterance(&start.consultation_id, "bob", "one more thing", "en")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConsultationClosed(_)));
        assert_eq!(repo.utterances(&start.consultation_id).await.unwrap().len(), before);
        assert!(svc.get_consultation(&start.consultation_id, "bob").await.is_ok());
    }

    #[tokio::test]
    async fn test_other_owner_is_denied() {
        let (svc, _) = service(None);
        let start = svc.start_consultation("carol", "en", None).await.unwrap();
        let err = svc
            .submit_utterance(&start.consultation_id, "mallory", "hi", "en")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::PermissionDenied(_)));
        assert!(matches!(
            svc.get_consultation(&start.consultation_id, "mallory").await,
            Err(DomainError::PermissionDenied(_))
        ));
        assert!(matches!(
            svc.delete_consultation(&start.consultation_id, "mallory").await,
            Err(DomainError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_validation_happens_before_mutation() {
        let (svc, repo) = service(None);
        let start = svc.start_consultation("dan", "en", None).await.unwrap();
        let before = repo.utterances(&start.consultation_id).await.unwrap().len();

        let blank = svc
            .submit_utterance(&start.consultation_id, "dan", "   ", "en")
            .await;
        assert!(matches!(blank, Err(DomainError::Validation(_))));
        let bad_lang = svc
            .submit_utterance(&start.consultation_id, "dan", "headache", "english!")
            .await;
        assert!(matches!(bad_lang, Err(DomainError::Validation(_))));

        assert_eq!(repo.utterances(&start.consultation_id).await.unwrap().len(), before);
        assert!(matches!(
            svc.start_consultation("", "en", None).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_consultation_is_not_found() {
        let (svc, _) = service(None);
        let err = svc
            .submit_utterance("missing", "erin", "hello", "en")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_owner_can_delete_in_any_state() {
        let (svc, _) = service(None);
        let start = svc.start_consultation("fay", "en", Some("rash")).await.unwrap();
        svc.delete_consultation(&start.consultation_id, "fay")
            .await
            .unwrap();
        assert!(matches!(
            svc.get_consultation(&start.consultation_id, "fay").await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_valid_hint_overrides_category() {
        let mock = MockClassifier::with_output(ClassifierOutput {
            category: Some("NEURO".into()),
            red_flags: vec![],
            duration: Some("2 hours".into()),
        });
        let (svc, _) = service(Some(Arc::new(mock)));
        let start = svc
            .start_consultation("gus", "en", Some("my stomach feels odd"))
            .await
            .unwrap();
        assert_eq!(start.category, Category::Neuro);
    }

    #[tokio::test]
    async fn test_classifier_failures_degrade_to_keywords() {
        let malformed = MockClassifier::with_output(ClassifierOutput {
            category: Some("banana".into()),
            red_flags: vec!["unconscious".into()],
            duration: None,
        });
        let down = MockClassifier::unavailable();
        let slow = MockClassifier::with_output(ClassifierOutput {
            category: Some("EYE".into()),
            ..Default::default()
        })
        .with_delay(500);

        for mock in [malformed, down, slow] {
            let (svc, _) = service(Some(Arc::new(mock)));
            let start = svc
                .start_consultation("hal", "en", Some("my stomach hurts"))
                .await
                .unwrap();
            assert_eq!(start.category, Category::Gi);
        }
    }

    #[tokio::test]
    async fn test_concurrent_submissions_are_serialized() {
        let (svc, repo) = service(None);
        let svc = Arc::new(svc);
        let start = svc.start_consultation("ivy", "en", None).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..3 {
            let svc = Arc::clone(&svc);
            let id = start.consultation_id.clone();
            handles.push(tokio::spawn(async move {
                svc.submit_utterance(&id, "ivy", &format!("answer {}", i), "en")
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let transcript = repo.utterances(&start.consultation_id).await.unwrap();
        // First question, then strictly alternating requester/system pairs.
        assert_eq!(transcript.len(), 7);
        assert_eq!(transcript[0].role, Role::System);
        for pair in transcript[1..].chunks(2) {
            assert_eq!(pair[0].role, Role::Requester);
            assert_eq!(pair[1].role, Role::System);
        }
    }

    #[tokio::test]
    async fn test_list_consultations_by_owner() {
        let (svc, _) = service(None);
        svc.start_consultation("jo", "en", None).await.unwrap();
        svc.start_consultation("jo", "es", Some("tengo fiebre")).await.unwrap();
        svc.start_consultation("kim", "en", None).await.unwrap();
        assert_eq!(svc.list_consultations("jo").await.unwrap().len(), 2);
        assert_eq!(svc.list_consultations("kim").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_spanish_prompts() {
        let (svc, _) = service(None);
        let start = svc
            .start_consultation("luz", "es-MX", Some("tengo fiebre"))
            .await
            .unwrap();
        assert_eq!(start.category, Category::Fever);
        let es = LanguageCode::parse("es").unwrap();
        assert_eq!(start.prompt, questions_for(Category::Fever, &es)[1]);
    }
}
