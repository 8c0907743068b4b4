//! Consultation state machine: ACTIVE until the question list is exhausted, then COMPLETED.
//!
//! Position is never stored. It is replayed from the transcript by counting
//! requester turns, so the transcript must stay append-only and unpruned.

use super::detector::{answered_count, detect};
use super::disposition::resolve;
use super::entities::{AdvanceOutcome, Consultation, Hint, LanguageCode, Utterance};
use super::errors::DomainError;
use super::lexicon::questions_for;

/// Reject callers who do not own the consultation, then reject writes to a closed one.
pub fn ensure_writable(consultation: &Consultation, caller: &str) -> Result<(), DomainError> {
    if consultation.owner_id != caller {
        return Err(DomainError::PermissionDenied(consultation.id.clone()));
    }
    if consultation.is_completed() {
        return Err(DomainError::ConsultationClosed(consultation.id.clone()));
    }
    Ok(())
}

/// One conversation step over the full transcript.
///
/// Completes when the number of requester turns reaches the length of the
/// question list for the detected category; otherwise asks the question at
/// that index. Same inputs always give the same outcome.
pub fn advance(
    consultation: &Consultation,
    caller: &str,
    history: &[Utterance],
    language: &LanguageCode,
    hint: &Hint,
) -> Result<AdvanceOutcome, DomainError> {
    ensure_writable(consultation, caller)?;

    let category = detect(history, hint);
    let questions = questions_for(category, language);
    let answered = answered_count(history);

    if answered >= questions.len() {
        return Ok(AdvanceOutcome {
            category,
            next_question: None,
            is_complete: true,
            disposition: Some(resolve(history, category, hint)),
        });
    }

    Ok(AdvanceOutcome {
        category,
        next_question: Some(questions[answered].to_string()),
        is_complete: false,
        disposition: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Category, ConsultationStatus, Severity};

    fn en() -> LanguageCode {
        LanguageCode::parse("en").unwrap()
    }

    fn consultation() -> Consultation {
        Consultation::new("owner-1", en(), 0)
    }

    fn push_answer(history: &mut Vec<Utterance>, text: &str) {
        let seq = history.len() as i64 + 1;
        history.push(Utterance::requester(seq, text));
    }

    #[test]
    fn test_first_question_without_initial_utterance() {
        let out = advance(&consultation(), "owner-1", &[], &en(), &Hint::None).unwrap();
        assert_eq!(out.category, Category::General);
        assert!(!out.is_complete);
        assert_eq!(
            out.next_question.as_deref(),
            Some(questions_for(Category::General, &en())[0])
        );
    }

    #[test]
    fn test_initial_utterance_counts_as_a_turn() {
        let mut h = Vec::new();
        push_answer(&mut h, "I have chest pain and pressure");
        let out = advance(&consultation(), "owner-1", &h, &en(), &Hint::None).unwrap();
        assert_eq!(out.category, Category::Chest);
        assert_eq!(
            out.next_question.as_deref(),
            Some(questions_for(Category::Chest, &en())[1])
        );
    }

    #[test]
    fn test_completes_on_exactly_the_last_answer() {
        let c = consultation();
        let total = questions_for(Category::Fever, &en()).len();
        let mut h = Vec::new();
        for turn in 1..=total {
            let text = if turn == 1 { "I have a fever" } else { "yes" };
            push_answer(&mut h, text);
            let out = advance(&c, "owner-1", &h, &en(), &Hint::None).unwrap();
            assert_eq!(out.category, Category::Fever);
            assert_eq!(out.is_complete, turn == total, "turn {}", turn);
            assert_eq!(out.disposition.is_some(), turn == total);
            assert_eq!(out.next_question.is_none(), turn == total);
        }
    }

    #[test]
    fn test_system_turns_do_not_advance() {
        let mut h = vec![Utterance::system(1, "Please describe your main symptom.")];
        push_answer(&mut h, "my knee hurts");
        h.push(Utterance::system(3, "How did the injury happen?"));
        let out = advance(&consultation(), "owner-1", &h, &en(), &Hint::None).unwrap();
        assert_eq!(
            out.next_question.as_deref(),
            Some(questions_for(Category::Musculo, &en())[1])
        );
    }

    #[test]
    fn test_advance_is_idempotent() {
        let mut h = Vec::new();
        push_answer(&mut h, "bad cough");
        push_answer(&mut h, "three days");
        let c = consultation();
        let a = advance(&c, "owner-1", &h, &en(), &Hint::None).unwrap();
        let b = advance(&c, "owner-1", &h, &en(), &Hint::None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_owner_is_denied() {
        let err = advance(&consultation(), "intruder", &[], &en(), &Hint::None).unwrap_err();
        assert!(matches!(err, DomainError::PermissionDenied(_)));
    }

    #[test]
    fn test_completed_consultation_is_closed() {
        let mut c = consultation();
        c.status = ConsultationStatus::Completed;
        let err = advance(&c, "owner-1", &[], &en(), &Hint::None).unwrap_err();
        assert!(matches!(err, DomainError::ConsultationClosed(_)));
    }

    #[test]
    fn test_hint_red_flags_reach_disposition() {
        let c = consultation();
        let hint = Hint::Valid {
            category: Category::Head,
            red_flags: vec!["thunderclap onset".into()],
            duration: None,
        };
        let mut h = Vec::new();
        for _ in 0..questions_for(Category::Head, &en()).len() {
            push_answer(&mut h, "ok");
        }
        let out = advance(&c, "owner-1", &h, &en(), &hint).unwrap();
        assert!(out.is_complete);
        assert_eq!(out.category, Category::Head);
        assert_eq!(out.disposition.unwrap().severity, Severity::Critical);
    }
}
