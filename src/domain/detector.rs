//! Category detection over the requester's side of the transcript.
//!
//! Keyword sets are tested in a fixed priority order; the first set with any
//! hit wins. A hit is a substring that starts a word, so stems like "urinat"
//! match "urinating" while "rash" does not fire inside "crash".
//! A valid classifier hint overrides the keyword path.

use super::entities::{Category, Hint, Role, Utterance};

/// Priority-ordered keyword table. Earlier rows win when several match.
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Chest,
        &[
            "chest pain",
            "chest pressure",
            "chest tightness",
            "tight chest",
            "heart attack",
            "palpitation",
            "heart racing",
            "dolor de pecho",
            "dolor en el pecho",
        ],
    ),
    (
        Category::Fever,
        &["fever", "chills", "high temperature", "fiebre", "escalofr"],
    ),
    (
        Category::Eye,
        &["eye", "vision", "blurry", "conjunctiv", "mi ojo", "los ojos"],
    ),
    (
        Category::Gi,
        &[
            "stomach",
            "abdominal",
            "abdomen",
            "belly",
            "nausea",
            "vomit",
            "diarrhea",
            "diarrhoea",
            "constipat",
            "heartburn",
            "estómago",
            "vómito",
        ],
    ),
    (
        Category::Head,
        &["headache", "migraine", "head pain", "head hurts", "dolor de cabeza"],
    ),
    (
        Category::Resp,
        &[
            "cough",
            "breath",
            "wheez",
            "sore throat",
            "asthma",
            "tengo tos",
            "respirar",
        ],
    ),
    (
        Category::Skin,
        &[
            "rash",
            "itchy",
            "itching",
            "hives",
            "my skin",
            "skin is",
            "skin rash",
            "skin irritation",
            "blister",
            "sunburn",
            "sarpullido",
        ],
    ),
    (
        Category::Neuro,
        &[
            "dizz",
            "numbness",
            "went numb",
            "tingling",
            "seizure",
            "faint",
            "slurred",
            "confus",
            "mareo",
        ],
    ),
    (
        Category::Uro,
        &["urinat", "urine", "peeing", "bladder", "kidney", "pelvic", "orina"],
    ),
    (
        Category::Musculo,
        &[
            "back pain",
            "joint",
            "muscle",
            "sprain",
            "fracture",
            "twisted",
            "knee",
            "ankle",
            "shoulder",
        ],
    ),
];

/// Byte offsets where `term` occurs at the start of a word in `text`.
pub(crate) fn term_positions<'a>(
    text: &'a str,
    term: &'a str,
) -> impl Iterator<Item = usize> + 'a {
    text.match_indices(term)
        .map(|(at, _)| at)
        .filter(move |&at| {
            text[..at]
                .chars()
                .next_back()
                .is_none_or(|c| !c.is_alphanumeric())
        })
}

/// `term` occurs in `text` at a word start.
pub(crate) fn contains_term(text: &str, term: &str) -> bool {
    term_positions(text, term).next().is_some()
}

/// Lower-cased requester text, one line per turn. Non-requester roles are skipped.
pub fn requester_text(history: &[Utterance]) -> String {
    history
        .iter()
        .filter(|u| u.role == Role::Requester)
        .map(|u| u.content.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase()
}

/// Number of requester turns recorded so far.
pub fn answered_count(history: &[Utterance]) -> usize {
    history.iter().filter(|u| u.role == Role::Requester).count()
}

/// Keyword-only detection over already-normalized text.
pub fn detect_text(text: &str) -> Category {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_term(text, k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::General)
}

/// Resolve the consultation category. A valid hint wins; otherwise keyword rules.
pub fn detect(history: &[Utterance], hint: &Hint) -> Category {
    if let Some(category) = hint.category() {
        return category;
    }
    detect_text(&requester_text(history))
}
