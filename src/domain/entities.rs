//! Domain entities. Pure data structures for the core business.
//!
//! No storage/HTTP types here; adapters map into these.

use super::errors::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of symptom groupings. Selects the question list and disposition tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Chest,
    Fever,
    Eye,
    Gi,
    Head,
    Resp,
    Skin,
    Neuro,
    Uro,
    Musculo,
    General,
}

impl Category {
    /// Every category, GENERAL last.
    pub const ALL: [Category; 11] = [
        Category::Chest,
        Category::Fever,
        Category::Eye,
        Category::Gi,
        Category::Head,
        Category::Resp,
        Category::Skin,
        Category::Neuro,
        Category::Uro,
        Category::Musculo,
        Category::General,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Category::Chest => "CHEST",
            Category::Fever => "FEVER",
            Category::Eye => "EYE",
            Category::Gi => "GI",
            Category::Head => "HEAD",
            Category::Resp => "RESP",
            Category::Skin => "SKIN",
            Category::Neuro => "NEURO",
            Category::Uro => "URO",
            Category::Musculo => "MUSCULO",
            Category::General => "GENERAL",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .iter()
            .find(|c| c.code().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| DomainError::Validation(format!("unknown category '{}'", wanted)))
    }
}

/// Ordinal urgency verdict computed at consultation completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn code(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// HIGH and CRITICAL favour emergency-ready facilities when ranking.
    pub fn is_urgent(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Severity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(DomainError::Validation(format!(
                "unknown severity token '{}'",
                other
            ))),
        }
    }
}

/// Validated, normalized language code (`en`, `es`, `en-US` -> `en`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    pub const DEFAULT: &'static str = "en";

    /// Accepts 2–3 ASCII letters with an optional `-`/`_` region suffix; keeps only the primary tag.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        let primary = trimmed.split(['-', '_']).next().unwrap_or_default();
        let valid = (2..=3).contains(&primary.len())
            && primary.chars().all(|c| c.is_ascii_alphabetic());
        if !valid {
            return Err(DomainError::Validation(format!(
                "invalid language code '{}'",
                trimmed
            )));
        }
        Ok(Self(primary.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageCode {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LanguageCode> for String {
    fn from(value: LanguageCode) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsultationStatus {
    Active,
    Completed,
}

impl ConsultationStatus {
    pub fn code(&self) -> &'static str {
        match self {
            ConsultationStatus::Active => "ACTIVE",
            ConsultationStatus::Completed => "COMPLETED",
        }
    }

    /// Lenient parse for persisted rows; anything but COMPLETED reads as ACTIVE.
    pub fn from_code(code: &str) -> Self {
        if code.eq_ignore_ascii_case("COMPLETED") {
            ConsultationStatus::Completed
        } else {
            ConsultationStatus::Active
        }
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Bundle produced once, at completion. Its presence on a consultation is all-or-nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disposition {
    pub severity: Severity,
    pub first_aid: Vec<String>,
    pub warnings: Vec<String>,
    pub specialty: String,
    pub summary: String,
}

/// One symptom-interview session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    pub id: String,
    pub owner_id: String,
    pub language: LanguageCode,
    pub status: ConsultationStatus,
    pub category: Option<Category>,
    pub disposition: Option<Disposition>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Consultation {
    /// New ACTIVE consultation with a random id.
    pub fn new(owner_id: &str, language: LanguageCode, now: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            language,
            status: ConsultationStatus::Active,
            category: None,
            disposition: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == ConsultationStatus::Completed
    }

    pub fn severity(&self) -> Option<Severity> {
        self.disposition.as_ref().map(|d| d.severity)
    }
}

/// Utterance author. Unrecognized persisted roles read as `Unknown` and are never requester text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Requester,
    System,
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn code(&self) -> &'static str {
        match self {
            Role::Requester => "REQUESTER",
            Role::System => "SYSTEM",
            Role::Unknown => "UNKNOWN",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "REQUESTER" | "USER" => Role::Requester,
            "SYSTEM" | "ASSISTANT" => Role::System,
            _ => Role::Unknown,
        }
    }
}

/// A single append-only entry in a consultation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    /// 1-based position within the consultation.
    pub seq: i64,
    pub role: Role,
    pub content: String,
    pub created_at: i64,
}

impl Utterance {
    pub fn requester(seq: i64, content: impl Into<String>) -> Self {
        Self {
            seq,
            role: Role::Requester,
            content: content.into(),
            created_at: 0,
        }
    }

    pub fn system(seq: i64, content: impl Into<String>) -> Self {
        Self {
            seq,
            role: Role::System,
            content: content.into(),
            created_at: 0,
        }
    }
}

/// Raw classifier response, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierOutput {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

/// Advisory signal from an external classifier, validated against the closed category set.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Hint {
    #[default]
    None,
    Valid {
        category: Category,
        red_flags: Vec<String>,
        duration: Option<String>,
    },
    Invalid,
}

impl Hint {
    /// Validate a classifier response. A missing or unknown category makes the whole hint invalid.
    pub fn from_output(output: ClassifierOutput) -> Self {
        let Some(category) = output
            .category
            .as_deref()
            .and_then(|c| c.parse::<Category>().ok())
        else {
            return Hint::Invalid;
        };
        let red_flags = output
            .red_flags
            .into_iter()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        let duration = output
            .duration
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Hint::Valid {
            category,
            red_flags,
            duration,
        }
    }

    pub fn category(&self) -> Option<Category> {
        match self {
            Hint::Valid { category, .. } => Some(*category),
            Hint::None | Hint::Invalid => None,
        }
    }

    pub fn red_flags(&self) -> &[String] {
        match self {
            Hint::Valid { red_flags, .. } => red_flags,
            Hint::None | Hint::Invalid => &[],
        }
    }
}

/// Geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Result<Self, DomainError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(DomainError::Validation(format!(
                "coordinates out of range: {}, {}",
                lat, lng
            )));
        }
        Ok(Self { lat, lng })
    }
}

/// A care-providing location. Reference data, read-only for the ranking engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub location: Coordinates,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_24h: bool,
    #[serde(default)]
    pub emergency_ready: bool,
    /// 0–5, absent when unrated.
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

impl Facility {
    pub fn has_specialty(&self, wanted: &str) -> bool {
        contains_tag(&self.specialties, wanted)
    }

    pub fn has_amenity(&self, wanted: &str) -> bool {
        contains_tag(&self.amenities, wanted)
    }
}

fn contains_tag(tags: &[String], wanted: &str) -> bool {
    let wanted = wanted.trim();
    tags.iter().any(|t| t.trim().eq_ignore_ascii_case(wanted))
}

/// Hard filters. A facility must satisfy every filter that is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingFilters {
    pub specialty: Option<String>,
    pub amenity: Option<String>,
    pub is_public: Option<bool>,
    pub min_rating: Option<f64>,
}

/// Per-call ranking context. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingRequest {
    pub origin: Option<Coordinates>,
    pub category: Option<Category>,
    pub severity: Option<Severity>,
    #[serde(default)]
    pub filters: RankingFilters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFacility {
    pub facility: Facility,
    pub distance_km: Option<f64>,
    pub score: f64,
}

/// Result of one conversation step.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceOutcome {
    pub category: Category,
    pub next_question: Option<String>,
    pub is_complete: bool,
    pub disposition: Option<Disposition>,
}

/// What the host application gets back from start/submit.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub consultation_id: String,
    pub category: Category,
    pub status: ConsultationStatus,
    pub severity: Option<Severity>,
    /// Next question while ACTIVE; formatted disposition once COMPLETED.
    pub prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("chest".parse::<Category>().unwrap(), Category::Chest);
        assert_eq!(" Musculo ".parse::<Category>().unwrap(), Category::Musculo);
        assert!("cardiac".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serde_uses_codes() {
        let json = serde_json::to_string(&Category::Gi).unwrap();
        assert_eq!(json, "\"GI\"");
        let back: Category = serde_json::from_str("\"NEURO\"").unwrap();
        assert_eq!(back, Category::Neuro);
    }

    #[test]
    fn test_language_code_normalizes_region() {
        assert_eq!(LanguageCode::parse("en-US").unwrap().as_str(), "en");
        assert_eq!(LanguageCode::parse("ES").unwrap().as_str(), "es");
        assert!(LanguageCode::parse("").is_err());
        assert!(LanguageCode::parse("english").is_err());
        assert!(LanguageCode::parse("e1").is_err());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::High.is_urgent());
        assert!(!Severity::Medium.is_urgent());
    }

    #[test]
    fn test_unknown_role_deserializes_as_unknown() {
        let u: Utterance =
            serde_json::from_str(r#"{"seq":1,"role":"BOT","content":"x","created_at":0}"#)
                .unwrap();
        assert_eq!(u.role, Role::Unknown);
        assert_eq!(Role::from_code("narrator"), Role::Unknown);
    }

    #[test]
    fn test_hint_validation() {
        let valid = Hint::from_output(ClassifierOutput {
            category: Some("resp".into()),
            red_flags: vec!["  Blue Lips ".into(), "   ".into()],
            duration: Some("2 days".into()),
        });
        assert_eq!(valid.category(), Some(Category::Resp));
        assert_eq!(valid.red_flags(), ["blue lips".to_string()]);

        let invalid = Hint::from_output(ClassifierOutput {
            category: Some("cardiology".into()),
            red_flags: vec!["unconscious".into()],
            duration: None,
        });
        assert_eq!(invalid, Hint::Invalid);
        assert!(invalid.red_flags().is_empty());

        assert_eq!(Hint::from_output(ClassifierOutput::default()), Hint::Invalid);
    }

    #[test]
    fn test_coordinates_range() {
        assert!(Coordinates::new(43.2, 76.9).is_ok());
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, -181.0).is_err());
    }
}
