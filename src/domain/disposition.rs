//! Severity verdict and care guidance produced when an interview completes.
//!
//! Severity precedence is fixed: CRITICAL checks run first, then HIGH, then LOW,
//! MEDIUM otherwise. Guidance is a per-category table lookup with a GENERAL row.
//!
//! CRITICAL and HIGH markers are ignored when a negation ("no", "not", "without", ...)
//! precedes them within the same clause, so "no, no trouble breathing" stays non-critical.
//! Red flags from a valid classifier hint are never negation-checked.

use super::detector::{contains_term, requester_text, term_positions};
use super::entities::{Category, Disposition, Hint, Severity, Utterance};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Any hit forces CRITICAL regardless of other markers.
const CRITICAL_KEYWORDS: &[&str] = &[
    "unconscious",
    "unresponsive",
    "passed out",
    "not breathing",
    "can't breathe",
    "cannot breathe",
    "trouble breathing",
    "difficulty breathing",
    "struggling to breathe",
    "blue lips",
    "left arm",
    "jaw pain",
    "crushing",
    "severe bleeding",
    "bleeding heavily",
    "won't stop bleeding",
    "coughing up blood",
    "vomiting blood",
    "seizure",
    "slurred speech",
    "face drooping",
    "one side of my body",
    "worst headache",
    "stiff neck",
    "sudden vision loss",
    "throat closing",
    "swollen tongue",
    "overdose",
    "suicid",
    "no puedo respirar",
    "inconsciente",
];

const HIGH_MARKERS: &[&str] = &[
    "severe",
    "unbearable",
    "excruciating",
    "intense",
    "getting worse",
    "worsening",
    "very bad",
    "high fever",
    "can't walk",
    "cannot walk",
    "muy fuerte",
    "insoportable",
];

const LOW_MARKERS: &[&str] = &[
    "mild",
    "slight",
    "a little",
    "minor",
    "not bad",
    "manageable",
    "dolor leve",
    "es leve",
];

/// Words that cancel a following CRITICAL/HIGH marker in the same clause.
const NEGATIONS: &[&str] = &["no", "not", "without", "never", "denies", "sin", "nunca"];

/// How many words before a marker are checked for a negation.
const NEGATION_WINDOW: usize = 3;

/// Pain at or above this on a 0–10 scale is a HIGH marker.
const PAIN_HIGH_THRESHOLD: u32 = 8;
/// Pain at or below this on a 0–10 scale is a LOW marker.
const PAIN_LOW_THRESHOLD: u32 = 3;

/// Matches "9/10", "9 / 10", "9 out of 10", "9 de 10".
static PAIN_SCALE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(10|[0-9])\s*(?:/|out of|de)\s*10\b").expect("pain scale pattern is valid")
});

/// Fixed guidance for one category.
struct CareGuide {
    first_aid: &'static [&'static str],
    warnings: &'static [&'static str],
    specialties: &'static [&'static str],
}

const CARE_GUIDES: &[(Category, CareGuide)] = &[
    (
        Category::Chest,
        CareGuide {
            first_aid: &[
                "Stop all activity and sit or lie down in a comfortable position.",
                "Loosen tight clothing around the neck and chest.",
                "If you are not allergic and a clinician has not told you otherwise, chew one adult aspirin.",
                "Call emergency services if the pain lasts more than a few minutes.",
            ],
            warnings: &[
                "Pain spreading to the arm, neck, jaw or back",
                "Shortness of breath, cold sweat or fainting",
                "Pain that does not ease with rest",
            ],
            specialties: &["Cardiology", "Emergency Medicine"],
        },
    ),
    (
        Category::Fever,
        CareGuide {
            first_aid: &[
                "Rest and drink plenty of fluids.",
                "Use paracetamol or ibuprofen as directed on the package to lower the temperature.",
                "Wear light clothing and keep the room cool.",
            ],
            warnings: &[
                "Temperature above 39.5 °C or lasting more than 3 days",
                "Stiff neck, confusion or a rash that does not fade under pressure",
                "Unable to keep fluids down",
            ],
            specialties: &["Internal Medicine", "Infectious Disease"],
        },
    ),
    (
        Category::Eye,
        CareGuide {
            first_aid: &[
                "Do not rub the eye.",
                "For chemical exposure, rinse the eye with clean running water for at least 15 minutes.",
                "Remove contact lenses if you wear them.",
            ],
            warnings: &[
                "Sudden loss or change of vision",
                "Object stuck in the eye",
                "Severe eye pain or sensitivity to light",
            ],
            specialties: &["Ophthalmology"],
        },
    ),
    (
        Category::Gi,
        CareGuide {
            first_aid: &[
                "Take small sips of water or oral rehydration solution.",
                "Avoid solid food until vomiting stops, then start with bland food.",
                "Avoid alcohol, coffee and fatty meals.",
            ],
            warnings: &[
                "Blood in vomit or stool",
                "Severe or constant abdominal pain",
                "Signs of dehydration such as no urine for 8 hours",
            ],
            specialties: &["Gastroenterology"],
        },
    ),
    (
        Category::Head,
        CareGuide {
            first_aid: &[
                "Rest in a quiet, dark room.",
                "Drink water and take a standard pain reliever as directed.",
                "Apply a cool compress to the forehead.",
            ],
            warnings: &[
                "Sudden, worst-ever headache",
                "Headache after a head injury",
                "Weakness, confusion or trouble speaking",
            ],
            specialties: &["Neurology"],
        },
    ),
    (
        Category::Resp,
        CareGuide {
            first_aid: &[
                "Sit upright and try to breathe slowly.",
                "Use your prescribed inhaler if you have one.",
                "Move away from smoke, dust or other irritants.",
            ],
            warnings: &[
                "Breathlessness at rest or when speaking",
                "Blue or grey lips or fingertips",
                "Coughing up blood",
            ],
            specialties: &["Pulmonology"],
        },
    ),
    (
        Category::Skin,
        CareGuide {
            first_aid: &[
                "Wash the area gently with mild soap and water.",
                "Apply a cool compress and avoid scratching.",
                "Stop using any new product that may have caused the reaction.",
            ],
            warnings: &[
                "Swelling of the lips, tongue or throat",
                "Rapidly spreading rash with fever",
                "Blistering over a large area",
            ],
            specialties: &["Dermatology"],
        },
    ),
    (
        Category::Neuro,
        CareGuide {
            first_aid: &[
                "Note the time the symptoms started.",
                "Lie the person down on their side if they are drowsy or have had a seizure.",
                "Do not give food or drink.",
            ],
            warnings: &[
                "Face drooping, arm weakness or slurred speech",
                "Seizure lasting more than 5 minutes",
                "Loss of consciousness",
            ],
            specialties: &["Neurology", "Emergency Medicine"],
        },
    ),
    (
        Category::Uro,
        CareGuide {
            first_aid: &[
                "Drink plenty of water.",
                "Avoid holding urine for long periods.",
                "Use a warm compress on the lower abdomen for discomfort.",
            ],
            warnings: &[
                "Fever with back or side pain",
                "Visible blood in the urine",
                "Unable to pass urine",
            ],
            specialties: &["Urology", "Nephrology"],
        },
    ),
    (
        Category::Musculo,
        CareGuide {
            first_aid: &[
                "Rest the injured area.",
                "Apply ice wrapped in cloth for 15–20 minutes every few hours.",
                "Compress with an elastic bandage and keep the limb elevated.",
            ],
            warnings: &[
                "Visible deformity or bone through the skin",
                "Unable to bear weight or move the joint",
                "Numbness or cold skin below the injury",
            ],
            specialties: &["Orthopedics", "Traumatology"],
        },
    ),
    (
        Category::General,
        CareGuide {
            first_aid: &[
                "Rest and stay hydrated.",
                "Monitor your symptoms and write down any changes.",
                "Seek medical advice if symptoms persist or worsen.",
            ],
            warnings: &[
                "Difficulty breathing",
                "Confusion or fainting",
                "Symptoms getting rapidly worse",
            ],
            specialties: &["General Practice"],
        },
    ),
];

static GUIDES: LazyLock<HashMap<Category, &'static CareGuide>> =
    LazyLock::new(|| CARE_GUIDES.iter().map(|(c, g)| (*c, g)).collect());

fn guide_for(category: Category) -> &'static CareGuide {
    GUIDES
        .get(&category)
        .or_else(|| GUIDES.get(&Category::General))
        .copied()
        .unwrap_or(&CARE_GUIDES[CARE_GUIDES.len() - 1].1)
}

/// Specialty names recommended for a category. Also used by the ranking engine.
pub fn specialties_for(category: Category) -> &'static [&'static str] {
    guide_for(category).specialties
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| contains_term(text, m))
}

/// A negation word among the last few words of the clause ending at `at`.
fn is_negated(text: &str, at: usize) -> bool {
    let clause = &text[..at];
    let clause = clause
        .rfind(['.', ',', ';', '!', '?', '\n'])
        .map_or(clause, |i| &clause[i + 1..]);
    clause
        .split_whitespace()
        .rev()
        .take(NEGATION_WINDOW)
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .any(|w| NEGATIONS.contains(&w))
}

/// At least one marker hit that is not negated.
fn contains_affirmed(text: &str, markers: &[&str]) -> bool {
    markers
        .iter()
        .any(|m| term_positions(text, m).any(|at| !is_negated(text, at)))
}

fn pain_scores(text: &str) -> impl Iterator<Item = u32> + '_ {
    PAIN_SCALE
        .captures_iter(text)
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
}

/// Severity from normalized requester text plus hint red flags.
pub fn severity_for(text: &str, hint: &Hint) -> Severity {
    if !hint.red_flags().is_empty() || contains_affirmed(text, CRITICAL_KEYWORDS) {
        return Severity::Critical;
    }
    if contains_affirmed(text, HIGH_MARKERS) || pain_scores(text).any(|p| p >= PAIN_HIGH_THRESHOLD) {
        return Severity::High;
    }
    if contains_any(text, LOW_MARKERS) || pain_scores(text).any(|p| p <= PAIN_LOW_THRESHOLD) {
        return Severity::Low;
    }
    Severity::Medium
}

/// Build the completion bundle. Pure and total over every category.
pub fn resolve(history: &[Utterance], category: Category, hint: &Hint) -> Disposition {
    let severity = severity_for(&requester_text(history), hint);
    let guide = guide_for(category);
    Disposition {
        severity,
        first_aid: guide.first_aid.iter().map(|s| s.to_string()).collect(),
        warnings: guide.warnings.iter().map(|s| s.to_string()).collect(),
        specialty: guide.specialties.join(", "),
        summary: format!(
            "{} triage completed with severity {}.",
            category, severity
        ),
    }
}

/// Human-readable final message shown to the requester.
pub fn format_disposition(disposition: &Disposition) -> String {
    let mut out = String::new();
    out.push_str(&disposition.summary);
    out.push('\n');
    if disposition.severity == Severity::Critical {
        out.push_str("Call your local emergency number now.\n");
    }
    out.push_str(&format!(
        "Recommended specialty: {}\n",
        disposition.specialty
    ));
    out.push_str("\nFirst aid:\n");
    for (i, step) in disposition.first_aid.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, step));
    }
    out.push_str("\nSeek urgent care if you notice:\n");
    for warning in &disposition.warnings {
        out.push_str(&format!("- {}\n", warning));
    }
    out
}
