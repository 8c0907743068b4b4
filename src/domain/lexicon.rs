//! Interview question tables: language -> category -> ordered prompts.
//!
//! Lookup never comes back empty: missing language falls back to `en`, a missing
//! category falls back to GENERAL in that language, then to `en` GENERAL.

use super::entities::{Category, LanguageCode};
use std::collections::HashMap;
use std::sync::LazyLock;

type QuestionTable = &'static [(Category, &'static [&'static str])];

const EN: QuestionTable = &[
    (
        Category::Chest,
        &[
            "Where exactly is the chest discomfort, and what does it feel like?",
            "Are you having any trouble breathing or shortness of breath?",
            "Does the pain spread to your arm, neck, jaw or back?",
            "Are you sweating, nauseous or light-headed?",
            "On a scale of 0 to 10, how strong is the pain right now?",
        ],
    ),
    (
        Category::Fever,
        &[
            "What is your temperature, if you have measured it?",
            "How many days have you had the fever?",
            "Do you have a stiff neck, rash or confusion?",
            "Are you able to drink fluids and keep them down?",
        ],
    ),
    (
        Category::Eye,
        &[
            "Which eye is affected, or is it both?",
            "Has your vision changed or become blurry?",
            "Did anything get into the eye, such as a chemical or object?",
            "Is there redness, discharge or pain when looking at light?",
        ],
    ),
    (
        Category::Gi,
        &[
            "Where in your abdomen is the pain located?",
            "Have you been vomiting or had diarrhea? How many times?",
            "Have you noticed blood in vomit or stool?",
            "When did you last eat and drink?",
        ],
    ),
    (
        Category::Head,
        &[
            "When did the headache start, and did it come on suddenly?",
            "Is this the worst headache you have ever had?",
            "Do you have vision changes, weakness or trouble speaking?",
            "Have you had a recent head injury?",
        ],
    ),
    (
        Category::Resp,
        &[
            "How long have you had the cough or breathing problem?",
            "Are you short of breath at rest or only when active?",
            "Are you coughing up blood or coloured mucus?",
            "Do you have asthma or another lung condition?",
        ],
    ),
    (
        Category::Skin,
        &[
            "Where on your body is the rash or skin problem?",
            "Is it spreading, blistering or painful?",
            "Do you have swelling of the lips, tongue or throat?",
            "Have you started any new medicine, food or product recently?",
        ],
    ),
    (
        Category::Neuro,
        &[
            "When did the symptoms start?",
            "Do you have weakness or numbness on one side of the body?",
            "Is your speech slurred or your face drooping?",
            "Have you fainted or had a seizure?",
        ],
    ),
    (
        Category::Uro,
        &[
            "Do you have pain or burning when urinating?",
            "Is there blood in your urine?",
            "Do you have pain in your back or side?",
            "Do you have a fever or chills?",
        ],
    ),
    (
        Category::Musculo,
        &[
            "Which joint or body part is hurt?",
            "How did the injury happen?",
            "Can you move it and put weight on it?",
            "Is there visible swelling, bruising or deformity?",
        ],
    ),
    (
        Category::General,
        &[
            "Please describe your main symptom.",
            "When did it start?",
            "How severe is it on a scale of 0 to 10?",
            "Do you have any chronic conditions or take regular medication?",
        ],
    ),
];

/// Partial table; categories absent here fall back to Spanish GENERAL.
const ES: QuestionTable = &[
    (
        Category::Chest,
        &[
            "¿Dónde está exactamente la molestia en el pecho y cómo se siente?",
            "¿Tiene dificultad para respirar o falta de aire?",
            "¿El dolor se extiende al brazo, cuello, mandíbula o espalda?",
            "¿Está sudando, con náuseas o mareado?",
            "En una escala del 0 al 10, ¿qué tan fuerte es el dolor ahora?",
        ],
    ),
    (
        Category::Fever,
        &[
            "¿Cuál es su temperatura, si la ha medido?",
            "¿Cuántos días lleva con fiebre?",
            "¿Tiene rigidez de cuello, sarpullido o confusión?",
            "¿Puede beber líquidos sin vomitarlos?",
        ],
    ),
    (
        Category::Resp,
        &[
            "¿Desde cuándo tiene tos o problemas para respirar?",
            "¿Le falta el aire en reposo o solo con actividad?",
            "¿Tose sangre o moco de color?",
            "¿Tiene asma u otra enfermedad pulmonar?",
        ],
    ),
    (
        Category::General,
        &[
            "Por favor, describa su síntoma principal.",
            "¿Cuándo comenzó?",
            "¿Qué tan intenso es en una escala del 0 al 10?",
            "¿Tiene enfermedades crónicas o toma medicación habitual?",
        ],
    ),
];

static LEXICON: LazyLock<HashMap<&'static str, HashMap<Category, &'static [&'static str]>>> =
    LazyLock::new(|| {
        [("en", EN), ("es", ES)]
            .into_iter()
            .map(|(lang, table)| (lang, table.iter().copied().collect()))
            .collect()
    });

/// Languages with at least a GENERAL question list.
pub fn supported_languages() -> Vec<&'static str> {
    let mut langs: Vec<&'static str> = LEXICON.keys().copied().collect();
    langs.sort_unstable();
    langs
}

/// Ordered prompts for `(category, language)` following the fallback chain.
pub fn questions_for(category: Category, language: &LanguageCode) -> &'static [&'static str] {
    let default_table = &LEXICON[LanguageCode::DEFAULT];
    let table = LEXICON.get(language.as_str()).unwrap_or(default_table);
    table
        .get(&category)
        .or_else(|| table.get(&Category::General))
        .or_else(|| default_table.get(&Category::General))
        .copied()
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(code: &str) -> LanguageCode {
        LanguageCode::parse(code).unwrap()
    }

    #[test]
    fn test_every_pair_has_questions() {
        for code in ["en", "es", "de", "zz"] {
            for category in Category::ALL {
                let qs = questions_for(category, &lang(code));
                assert!(qs.len() >= 2, "{} {} has {} questions", code, category, qs.len());
            }
        }
    }

    #[test]
    fn test_default_language_covers_all_categories() {
        let en = &LEXICON["en"];
        for category in Category::ALL {
            assert!(en.contains_key(&category), "en is missing {}", category);
        }
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        assert_eq!(
            questions_for(Category::Eye, &lang("de")),
            questions_for(Category::Eye, &lang("en"))
        );
    }

    #[test]
    fn test_missing_category_falls_back_to_language_general() {
        let es_general = questions_for(Category::General, &lang("es"));
        assert_eq!(questions_for(Category::Skin, &lang("es")), es_general);
        assert!(es_general[0].starts_with("Por favor"));
    }

    #[test]
    fn test_chest_interview_length() {
        assert_eq!(questions_for(Category::Chest, &lang("en")).len(), 5);
    }

    #[test]
    fn test_supported_languages() {
        assert_eq!(supported_languages(), vec!["en", "es"]);
    }
}
