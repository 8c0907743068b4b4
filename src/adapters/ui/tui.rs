//! Implements InputPort. Inquire-based interactive prompts.
//!
//! Main menu: start a triage interview, search facilities, browse past consultations.
//! Prompts block the current thread; service calls run behind a spinner.

use crate::domain::{
    Consultation, ConsultationStatus, Coordinates, DomainError, RankedFacility, RankingFilters,
    RankingRequest, Role, TurnOutcome,
};
use crate::ports::InputPort;
use crate::usecases::{ConsultationService, FacilityService};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::error::InquireError;
use inquire::ui::RenderConfig;
use inquire::{Confirm, CustomType, Select, Text};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const MENU_START: &str = "Start a consultation";
const MENU_FACILITIES: &str = "Find facilities";
const MENU_HISTORY: &str = "My consultations";
const MENU_EXIT: &str = "Exit";

const ACTION_VIEW: &str = "View transcript";
const ACTION_FACILITIES: &str = "Find facilities for this consultation";
const ACTION_DELETE: &str = "Delete";
const ACTION_BACK: &str = "Back";

/// Applies the colored inquire theme to every later prompt.
pub fn apply_theme() {
    inquire::set_global_render_config(RenderConfig::default_colored());
}

/// Esc / Ctrl-C on a prompt means "go back", not a failure.
fn prompt_result<T>(res: Result<T, InquireError>) -> Result<Option<T>, DomainError> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(DomainError::Terminal(e.to_string())),
    }
}

/// Runs `fut` behind a spinner with `message`.
async fn with_spinner<T, F>(message: &str, fut: F) -> T
where
    F: Future<Output = T>,
{
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    let out = fut.await;
    pb.finish_and_clear();
    out
}

/// Parses "lat, lng" in decimal degrees.
pub fn parse_origin(raw: &str) -> Result<Coordinates, DomainError> {
    let mut parts = raw.split(',').map(str::trim);
    let (Some(lat), Some(lng), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(DomainError::Validation(format!(
            "expected \"lat, lng\", got {:?}",
            raw
        )));
    };
    let parse = |s: &str| {
        s.parse::<f64>()
            .map_err(|_| DomainError::Validation(format!("not a number: {:?}", s)))
    };
    Coordinates::new(parse(lat)?, parse(lng)?)
}

fn format_timestamp(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// One menu line per consultation.
fn consultation_label(c: &Consultation) -> String {
    format!(
        "{}  {:<9} {:<8} {:<8} {}",
        format_timestamp(c.created_at),
        c.status.code(),
        c.category.map(|cat| cat.code()).unwrap_or("-"),
        c.severity().map(|s| s.code()).unwrap_or("-"),
        c.id
    )
}

/// Printable result list, best first.
pub fn format_ranked(ranked: &[RankedFacility]) -> String {
    if ranked.is_empty() {
        return "No facilities match these filters.".to_string();
    }
    let mut out = String::new();
    for (i, r) in ranked.iter().enumerate() {
        let f = &r.facility;
        let distance = r
            .distance_km
            .map(|km| format!("{:.1} km", km))
            .unwrap_or_else(|| "distance n/a".to_string());
        let rating = f
            .rating
            .map(|v| format!("{:.1}/5", v))
            .unwrap_or_else(|| "unrated".to_string());
        let mut tags = Vec::new();
        if f.emergency_ready {
            tags.push("ER");
        }
        if f.is_24h {
            tags.push("24h");
        }
        tags.push(if f.is_public { "public" } else { "private" });
        out.push_str(&format!(
            "{:>2}. {} ({}, {}, {}) score {:.2}\n",
            i + 1,
            f.name,
            distance,
            rating,
            tags.join("/"),
            r.score
        ));
        if !f.specialties.is_empty() {
            out.push_str(&format!("    {}\n", f.specialties.join(", ")));
        }
    }
    out
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    consultations: Arc<ConsultationService>,
    facilities: Arc<FacilityService>,
    owner_id: String,
    default_language: String,
}

impl TuiInputPort {
    pub fn new(
        consultations: Arc<ConsultationService>,
        facilities: Arc<FacilityService>,
        owner_id: String,
        default_language: String,
    ) -> Self {
        Self {
            consultations,
            facilities,
            owner_id,
            default_language,
        }
    }

    fn print_prompt(outcome: &TurnOutcome) {
        let header = match outcome.status {
            ConsultationStatus::Completed => "Assessment".bold().green(),
            ConsultationStatus::Active => "Question".bold().cyan(),
        };
        println!("\n{}\n{}\n", header, outcome.prompt);
    }

    async fn run_interview(&self) -> Result<(), DomainError> {
        let Some(language) = prompt_result(
            Text::new("Language (e.g. en, es):")
                .with_default(&self.default_language)
                .prompt(),
        )?
        else {
            return Ok(());
        };
        let Some(initial) = prompt_result(
            Text::new("Describe what is wrong (optional):").prompt_skippable(),
        )?
        else {
            return Ok(());
        };

        let started = with_spinner(
            "Opening consultation...",
            self.consultations
                .start_consultation(&self.owner_id, &language, initial.as_deref()),
        )
        .await;
        let mut outcome = match started {
            Ok(o) => o,
            Err(e @ DomainError::Validation(_)) => {
                println!("{}", e.to_string().red());
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        loop {
            Self::print_prompt(&outcome);
            if outcome.status == ConsultationStatus::Completed {
                break;
            }
            let Some(answer) = prompt_result(Text::new(">").prompt())? else {
                println!("Consultation left open.");
                return Ok(());
            };
            let next = with_spinner(
                "Thinking...",
                self.consultations.submit_utterance(
                    &outcome.consultation_id,
                    &self.owner_id,
                    &answer,
                    &language,
                ),
            )
            .await;
            match next {
                Ok(o) => outcome = o,
                Err(e @ DomainError::Validation(_)) => println!("{}", e.to_string().red()),
                Err(e) => return Err(e),
            }
        }

        let search = prompt_result(
            Confirm::new("Find nearby facilities for this result?")
                .with_default(true)
                .prompt(),
        )?;
        if search == Some(true) {
            let (consultation, _) = self
                .consultations
                .get_consultation(&outcome.consultation_id, &self.owner_id)
                .await?;
            self.run_facility_search(Some(&consultation)).await?;
        }
        Ok(())
    }

    /// Collects origin and filters. `None` when the user backs out.
    fn ask_request(&self) -> Result<Option<RankingRequest>, DomainError> {
        let origin = loop {
            let Some(raw) = prompt_result(
                Text::new("Your location as \"lat, lng\" (optional):").prompt_skippable(),
            )?
            else {
                return Ok(None);
            };
            match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                None => break None,
                Some(s) => match parse_origin(s) {
                    Ok(c) => break Some(c),
                    Err(e) => println!("{}", e.to_string().red()),
                },
            }
        };
        let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let Some(specialty) =
            prompt_result(Text::new("Required specialty (optional):").prompt_skippable())?
        else {
            return Ok(None);
        };
        let Some(amenity) =
            prompt_result(Text::new("Required amenity (optional):").prompt_skippable())?
        else {
            return Ok(None);
        };
        let Some(ownership) = prompt_result(
            Select::new("Ownership:", vec!["Any", "Public only", "Private only"]).prompt(),
        )?
        else {
            return Ok(None);
        };
        let Some(min_rating) = prompt_result(
            CustomType::<f64>::new("Minimum rating 0-5 (optional):")
                .with_error_message("Enter a number such as 3.5")
                .prompt_skippable(),
        )?
        else {
            return Ok(None);
        };

        Ok(Some(RankingRequest {
            origin,
            category: None,
            severity: None,
            filters: RankingFilters {
                specialty: non_blank(specialty),
                amenity: non_blank(amenity),
                is_public: match ownership {
                    "Public only" => Some(true),
                    "Private only" => Some(false),
                    _ => None,
                },
                min_rating,
            },
        }))
    }

    async fn run_facility_search(
        &self,
        consultation: Option<&Consultation>,
    ) -> Result<(), DomainError> {
        let Some(request) = self.ask_request()? else {
            return Ok(());
        };
        let ranked = with_spinner("Ranking facilities...", async {
            match consultation {
                Some(c) => self.facilities.rank_for_consultation(c, request).await,
                None => self.facilities.rank_facilities(&request).await,
            }
        })
        .await;
        match ranked {
            Ok(list) => println!("\n{}", format_ranked(&list)),
            Err(e @ DomainError::Validation(_)) => println!("{}", e.to_string().red()),
            Err(e) => {
                warn!(error = %e, "facility search failed");
                println!("{}", format!("Facility search unavailable: {}", e).red());
            }
        }
        Ok(())
    }

    async fn run_history(&self) -> Result<(), DomainError> {
        let list = self.consultations.list_consultations(&self.owner_id).await?;
        if list.is_empty() {
            println!("No consultations yet.");
            return Ok(());
        }
        let labels: Vec<String> = list.iter().map(consultation_label).collect();
        let Some(picked) = prompt_result(Select::new("Consultation:", labels.clone()).prompt())?
        else {
            return Ok(());
        };
        let Some(consultation) = labels
            .iter()
            .position(|l| *l == picked)
            .and_then(|i| list.get(i))
        else {
            return Ok(());
        };

        let actions = vec![ACTION_VIEW, ACTION_FACILITIES, ACTION_DELETE, ACTION_BACK];
        let Some(action) = prompt_result(Select::new("Action:", actions).prompt())? else {
            return Ok(());
        };
        match action {
            ACTION_VIEW => {
                let (_, transcript) = self
                    .consultations
                    .get_consultation(&consultation.id, &self.owner_id)
                    .await?;
                for u in transcript {
                    let who = match u.role {
                        Role::Requester => "you".bold().yellow(),
                        Role::System => "careline".bold().cyan(),
                        Role::Unknown => "?".dim(),
                    };
                    println!("{:>3} {}: {}", u.seq, who, u.content);
                }
            }
            ACTION_FACILITIES => self.run_facility_search(Some(consultation)).await?,
            ACTION_DELETE => {
                let confirmed = prompt_result(
                    Confirm::new("Delete this consultation permanently?")
                        .with_default(false)
                        .prompt(),
                )?;
                if confirmed == Some(true) {
                    self.consultations
                        .delete_consultation(&consultation.id, &self.owner_id)
                        .await?;
                    println!("Deleted.");
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        println!(
            "{}",
            "First-aid guidance only. In an emergency call your local emergency number.".yellow()
        );
        loop {
            let options = vec![MENU_START, MENU_FACILITIES, MENU_HISTORY, MENU_EXIT];
            let choice = prompt_result(Select::new("What would you like to do?", options).prompt())?;
            let result = match choice {
                Some(MENU_START) => self.run_interview().await,
                Some(MENU_FACILITIES) => self.run_facility_search(None).await,
                Some(MENU_HISTORY) => self.run_history().await,
                _ => return Ok(()),
            };
            // Store and catalog failures end the action, not the session.
            if let Err(e) = result {
                warn!(error = %e, "menu action failed");
                println!("{}", format!("Error: {}", e).red());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Facility;

    #[test]
    fn test_prompt_result_maps_cancel_and_terminal_errors() {
        assert_eq!(prompt_result(Ok(3)).unwrap(), Some(3));
        assert_eq!(
            prompt_result::<i32>(Err(InquireError::OperationCanceled)).unwrap(),
            None
        );
        assert_eq!(
            prompt_result::<i32>(Err(InquireError::OperationInterrupted)).unwrap(),
            None
        );
        assert!(matches!(
            prompt_result::<i32>(Err(InquireError::NotTTY)),
            Err(DomainError::Terminal(_))
        ));
    }

    #[test]
    fn test_parse_origin() {
        let c = parse_origin(" 43.24 , 76.89 ").unwrap();
        assert_eq!((c.lat, c.lng), (43.24, 76.89));
        assert!(matches!(parse_origin("43.24"), Err(DomainError::Validation(_))));
        assert!(matches!(parse_origin("1,2,3"), Err(DomainError::Validation(_))));
        assert!(matches!(parse_origin("abc, 1"), Err(DomainError::Validation(_))));
        assert!(matches!(parse_origin("91, 0"), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_format_ranked() {
        assert!(format_ranked(&[]).contains("No facilities"));
        let ranked = vec![RankedFacility {
            facility: Facility {
                id: "h1".into(),
                name: "City Hospital".into(),
                location: Coordinates { lat: 0.0, lng: 0.0 },
                is_public: true,
                is_24h: true,
                emergency_ready: true,
                rating: Some(4.5),
                specialties: vec!["Cardiology".into()],
                amenities: vec![],
            },
            distance_km: Some(1.234),
            score: 7.25,
        }];
        let text = format_ranked(&ranked);
        assert!(text.starts_with(" 1. City Hospital (1.2 km, 4.5/5, ER/24h/public) score 7.25"));
        assert!(text.contains("Cardiology"));
    }
}
