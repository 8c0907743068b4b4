//! Core domain layer. No external I/O dependencies.
//!
//! Entities, fixed tables, and the triage/ranking rules live here. Dependencies flow inward.

pub mod conversation;
pub mod detector;
pub mod disposition;
pub mod entities;
pub mod errors;
pub mod lexicon;
pub mod ranking;

pub use conversation::{advance, ensure_writable};
pub use detector::detect;
pub use disposition::{format_disposition, resolve};
pub use entities::{
    AdvanceOutcome, Category, ClassifierOutput, Consultation, ConsultationStatus, Coordinates,
    Disposition, Facility, Hint, LanguageCode, RankedFacility, RankingFilters, RankingRequest,
    Role, Severity, TurnOutcome, Utterance,
};
pub use errors::DomainError;
pub use lexicon::questions_for;
pub use ranking::{RankingWeights, haversine_km, rank};
