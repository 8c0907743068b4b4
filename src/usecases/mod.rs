//! Application use cases. Orchestrate domain logic via ports.

pub mod consultation_service;
pub mod facility_service;

pub use consultation_service::ConsultationService;
pub use facility_service::FacilityService;
