//! Data Models
//!
//! Configuration, request bodies and corridor data.

pub mod corridor;
pub mod request;
pub mod settings;

pub use corridor::{corridor_key, CorridorRecord};
pub use request::{
    AdvisoryRequest, AnalyzeRequest, DocumentUpload, ResearchRequest, TravelDates, TravelDetails,
};
pub use settings::AppConfig;
