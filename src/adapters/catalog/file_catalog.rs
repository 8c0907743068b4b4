//! Implements FacilityCatalog from a local JSON or CSV file.
//!
//! JSON: an array of facility objects. CSV: one row per facility with
//! `id,name,lat,lng,is_public,is_24h,emergency_ready,rating,specialties,amenities`,
//! where the tag columns are pipe-separated (`Cardiology|Emergency Medicine`).
//! The snapshot is loaded once and replaced wholesale by `reload`.

use crate::domain::{Coordinates, DomainError, Facility};
use crate::ports::FacilityCatalog;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

const TAG_SEPARATOR: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CatalogFormat {
    Json,
    Csv,
}

impl CatalogFormat {
    fn from_path(path: &Path) -> Result<Self, DomainError> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            _ => Err(DomainError::Catalog(format!(
                "unsupported catalog format: {} (expected .json or .csv)",
                path.display()
            ))),
        }
    }
}

/// One CSV row before validation.
#[derive(Debug, Deserialize)]
struct CsvRow {
    id: String,
    #[serde(default)]
    name: String,
    lat: f64,
    lng: f64,
    #[serde(default)]
    is_public: String,
    #[serde(default)]
    is_24h: String,
    #[serde(default)]
    emergency_ready: String,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    specialties: String,
    #[serde(default)]
    amenities: String,
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(TAG_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

impl CsvRow {
    fn into_facility(self) -> Result<Facility, DomainError> {
        Ok(Facility {
            location: Coordinates::new(self.lat, self.lng)?,
            is_public: parse_flag(&self.is_public),
            is_24h: parse_flag(&self.is_24h),
            emergency_ready: parse_flag(&self.emergency_ready),
            rating: self.rating,
            specialties: split_tags(&self.specialties),
            amenities: split_tags(&self.amenities),
            id: self.id,
            name: self.name,
        })
    }
}

fn parse_csv(content: &str) -> Result<Vec<Facility>, DomainError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut out = Vec::new();
    for (line, record) in reader.deserialize::<CsvRow>().enumerate() {
        let row = record.map_err(|e| DomainError::Catalog(e.to_string()))?;
        match row.into_facility() {
            Ok(facility) => out.push(facility),
            Err(e) => warn!(row = line + 1, error = %e, "skipping facility row"),
        }
    }
    Ok(out)
}

fn parse_json(content: &str) -> Result<Vec<Facility>, DomainError> {
    let facilities: Vec<Facility> =
        serde_json::from_str(content).map_err(|e| DomainError::Catalog(e.to_string()))?;
    Ok(facilities
        .into_iter()
        .filter(|f| match Coordinates::new(f.location.lat, f.location.lng) {
            Ok(_) => true,
            Err(e) => {
                warn!(facility_id = %f.id, error = %e, "skipping facility");
                false
            }
        })
        .collect())
}

/// Keeps rows with a non-blank id and an in-range rating.
fn retain_valid(facilities: Vec<Facility>) -> Vec<Facility> {
    facilities
        .into_iter()
        .filter(|f| {
            let ok = !f.id.trim().is_empty()
                && f.rating.is_none_or(|r| (0.0..=5.0).contains(&r));
            if !ok {
                warn!(facility_id = %f.id, rating = ?f.rating, "skipping facility");
            }
            ok
        })
        .collect()
}

/// File-backed facility catalog.
pub struct FileCatalog {
    path: PathBuf,
    format: CatalogFormat,
    snapshot: RwLock<Arc<Vec<Facility>>>,
}

impl FileCatalog {
    /// Load the catalog file. The format follows the extension.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref().to_path_buf();
        let format = CatalogFormat::from_path(&path)?;
        let facilities = Self::read(&path, format).await?;
        Ok(Self {
            path,
            format,
            snapshot: RwLock::new(Arc::new(facilities)),
        })
    }

    /// Empty catalog, used when no facility file is configured.
    pub fn empty() -> Self {
        Self {
            path: PathBuf::new(),
            format: CatalogFormat::Json,
            snapshot: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Re-read the file and swap the snapshot. On error the previous snapshot stays.
    pub async fn reload(&self) -> Result<usize, DomainError> {
        let facilities = Self::read(&self.path, self.format).await?;
        let count = facilities.len();
        *self.snapshot.write().await = Arc::new(facilities);
        Ok(count)
    }

    async fn read(path: &Path, format: CatalogFormat) -> Result<Vec<Facility>, DomainError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DomainError::Catalog(format!("{}: {}", path.display(), e)))?;
        let parsed = match format {
            CatalogFormat::Json => parse_json(&content)?,
            CatalogFormat::Csv => parse_csv(&content)?,
        };
        let facilities = retain_valid(parsed);
        info!(
            path = %path.display(),
            count = facilities.len(),
            "facility catalog loaded"
        );
        Ok(facilities)
    }
}

#[async_trait::async_trait]
impl FacilityCatalog for FileCatalog {
    async fn facilities(&self) -> Result<Vec<Facility>, DomainError> {
        let snapshot = Arc::clone(&*self.snapshot.read().await);
        Ok(snapshot.as_ref().clone())
    }
}
