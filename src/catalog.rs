use crate::countries::normalize_countries;
use crate::database::MovieDb;
use crate::fields::*;
use crate::model::*;
use crate::search::TitleIndex;
use log::{info, warn};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("catalog file is not a JSON array of records: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("cannot read catalog file: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns one raw store entry into its canonical record.
pub fn ingest(id: u64, raw: &RawRecord) -> MovieRecord {
    let production_countries_raw = parse_list_field(raw.get("production_countries")).into_vec();
    let production_countries_canonical = normalize_countries(&production_countries_raw);
    MovieRecord {
        id,
        title: parse_text(raw.get("title")),
        release_date: parse_text(raw.get("release_date")),
        release_year: parse_year(raw.get("release_year")),
        popularity: parse_number(raw.get("popularity")),
        revenue: parse_number(raw.get("revenue")),
        overview: parse_text(raw.get("overview")),
        genres: parse_list_field(raw.get("genres_list")).into_vec(),
        production_countries_raw,
        production_countries_canonical,
        cast: parse_cast_field(raw.get("Cast_list")).into_vec(),
    }
}

/// The cleaned catalog, loaded once and shared read-only.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    records: Vec<MovieRecord>,
}

impl Catalog {
    pub fn new(records: Vec<MovieRecord>) -> Self {
        Catalog { records }
    }

    pub fn load(db: &sled::Db) -> Result<Self, CatalogError> {
        let records = db
            .raw_movies()?
            .iter()
            .map(|(id, raw)| ingest(*id, raw))
            .collect::<Vec<_>>();
        let without_country = records
            .iter()
            .filter(|r| r.production_countries_canonical.is_empty())
            .count();
        if !records.is_empty() && !db.catalog_imported()? {
            warn!("catalog import did not complete, serving a partial catalog");
        }
        info!(
            "loaded {} movies ({} without production country)",
            records.len(),
            without_country
        );
        Ok(Catalog::new(records))
    }

    pub fn all(&self) -> &[MovieRecord] {
        &self.records
    }

    /// Records usable by country-keyed views.
    pub fn with_countries(&self) -> impl Iterator<Item = &MovieRecord> {
        self.records
            .iter()
            .filter(|r| !r.production_countries_canonical.is_empty())
    }

    pub fn get(&self, id: u64) -> Option<&MovieRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn find_by_title(&self, title: &str) -> Option<&MovieRecord> {
        self.records.iter().find(|r| r.title == title)
    }

    pub fn titles(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.title.as_str()).collect()
    }

    pub fn genres(&self) -> Vec<String> {
        self.records
            .iter()
            .flat_map(|r| r.genres.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        let mut years = self.records.iter().filter_map(|r| r.release_year);
        let first = years.next()?;
        Some(years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
    }
}

/// Imports a JSON array of raw records and indexes titles, unless a previous
/// import already completed.
///
/// Returns the number of imported records.
pub fn import_file(db: &sled::Db, path: &Path) -> Result<usize, CatalogError> {
    if db.catalog_imported()? {
        info!("catalog already present, skipping import of {}", path.display());
        return Ok(0);
    }
    let data = std::fs::read(path)?;
    let records: Vec<RawRecord> = serde_json::from_slice(&data)?;
    import_records(db, &records)
}

/// Replaces any partially imported catalog with `records`. The completion
/// marker is written last, so an interrupted import is redone on the next run.
pub fn import_records(db: &sled::Db, records: &[RawRecord]) -> Result<usize, CatalogError> {
    let index = TitleIndex::open(db)?;
    let leftover = db.movie_count()?;
    if leftover > 0 {
        warn!("discarding {} movies from an incomplete import", leftover);
        db.clear_movies()?;
        index.clear()?;
    }
    let ids = db.add_raw_movies(records)?;
    for (id, raw) in ids.into_iter().zip(records) {
        let record = ingest(id, raw);
        if record.title.is_empty() {
            warn!("movie {} has no title", id);
        }
        index.insert(id, &format!("{} {}", record.title, record.overview))?;
    }
    db.mark_catalog_imported(records.len())?;
    db.flush()?;
    info!("imported {} movies", records.len());
    Ok(records.len())
}
