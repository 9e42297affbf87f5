use crate::countries::atomic_countries;
use crate::model::MovieRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearFilter {
    Exact(i32),
    /// Inclusive on both ends.
    Range(i32, i32),
}

impl YearFilter {
    fn matches(self, year: Option<i32>) -> bool {
        match (self, year) {
            (_, None) => false,
            (YearFilter::Exact(wanted), Some(year)) => year == wanted,
            (YearFilter::Range(from, to), Some(year)) => from <= year && year <= to,
        }
    }
}

/// Conjunction of the active filters. `None` fields match every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub year: Option<YearFilter>,
    /// A record matches if it has at least one of these genres.
    pub genres: Option<Vec<String>>,
    /// Case-insensitive exact match against the cast.
    pub actor: Option<String>,
    /// Exact match against the atomic production countries.
    pub country: Option<String>,
}

impl RecordFilter {
    pub fn year(mut self, year: YearFilter) -> Self {
        self.year = Some(year);
        self
    }

    pub fn genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = Some(genres.into_iter().map(Into::into).collect());
        self
    }

    pub fn actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_owned());
        self
    }

    pub fn country(mut self, country: &str) -> Self {
        self.country = Some(country.to_owned());
        self
    }

    pub fn matches(&self, record: &MovieRecord) -> bool {
        if let Some(year) = self.year {
            if !year.matches(record.release_year) {
                return false;
            }
        }
        if let Some(genres) = &self.genres {
            if !genres.iter().any(|g| record.has_genre(g)) {
                return false;
            }
        }
        if let Some(actor) = &self.actor {
            let actor = actor.to_lowercase();
            if !record.cast.iter().any(|a| a.to_lowercase() == actor) {
                return false;
            }
        }
        if let Some(country) = &self.country {
            if !atomic_countries(&record.production_countries_canonical).any(|c| c == country) {
                return false;
            }
        }
        true
    }
}

/// Returns the matching records in input order.
pub fn filter_records<'a, I>(records: I, filter: &RecordFilter) -> Vec<&'a MovieRecord>
where
    I: IntoIterator<Item = &'a MovieRecord>,
{
    records.into_iter().filter(|r| filter.matches(r)).collect()
}
