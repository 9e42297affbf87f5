//! Grouping of filtered records into ranked `(key, value)` rows.
//!
//! Rankings order by value descending and break ties by key ascending.
//! An empty input yields no rows.

use crate::countries::atomic_countries;
use crate::model::MovieRecord;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Cast placeholder for unattributed entries.
pub const UNKNOWN_ACTOR: &str = "Miscellaneous";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: String,
    pub value: f64,
}

/// A supported `(dimension, metric)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation<'a> {
    /// Records per atomic production country.
    CountryCount,
    /// Summed revenue per genre, restricted to `genres`.
    GenreRevenue { genres: &'a [String] },
    /// Records per release year, ascending by year.
    ReleaseYearCount,
    /// Titles per cast member, without [`UNKNOWN_ACTOR`].
    ActorCount,
}

pub fn aggregate<'a, I>(records: I, aggregation: Aggregation<'_>) -> Vec<AggregateRow>
where
    I: IntoIterator<Item = &'a MovieRecord>,
{
    match aggregation {
        Aggregation::CountryCount => country_counts(records),
        Aggregation::GenreRevenue { genres } => genre_revenue(records, genres),
        Aggregation::ReleaseYearCount => release_year_counts(records),
        Aggregation::ActorCount => actor_counts(records),
    }
}

fn ranked(counts: HashMap<String, f64>) -> Vec<AggregateRow> {
    let mut rows = counts
        .into_iter()
        .map(|(key, value)| AggregateRow { key, value })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    rows
}

fn country_counts<'a, I>(records: I) -> Vec<AggregateRow>
where
    I: IntoIterator<Item = &'a MovieRecord>,
{
    let mut counts: HashMap<String, f64> = HashMap::new();
    for record in records {
        let countries = atomic_countries(&record.production_countries_canonical)
            .collect::<BTreeSet<_>>();
        for country in countries {
            *counts.entry(country.to_owned()).or_insert(0.0) += 1.0;
        }
    }
    ranked(counts)
}

fn genre_revenue<'a, I>(records: I, genres: &[String]) -> Vec<AggregateRow>
where
    I: IntoIterator<Item = &'a MovieRecord>,
{
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for record in records {
        for genre in &record.genres {
            if genres.contains(genre) {
                *sums.entry(genre.as_str()).or_insert(0.0) += record.revenue.unwrap_or(0.0);
            }
        }
    }
    sums.into_iter()
        .map(|(key, value)| AggregateRow {
            key: key.to_owned(),
            value,
        })
        .collect()
}

fn release_year_counts<'a, I>(records: I) -> Vec<AggregateRow>
where
    I: IntoIterator<Item = &'a MovieRecord>,
{
    let mut counts: BTreeMap<i32, f64> = BTreeMap::new();
    for year in records.into_iter().filter_map(|r| r.release_year) {
        *counts.entry(year).or_insert(0.0) += 1.0;
    }
    counts
        .into_iter()
        .map(|(year, value)| AggregateRow {
            key: year.to_string(),
            value,
        })
        .collect()
}

fn actor_counts<'a, I>(records: I) -> Vec<AggregateRow>
where
    I: IntoIterator<Item = &'a MovieRecord>,
{
    let mut counts: HashMap<String, f64> = HashMap::new();
    for actor in records.into_iter().flat_map(|r| r.cast.iter()) {
        if actor != UNKNOWN_ACTOR {
            *counts.entry(actor.clone()).or_insert(0.0) += 1.0;
        }
    }
    ranked(counts)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareRow {
    pub key: String,
    pub count: f64,
    pub percentage: f64,
}

/// Adds each row's percentage of the summed values.
pub fn with_percentages(rows: &[AggregateRow]) -> Vec<ShareRow> {
    let total: f64 = rows.iter().map(|r| r.value).sum();
    rows.iter()
        .map(|r| ShareRow {
            key: r.key.clone(),
            count: r.value,
            percentage: if total > 0.0 {
                100.0 * r.value / total
            } else {
                0.0
            },
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    Most,
    Least,
}

/// The first or last `n` rows of a ranking, keeping ranking order.
pub fn take_ranked(rows: &[AggregateRow], ranking: Ranking, n: usize) -> Vec<AggregateRow> {
    let slice = match ranking {
        Ranking::Most => &rows[..n.min(rows.len())],
        Ranking::Least => &rows[rows.len().saturating_sub(n)..],
    };
    slice.to_vec()
}

/// The `n` most popular records. Records without popularity rank last and
/// ties keep input order.
pub fn top_by_popularity<'a, I>(records: I, n: usize) -> Vec<&'a MovieRecord>
where
    I: IntoIterator<Item = &'a MovieRecord>,
{
    let mut records = records.into_iter().collect::<Vec<_>>();
    records.sort_by(|a, b| match (a.popularity, b.popularity) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    records.truncate(n);
    records
}
