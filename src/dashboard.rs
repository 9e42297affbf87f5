//! View models for the dashboard pages, assembled from the catalog and the
//! current selections. Nothing here touches HTTP.

use crate::aggregate::*;
use crate::catalog::Catalog;
use crate::chart::*;
use crate::countries::atomic_countries;
use crate::filter::{filter_records, RecordFilter, YearFilter};
use crate::model::{MovieRecord, UserAccount};
use crate::search::TitleIndex;
use crate::session::Selections;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

const TOP_MOVIES: usize = 5;
const MOVIES_PER_COUNTRY: usize = 5;
const RANKED_ACTORS: usize = 10;
const SEARCH_RESULTS: usize = 10;
const DEFAULT_REVENUE_GENRE: &str = "Action";

/// One movie as listed under a country or an actor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieLine {
    pub title: String,
    pub year: String,
    pub popularity: String,
}

impl From<&MovieRecord> for MovieLine {
    fn from(record: &MovieRecord) -> Self {
        MovieLine {
            title: record.title.clone(),
            year: record
                .release_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "unknown".to_owned()),
            popularity: record
                .popularity
                .map(|p| format!("{:.2}", p))
                .unwrap_or_else(|| "n/a".to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieDetails {
    pub title: String,
    pub release_date: String,
    pub popularity: String,
    pub genres: String,
    pub overview: String,
}

impl From<&MovieRecord> for MovieDetails {
    fn from(record: &MovieRecord) -> Self {
        MovieDetails {
            title: record.title.clone(),
            release_date: record.release_date.clone(),
            popularity: record
                .popularity
                .map(|p| p.to_string())
                .unwrap_or_else(|| "n/a".to_owned()),
            genres: record.genres.join(", "),
            overview: record.overview.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoviesPage {
    pub year_bounds: Option<(i32, i32)>,
    pub selected_year: Option<i32>,
    pub genres: Vec<String>,
    pub selected_genre: Option<String>,
    pub popular: Chart,
    pub titles: Vec<String>,
    pub details: Option<MovieDetails>,
    pub query: Option<String>,
    pub search_results: Vec<String>,
    pub to_watch: Vec<String>,
    pub favorites: Vec<String>,
}

pub fn movies_page(
    catalog: &Catalog,
    selections: &Selections,
    user: &UserAccount,
    search_results: Vec<String>,
) -> MoviesPage {
    let year_bounds = catalog.year_bounds();
    let selected_year = selections.year.or_else(|| year_bounds.map(|(_, max)| max));

    let mut filter = RecordFilter::default();
    if let Some(year) = selected_year {
        filter = filter.year(YearFilter::Exact(year));
    }
    if let Some(genre) = &selections.genre {
        filter = filter.genres(vec![genre.clone()]);
    }
    let filtered = filter_records(catalog.all(), &filter);
    let popular = top_by_popularity(filtered, TOP_MOVIES);
    let popular = Chart::new(
        ChartKind::HorizontalBar,
        "Top 5 Movies by Popularity",
        series(
            popular
                .iter()
                .map(|r| (r.title.as_str(), r.popularity.unwrap_or(0.0))),
            "Title",
            "Popularity",
        ),
    );

    let details = match &selections.movie {
        Some(title) => catalog.find_by_title(title),
        None => catalog.all().first(),
    };

    MoviesPage {
        year_bounds,
        selected_year,
        genres: catalog.genres(),
        selected_genre: selections.genre.clone(),
        popular,
        titles: catalog.titles().into_iter().map(str::to_owned).collect(),
        details: details.map(MovieDetails::from),
        query: selections.query.clone(),
        search_results,
        to_watch: user.to_watch.clone(),
        favorites: user.favorites.clone(),
    }
}

/// Titles best matching `query`, skipping ids no longer in the catalog.
pub fn search_titles(
    index: &TitleIndex,
    catalog: &Catalog,
    query: &str,
) -> sled::Result<Vec<String>> {
    Ok(index
        .query(query)?
        .into_iter()
        .filter_map(|(id, _score)| catalog.get(id))
        .take(SEARCH_RESULTS)
        .map(|r| r.title.clone())
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountriesPage {
    pub has_country_data: bool,
    pub map: Chart,
    pub pie: Chart,
    pub countries: Vec<String>,
    pub selected_country: Option<String>,
    pub country_movies: Vec<MovieLine>,
    pub releases: Chart,
    pub genres: Vec<String>,
    pub selected_genres: Vec<String>,
    pub year_range: Option<(i32, i32)>,
    pub revenue: Chart,
}

/// Distinct atomic countries in first-seen order.
fn country_options<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a MovieRecord>,
{
    let mut countries: Vec<String> = Vec::new();
    for record in records {
        for country in atomic_countries(&record.production_countries_canonical) {
            if !countries.iter().any(|c| c == country) {
                countries.push(country.to_owned());
            }
        }
    }
    countries
}

pub fn countries_page<R: Rng>(
    catalog: &Catalog,
    selections: &Selections,
    rng: &mut R,
) -> CountriesPage {
    let counts = aggregate(catalog.with_countries(), Aggregation::CountryCount);
    let shares = with_percentages(&counts);
    let map = Chart::new(
        ChartKind::ScatterGeo,
        "Production Countries",
        to_chart_rows(&counts, "Country", "Count"),
    );
    let pie = Chart::new(
        ChartKind::Pie,
        "Production Country Percentage",
        share_chart_rows(&shares, "Country", "Percentage (%)"),
    );

    let countries = country_options(catalog.with_countries());
    let selected_country = selections
        .country
        .clone()
        .or_else(|| countries.first().cloned());
    let country_movies = match &selected_country {
        Some(country) => {
            let matching = filter_records(
                catalog.with_countries(),
                &RecordFilter::default().country(country),
            );
            let mut picked = if matching.len() > MOVIES_PER_COUNTRY {
                matching
                    .choose_multiple(rng, MOVIES_PER_COUNTRY)
                    .cloned()
                    .collect()
            } else {
                matching
            };
            picked.sort_by_key(|r| r.id);
            picked.into_iter().map(MovieLine::from).collect()
        }
        None => Vec::new(),
    };

    let releases = Chart::new(
        ChartKind::Line,
        "Movies Released Per Year",
        to_chart_rows(
            &aggregate(catalog.all(), Aggregation::ReleaseYearCount),
            "Release Year",
            "Number of Movies",
        ),
    );

    let year_range = match (catalog.year_bounds(), selections.year_from, selections.year_to) {
        (Some((min, max)), from, to) => Some((from.unwrap_or(min), to.unwrap_or(max))),
        (None, Some(from), Some(to)) => Some((from, to)),
        (None, _, _) => None,
    };
    let selected_genres = selections
        .genres
        .clone()
        .unwrap_or_else(|| vec![DEFAULT_REVENUE_GENRE.to_owned()]);
    let mut filter = RecordFilter::default().genres(selected_genres.clone());
    if let Some((from, to)) = year_range {
        filter = filter.year(YearFilter::Range(from, to));
    }
    let revenue_rows = aggregate(
        filter_records(catalog.all(), &filter),
        Aggregation::GenreRevenue {
            genres: &selected_genres,
        },
    );
    let revenue_title = match year_range {
        Some((from, to)) => format!("Revenue by Genre ({} - {})", from, to),
        None => "Revenue by Genre".to_owned(),
    };
    let revenue = Chart::new(
        ChartKind::Bar,
        &revenue_title,
        to_chart_rows(&revenue_rows, "Genre", "Total Revenue"),
    );

    CountriesPage {
        has_country_data: !map.series.is_empty(),
        map,
        pie,
        countries,
        selected_country,
        country_movies,
        releases,
        genres: catalog.genres(),
        selected_genres,
        year_range,
        revenue,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorsPage {
    pub actor: Option<String>,
    pub actor_movies: Vec<MovieLine>,
    pub most: bool,
    pub ranking: Chart,
}

pub fn actors_page(catalog: &Catalog, selections: &Selections) -> ActorsPage {
    let actor_movies = match &selections.actor {
        Some(actor) => filter_records(catalog.all(), &RecordFilter::default().actor(actor))
            .into_iter()
            .map(MovieLine::from)
            .collect(),
        None => Vec::new(),
    };
    let ranking = selections.ranking.unwrap_or(Ranking::Most);
    let counts = aggregate(catalog.all(), Aggregation::ActorCount);
    let title = match ranking {
        Ranking::Most => "Actors Featured in the Most Titles",
        Ranking::Least => "Actors Featured in the Least Titles",
    };
    ActorsPage {
        actor: selections.actor.clone(),
        actor_movies,
        most: ranking == Ranking::Most,
        ranking: Chart::new(
            ChartKind::HorizontalBar,
            title,
            to_chart_rows(
                &take_ranked(&counts, ranking, RANKED_ACTORS),
                "Actor Name",
                "Number of Titles",
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ingest;
    use crate::model::RawRecord;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog() -> Catalog {
        let raw: Vec<RawRecord> = serde_json::from_str(
            r#"[
            {"title": "A", "release_year": 2021, "popularity": 10.0, "revenue": 100,
             "genres_list": "['Action']", "production_countries": "['United States of America']",
             "Cast_list": "['Keanu Reeves', 'Miscellaneous']"},
            {"title": "B", "release_year": 2021, "popularity": 30.0, "revenue": 50,
             "genres_list": "Drama", "production_countries": "['France', 'United States of America']",
             "Cast_list": "['Keanu Reeves']"},
            {"title": "C", "release_year": 2019, "popularity": 20.0,
             "genres_list": ["Action", "Drama"], "Cast_list": "['Ana de Armas']"}
        ]"#,
        )
        .unwrap();
        Catalog::new(
            raw.iter()
                .enumerate()
                .map(|(id, r)| ingest(id as u64, r))
                .collect(),
        )
    }

    fn user() -> UserAccount {
        let mut user = UserAccount::new("bob".to_owned(), String::new());
        user.to_watch.push("C".to_owned());
        user
    }

    fn labels(chart: &Chart) -> Vec<&str> {
        chart.series.rows.iter().map(|r| r.label.as_str()).collect()
    }

    #[test]
    fn movies_page_defaults_to_latest_year() {
        let page = movies_page(&catalog(), &Selections::default(), &user(), Vec::new());
        assert_eq!(page.selected_year, Some(2021));
        assert_eq!(labels(&page.popular), vec!["B", "A"]);
        assert_eq!(page.genres, vec!["Action", "Drama"]);
        assert_eq!(page.details.unwrap().title, "A");
        assert_eq!(page.to_watch, vec!["C"]);
    }

    #[test]
    fn latest_year_may_come_from_a_record_without_country() {
        let mut records = catalog().all().to_vec();
        let mut raw = RawRecord::new();
        raw.insert("title".to_owned(), "D".into());
        raw.insert("release_year".to_owned(), 2023.into());
        records.push(ingest(3, &raw));
        let page = movies_page(&Catalog::new(records), &Selections::default(), &user(), Vec::new());
        assert_eq!(page.year_bounds, Some((2019, 2023)));
        assert_eq!(page.selected_year, Some(2023));
        assert_eq!(labels(&page.popular), vec!["D"]);
    }

    #[test]
    fn movies_page_applies_year_and_genre() {
        let selections = Selections {
            year: Some(2019),
            genre: Some("Drama".to_owned()),
            movie: Some("C".to_owned()),
            ..Selections::default()
        };
        let page = movies_page(&catalog(), &selections, &user(), Vec::new());
        assert_eq!(labels(&page.popular), vec!["C"]);
        let details = page.details.unwrap();
        assert_eq!(details.genres, "Action, Drama");
        assert_eq!(details.popularity, "20");
    }

    #[test]
    fn countries_page_skips_records_without_country() {
        let mut rng = StdRng::seed_from_u64(7);
        let page = countries_page(&catalog(), &Selections::default(), &mut rng);
        assert!(page.has_country_data);
        assert_eq!(labels(&page.map), vec!["United States", "France"]);
        assert_eq!(page.pie.series.rows[0].value, 100.0 * 2.0 / 3.0);
        assert_eq!(page.countries, vec!["United States", "France"]);
        assert_eq!(page.selected_country.as_deref(), Some("United States"));
        assert_eq!(
            page.country_movies,
            vec![
                MovieLine {
                    title: "A".to_owned(),
                    year: "2021".to_owned(),
                    popularity: "10.00".to_owned(),
                },
                MovieLine {
                    title: "B".to_owned(),
                    year: "2021".to_owned(),
                    popularity: "30.00".to_owned(),
                },
            ]
        );
        assert_eq!(labels(&page.releases), vec!["2019", "2021"]);
        assert_eq!(page.selected_genres, vec!["Action"]);
        assert_eq!(page.year_range, Some((2019, 2021)));
        assert_eq!(page.revenue.series.rows, vec![ChartRow {
            label: "Action".to_owned(),
            value: 100.0,
        }]);
    }

    #[test]
    fn countries_page_without_data() {
        let mut rng = StdRng::seed_from_u64(7);
        let page = countries_page(&Catalog::default(), &Selections::default(), &mut rng);
        assert!(!page.has_country_data);
        assert!(page.country_movies.is_empty());
        assert!(page.revenue.series.is_empty());
        assert_eq!(page.year_range, None);
    }

    #[test]
    fn country_sample_is_capped() {
        let records = (0..8)
            .map(|id| {
                let mut raw = RawRecord::new();
                raw.insert("production_countries".to_owned(), "Spain".into());
                ingest(id, &raw)
            })
            .collect();
        let mut rng = StdRng::seed_from_u64(1);
        let page = countries_page(&Catalog::new(records), &Selections::default(), &mut rng);
        assert_eq!(page.country_movies.len(), MOVIES_PER_COUNTRY);
    }

    #[test]
    fn actors_page_search_and_ranking() {
        let selections = Selections {
            actor: Some("keanu reeves".to_owned()),
            ..Selections::default()
        };
        let page = actors_page(&catalog(), &selections);
        let titles = page
            .actor_movies
            .iter()
            .map(|m| m.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["A", "B"]);
        assert!(page.most);
        assert_eq!(labels(&page.ranking), vec!["Keanu Reeves", "Ana de Armas"]);

        let least = actors_page(
            &catalog(),
            &Selections {
                ranking: Some(Ranking::Least),
                ..Selections::default()
            },
        );
        assert!(least.actor_movies.is_empty());
        assert_eq!(least.ranking.title, "Actors Featured in the Least Titles");
    }

    #[test]
    fn search_maps_ids_to_titles() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let index = TitleIndex::open(&db).unwrap();
        let catalog = catalog();
        for record in catalog.all() {
            index.insert(record.id, &record.title).unwrap();
        }
        index.insert(99, "B").unwrap();
        assert_eq!(search_titles(&index, &catalog, "b").unwrap(), vec!["B"]);
    }
}
