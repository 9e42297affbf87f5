use crate::aggregate::Ranking;
use actix_identity::Identity;

/// Widget state submitted with one interaction. Unparsable values are
/// treated as unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selections {
    pub year: Option<i32>,
    /// `None` and "All" both mean no genre filter.
    pub genre: Option<String>,
    pub movie: Option<String>,
    pub query: Option<String>,
    pub country: Option<String>,
    pub genres: Option<Vec<String>>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub actor: Option<String>,
    pub ranking: Option<Ranking>,
    pub message: Option<String>,
}

impl Selections {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut selections = Selections::default();
        for (key, value) in pairs {
            let value = value.trim();
            match key.as_str() {
                "year" => selections.year = value.parse().ok(),
                "genre" if value != "All" && !value.is_empty() => {
                    selections.genre = Some(value.to_owned())
                }
                "movie" if !value.is_empty() => selections.movie = Some(value.to_owned()),
                "q" if !value.is_empty() => selections.query = Some(value.to_owned()),
                "country" if !value.is_empty() => selections.country = Some(value.to_owned()),
                "genres" => {
                    let genres = selections.genres.get_or_insert_with(Vec::new);
                    if !value.is_empty() && !genres.iter().any(|g| g == value) {
                        genres.push(value.to_owned());
                    }
                }
                "year_from" => selections.year_from = value.parse().ok(),
                "year_to" => selections.year_to = value.parse().ok(),
                "actor" if !value.is_empty() => selections.actor = Some(value.to_owned()),
                "ranking" => {
                    selections.ranking = match value {
                        "most" => Some(Ranking::Most),
                        "least" => Some(Ranking::Least),
                        _ => None,
                    }
                }
                "message" if !value.is_empty() => selections.message = Some(value.to_owned()),
                _ => {}
            }
        }
        selections
    }
}

/// Movie dashboard location showing `movie` under the given filters, with a
/// message code to display.
pub fn dashboard_location(
    movie: &str,
    year: Option<i32>,
    genre: Option<&str>,
    message: &str,
) -> String {
    let mut location = format!(
        "/?movie={}&message={}",
        urlencoding::encode(movie),
        urlencoding::encode(message)
    );
    if let Some(year) = year {
        location.push_str(&format!("&year={}", year));
    }
    if let Some(genre) = genre {
        location.push_str(&format!("&genre={}", urlencoding::encode(genre)));
    }
    location
}

/// Who is asking and what they selected; built fresh for every request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    pub username: Option<String>,
    pub selections: Selections,
}

impl SessionContext {
    pub fn new(id: &Identity, pairs: &[(String, String)]) -> Self {
        SessionContext {
            username: id.identity(),
            selections: Selections::from_pairs(pairs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_widget_values() {
        let selections = Selections::from_pairs(&pairs(&[
            ("year", "2021"),
            ("genre", "All"),
            ("genres", "Action"),
            ("genres", "Drama"),
            ("genres", "Action"),
            ("year_from", "2019"),
            ("year_to", "x"),
            ("actor", " Keanu Reeves "),
            ("ranking", "least"),
        ]));
        assert_eq!(
            selections,
            Selections {
                year: Some(2021),
                genres: Some(vec!["Action".to_owned(), "Drama".to_owned()]),
                year_from: Some(2019),
                actor: Some("Keanu Reeves".to_owned()),
                ranking: Some(Ranking::Least),
                ..Selections::default()
            }
        );
    }

    #[test]
    fn empty_genre_selection_is_kept() {
        let selections = Selections::from_pairs(&pairs(&[("genres", "")]));
        assert_eq!(selections.genres, Some(Vec::new()));
        assert_eq!(Selections::from_pairs(&[]).genres, None);
    }

    #[test]
    fn dashboard_location_keeps_the_selection() {
        let location = dashboard_location(
            "Tom & Jerry: 100%",
            Some(2021),
            Some("Science Fiction"),
            "added_favorite",
        );
        let pairs = location
            .trim_start_matches("/?")
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.to_owned(), urlencoding::decode(v).unwrap().into_owned()))
            .collect::<Vec<_>>();
        let selections = Selections::from_pairs(&pairs);
        assert_eq!(selections.movie.as_deref(), Some("Tom & Jerry: 100%"));
        assert_eq!(selections.year, Some(2021));
        assert_eq!(selections.genre.as_deref(), Some("Science Fiction"));
        assert_eq!(selections.message.as_deref(), Some("added_favorite"));

        assert_eq!(
            dashboard_location("Heat", None, None, "already_listed"),
            "/?movie=Heat&message=already_listed"
        );
    }
}
