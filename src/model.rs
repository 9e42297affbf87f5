use serde::{Deserialize, Serialize};

/// A catalog entry as it arrives from the store, before any cleaning. Field
/// types vary between entries.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MovieRecord {
    pub id: u64,
    pub title: String,
    pub release_date: String,
    pub release_year: Option<i32>,
    pub popularity: Option<f64>,
    pub revenue: Option<f64>,
    pub overview: String,
    pub genres: Vec<String>,
    pub production_countries_raw: Vec<String>,
    pub production_countries_canonical: Vec<String>,
    pub cast: Vec<String>,
}

impl MovieRecord {
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g == genre)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub username: String,
    pub password_hash: String,
    pub to_watch: Vec<String>,
    pub favorites: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    ToWatch,
    Favorites,
}

impl UserAccount {
    pub fn new(username: String, password_hash: String) -> Self {
        UserAccount {
            username,
            password_hash,
            to_watch: Vec::new(),
            favorites: Vec::new(),
        }
    }

    /// Appends `title` unless it is already present. Returns whether the list changed.
    pub fn add_to(&mut self, list: ListKind, title: &str) -> bool {
        let entries = match list {
            ListKind::ToWatch => &mut self.to_watch,
            ListKind::Favorites => &mut self.favorites,
        };
        if entries.iter().any(|t| t == title) {
            return false;
        }
        entries.push(title.to_owned());
        true
    }
}
