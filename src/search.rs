//! BM25 full-text index over movie titles and overviews.
//!
//! Layout, all under the `title_search` prefix:
//! - `_tokens`: token -> document frequency (u32) ++ token id (u64)
//! - `_frequency`: token id ++ movie id -> term frequency (u32)
//! - `_doclen`: movie id -> token count (u32); the empty key holds the total
//!
//! The empty token occurs once in every document, so its document frequency
//! is the number of indexed documents.

use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use std::collections::HashMap;
use std::convert::TryInto;
use unic_ucd_category::GeneralCategory;

const K1: f32 = 1.2;
const B: f32 = 0.75;

pub fn tokens_iter(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c| !is_token_character(c))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

pub fn is_token_character(c: char) -> bool {
    let category = GeneralCategory::of(c);
    category.is_number() || category.is_letter() || category == GeneralCategory::PrivateUse
}

fn read_u32(data: &[u8]) -> sled::Result<u32> {
    data.get(0..4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| sled::Error::Unsupported("malformed search index entry".to_owned()))
}

/// Splits a `_tokens` entry into document frequency and token id.
fn read_token_entry(data: &[u8]) -> sled::Result<(u32, u64)> {
    let token_id = data
        .get(4..12)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or_else(|| sled::Error::Unsupported("malformed search index entry".to_owned()))?;
    Ok((read_u32(data)?, token_id))
}

fn count_tokens(text: &str) -> (HashMap<String, u32>, u32) {
    let mut counts: HashMap<String, u32> = HashMap::new();
    let mut total = 0u32;
    for token in tokens_iter(text) {
        *counts.entry(token).or_insert(0) += 1;
        total += 1;
    }
    (counts, total)
}

#[derive(Clone)]
pub struct TitleIndex {
    frequency: sled::Tree,
    tokens: sled::Tree,
    doclen: sled::Tree,
}

impl TitleIndex {
    pub fn open(db: &sled::Db) -> sled::Result<Self> {
        Ok(TitleIndex {
            frequency: db.open_tree(b"title_search_frequency")?,
            tokens: db.open_tree(b"title_search_tokens")?,
            doclen: db.open_tree(b"title_search_doclen")?,
        })
    }

    /// Indexes `text` under `id`. Returns `false` if `id` was already indexed.
    pub fn insert(&self, id: u64, text: &str) -> sled::Result<bool> {
        let key = id.to_be_bytes();
        let (mut token_counts, total_count) = count_tokens(text);
        token_counts.insert(String::new(), 1);
        let result = (&self.frequency, &self.tokens, &self.doclen).transaction(
            |(frequency, tokens, doclen)| {
                if doclen
                    .insert(key.as_ref(), total_count.to_le_bytes().as_ref())?
                    .is_some()
                {
                    return Err(ConflictableTransactionError::Abort(()));
                }
                let old_total = match doclen.get(&[])? {
                    Some(data) => read_u32(&data)?,
                    None => 0,
                };
                doclen.insert(&[], (old_total + total_count).to_le_bytes().as_ref())?;
                for (token, count) in token_counts.iter() {
                    let (old_count, token_id) = match tokens.get(token.as_bytes())? {
                        Some(old) => read_token_entry(&old)?,
                        None => (0, tokens.generate_id()?),
                    };
                    let mut frequency_key = token_id.to_be_bytes().to_vec();
                    frequency_key.extend_from_slice(&key);
                    frequency.insert(frequency_key, count.to_le_bytes().as_ref())?;
                    let mut entry = (old_count + count).to_le_bytes().to_vec();
                    entry.extend_from_slice(&token_id.to_le_bytes());
                    tokens.insert(token.as_bytes(), entry)?;
                }
                Ok(())
            },
        );
        match result {
            Ok(()) => Ok(true),
            Err(TransactionError::Abort(())) => Ok(false),
            Err(TransactionError::Storage(e)) => Err(e),
        }
    }

    pub fn clear(&self) -> sled::Result<()> {
        self.frequency.clear()?;
        self.tokens.clear()?;
        self.doclen.clear()
    }

    /// Scores indexed documents against `query`, best match first.
    pub fn query(&self, query: &str) -> sled::Result<Vec<(u64, f32)>> {
        let (query_counts, _) = count_tokens(query);
        let num_documents = match self.tokens.get(b"")? {
            Some(data) => read_u32(&data)?,
            None => return Ok(Vec::new()),
        };
        let total_dl = match self.doclen.get(&[])? {
            Some(data) => read_u32(&data)?,
            None => 0,
        };
        let avgdl = total_dl as f32 / num_documents as f32;

        let mut scores: HashMap<u64, f32> = HashMap::new();
        for (token, count) in query_counts {
            let token_data = match self.tokens.get(token.as_bytes())? {
                Some(data) => data,
                None => continue,
            };
            let (document_frequency, token_id) = read_token_entry(&token_data)?;
            let document_frequency = document_frequency as f32;
            let idf = ((num_documents as f32 - document_frequency + 0.5)
                / (document_frequency + 0.5)
                + 1.0)
                .ln();
            for entry in self.frequency.scan_prefix(token_id.to_be_bytes()) {
                let (id_and_key, frequency_data) = entry?;
                let key = id_and_key.get(8..).unwrap_or(&[]);
                let id = key
                    .try_into()
                    .map(u64::from_be_bytes)
                    .map_err(|_| sled::Error::Unsupported("malformed search key".to_owned()))?;
                let frequency = read_u32(&frequency_data)? as f32;
                let dl = match self.doclen.get(key)? {
                    Some(data) => read_u32(&data)? as f32,
                    None => avgdl,
                };
                let bm25 =
                    idf * frequency * (K1 + 1.0) / (frequency + K1 * (1.0 - B + B * dl / avgdl));
                *scores.entry(id).or_insert(0.0) += bm25 * count as f32;
            }
        }

        let mut ranked = scores.into_iter().collect::<Vec<_>>();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> TitleIndex {
        let db = sled::Config::new().temporary(true).open().unwrap();
        TitleIndex::open(&db).unwrap()
    }

    #[test]
    fn tokens_are_lowercased_words() {
        assert_eq!(
            tokens_iter("Spider-Man: No Way Home (2021)").collect::<Vec<_>>(),
            vec!["spider", "man", "no", "way", "home", "2021"]
        );
    }

    fn assert_ranking(actual: Vec<(u64, f32)>, expected: &[(u64, f32)]) {
        assert_eq!(actual.len(), expected.len(), "{:?}", actual);
        for ((id, score), (expected_id, expected_score)) in actual.iter().zip(expected) {
            assert_eq!(id, expected_id, "{:?}", actual);
            assert!((score - expected_score).abs() < 1e-5, "{:?}", actual);
        }
    }

    #[test]
    fn clear_forgets_everything() {
        let index = index();
        assert!(index.insert(1, "Heat").unwrap());
        index.clear().unwrap();
        assert!(index.query("heat").unwrap().is_empty());
        assert!(index.insert(1, "Heat").unwrap());
    }

    #[test]
    fn query() {
        let index = index();
        assert!(index.insert(1, "foo bar").unwrap());
        assert!(index.insert(2, "foo").unwrap());
        assert!(index.insert(3, "bar").unwrap());
        assert_ranking(index.query("foo").unwrap(), &[(2, 0.52354836), (1, 0.3901917)]);
        assert_ranking(
            index.query("FOO bar").unwrap(),
            &[(1, 0.7803834), (2, 0.52354836), (3, 0.52354836)],
        );
        assert!(index.query("baz").unwrap().is_empty());
    }

    #[test]
    fn reinserting_is_rejected() {
        let index = index();
        assert!(index.insert(1, "Heat").unwrap());
        assert!(!index.insert(1, "Heat").unwrap());
        assert_eq!(index.query("heat").unwrap().len(), 1);
    }

    #[test]
    fn empty_index_has_no_results() {
        assert!(index().query("anything").unwrap().is_empty());
    }
}
