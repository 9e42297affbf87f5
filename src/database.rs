use crate::model::*;
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionResult, Transactional};
use std::convert::TryInto;

fn serialize_id(id: u64) -> [u8; 8] {
    id.to_le_bytes()
}

fn deserialize_id<V: AsRef<[u8]>>(id: V) -> sled::Result<u64> {
    id.as_ref()
        .try_into()
        .map(u64::from_le_bytes)
        .map_err(|_| sled::Error::Unsupported("malformed id".to_owned()))
}

fn codec_error(err: bincode::Error) -> sled::Error {
    sled::Error::Unsupported(format!("bad user record: {}", err))
}

pub trait UserDb {
    type Error;
    /// Returns `None` when the username is already taken.
    fn add_user(&self, user: &UserAccount) -> Result<Option<u64>, Self::Error>;
    fn get_user(&self, id: u64) -> Result<Option<UserAccount>, Self::Error>;
    fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<(u64, UserAccount)>, Self::Error>;
    /// Appends `title` to one of the user's lists within a single
    /// transaction. Returns `None` for an unknown id, otherwise whether the
    /// list changed.
    fn add_to_user_list(
        &self,
        id: u64,
        list: ListKind,
        title: &str,
    ) -> Result<Option<bool>, Self::Error>;
}

const USERS: &[u8] = b"users";
const USERS_USERNAME: &[u8] = b"USERS_USERNAME";

impl UserDb for sled::Db {
    type Error = sled::Error;

    fn add_user(&self, user: &UserAccount) -> sled::Result<Option<u64>> {
        let users = self.open_tree(USERS)?;
        let users_username = self.open_tree(USERS_USERNAME)?;
        let id = self.generate_id()?;
        let encoded = bincode::serialize(user).map_err(codec_error)?;
        if let Err(err) = (&users, &users_username).transaction(|(users, users_username)| {
            users.insert(&serialize_id(id), encoded.as_slice())?;
            if users_username
                .insert(user.username.as_bytes(), &serialize_id(id))?
                .is_some()
            {
                sled::transaction::abort(())?;
            }
            Ok(())
        }) {
            match err {
                TransactionError::Storage(e) => return Err(e),
                TransactionError::Abort(_) => return Ok(None),
            };
        }
        Ok(Some(id))
    }

    fn get_user(&self, id: u64) -> sled::Result<Option<UserAccount>> {
        let users = self.open_tree(USERS)?;
        users
            .get(serialize_id(id))?
            .map(|d| bincode::deserialize(&d).map_err(codec_error))
            .transpose()
    }

    fn get_user_by_username(&self, username: &str) -> sled::Result<Option<(u64, UserAccount)>> {
        let users_username = self.open_tree(USERS_USERNAME)?;
        let users = self.open_tree(USERS)?;
        if let Some(id) = users_username.get(username)? {
            let data = users
                .get(&id)?
                .ok_or_else(|| sled::Error::Unsupported("Bad index users_username".to_owned()))?;
            let user = bincode::deserialize(&data).map_err(codec_error)?;
            Ok(Some((deserialize_id(id)?, user)))
        } else {
            Ok(None)
        }
    }

    fn add_to_user_list(&self, id: u64, list: ListKind, title: &str) -> sled::Result<Option<bool>> {
        let users = self.open_tree(USERS)?;
        let key = serialize_id(id);
        let result: TransactionResult<bool, ()> = users.transaction(|users| {
            let mut user: UserAccount = match users.get(&key)? {
                Some(data) => bincode::deserialize(&data).map_err(codec_error)?,
                None => return Err(ConflictableTransactionError::Abort(())),
            };
            if !user.add_to(list, title) {
                return Ok(false);
            }
            let encoded = bincode::serialize(&user).map_err(codec_error)?;
            users.insert(&key, encoded)?;
            Ok(true)
        });
        match result {
            Ok(changed) => Ok(Some(changed)),
            Err(TransactionError::Abort(())) => Ok(None),
            Err(TransactionError::Storage(e)) => Err(e),
        }
    }
}

/// Raw catalog entries, stored as JSON because their field types vary.
///
/// A catalog counts as imported once the completion marker is written, which
/// happens after the records and the search index are in place.
pub trait MovieDb {
    type Error;
    /// Stores all records in one atomic batch and returns their ids in order.
    fn add_raw_movies(&self, records: &[RawRecord]) -> Result<Vec<u64>, Self::Error>;
    fn raw_movies(&self) -> Result<Vec<(u64, RawRecord)>, Self::Error>;
    fn movie_count(&self) -> Result<usize, Self::Error>;
    fn clear_movies(&self) -> Result<(), Self::Error>;
    fn catalog_imported(&self) -> Result<bool, Self::Error>;
    fn mark_catalog_imported(&self, count: usize) -> Result<(), Self::Error>;
}

const MOVIES: &[u8] = b"movies";
const CATALOG_META: &[u8] = b"catalog_meta";
const IMPORTED: &[u8] = b"imported";

// Big-endian so that iteration follows insertion order.
fn movie_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn movie_id<V: AsRef<[u8]>>(key: V) -> sled::Result<u64> {
    key.as_ref()
        .try_into()
        .map(u64::from_be_bytes)
        .map_err(|_| sled::Error::Unsupported("malformed movie key".to_owned()))
}

fn json_error(err: serde_json::Error) -> sled::Error {
    sled::Error::Unsupported(format!("bad movie record: {}", err))
}

impl MovieDb for sled::Db {
    type Error = sled::Error;

    fn add_raw_movies(&self, records: &[RawRecord]) -> sled::Result<Vec<u64>> {
        let movies = self.open_tree(MOVIES)?;
        let mut batch = sled::Batch::default();
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = self.generate_id()?;
            let encoded = serde_json::to_vec(record).map_err(json_error)?;
            batch.insert(movie_key(id).to_vec(), encoded);
            ids.push(id);
        }
        movies.apply_batch(batch)?;
        Ok(ids)
    }

    fn raw_movies(&self) -> sled::Result<Vec<(u64, RawRecord)>> {
        let movies = self.open_tree(MOVIES)?;
        movies
            .iter()
            .map(|entry| {
                let (key, value) = entry?;
                let record = serde_json::from_slice(&value).map_err(json_error)?;
                Ok((movie_id(key)?, record))
            })
            .collect()
    }

    fn movie_count(&self) -> sled::Result<usize> {
        Ok(self.open_tree(MOVIES)?.len())
    }

    fn clear_movies(&self) -> sled::Result<()> {
        self.open_tree(CATALOG_META)?.remove(IMPORTED)?;
        self.open_tree(MOVIES)?.clear()
    }

    fn catalog_imported(&self) -> sled::Result<bool> {
        self.open_tree(CATALOG_META)?.contains_key(IMPORTED)
    }

    fn mark_catalog_imported(&self, count: usize) -> sled::Result<()> {
        let meta = self.open_tree(CATALOG_META)?;
        meta.insert(IMPORTED, &(count as u64).to_le_bytes())?;
        Ok(())
    }
}
