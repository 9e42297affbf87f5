use crate::database::UserDb;
use crate::model::{ListKind, UserAccount};
use log::{debug, info};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Please provide both username and password.")]
    MissingCredentials,
    #[error("Username already exists. Choose a different username.")]
    AlreadyExists,
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

impl AccountError {
    /// Whether the message is meant for the user rather than the log.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AccountError::MissingCredentials
                | AccountError::AlreadyExists
                | AccountError::InvalidCredentials
        )
    }

    /// Short code carried in redirect URLs.
    pub fn code(&self) -> &'static str {
        match self {
            AccountError::MissingCredentials => "missing_credentials",
            AccountError::AlreadyExists => "already_exists",
            AccountError::InvalidCredentials => "invalid_credentials",
            AccountError::Storage(_) | AccountError::Hash(_) => "internal",
        }
    }
}

/// Registration, login and list management on top of a sled account store.
#[derive(Clone)]
pub struct Accounts {
    db: sled::Db,
    cost: u32,
}

impl Accounts {
    pub fn new(db: sled::Db, cost: u32) -> Self {
        Accounts { db, cost }
    }

    pub fn register(&self, username: &str, password: &str) -> Result<UserAccount, AccountError> {
        if username.is_empty() || password.is_empty() {
            return Err(AccountError::MissingCredentials);
        }
        if self.db.get_user_by_username(username)?.is_some() {
            return Err(AccountError::AlreadyExists);
        }
        let user = UserAccount::new(username.to_owned(), bcrypt::hash(password, self.cost)?);
        match self.db.add_user(&user)? {
            Some(id) => {
                info!("registered user {} ({})", username, id);
                Ok(user)
            }
            None => Err(AccountError::AlreadyExists),
        }
    }

    pub fn login(&self, username: &str, password: &str) -> Result<UserAccount, AccountError> {
        if username.is_empty() || password.is_empty() {
            return Err(AccountError::MissingCredentials);
        }
        if let Some((_id, user)) = self.db.get_user_by_username(username)? {
            if bcrypt::verify(password, &user.password_hash)? {
                return Ok(user);
            }
        }
        debug!("failed login for {}", username);
        Err(AccountError::InvalidCredentials)
    }

    pub fn get(&self, username: &str) -> Result<Option<UserAccount>, AccountError> {
        Ok(self.db.get_user_by_username(username)?.map(|(_id, user)| user))
    }

    /// Adds `title` to one of the user's lists. Returns whether it was new.
    pub fn add_to_list(
        &self,
        username: &str,
        list: ListKind,
        title: &str,
    ) -> Result<bool, AccountError> {
        let (id, _) = self
            .db
            .get_user_by_username(username)?
            .ok_or(AccountError::InvalidCredentials)?;
        let added = self
            .db
            .add_to_user_list(id, list, title)?
            .ok_or(AccountError::InvalidCredentials)?;
        debug!("{} {:?} {}: {}", username, list, title, added);
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts() -> Accounts {
        let db = sled::Config::new().temporary(true).open().unwrap();
        Accounts::new(db, 4)
    }

    #[test]
    fn register_then_login() {
        let accounts = accounts();
        accounts.register("bob", "pw").unwrap();
        let user = accounts.login("bob", "pw").unwrap();
        assert_eq!(user.username, "bob");
        assert_ne!(user.password_hash, "pw");
        assert!(matches!(
            accounts.login("bob", "wrong"),
            Err(AccountError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.login("alice", "pw"),
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[test]
    fn duplicate_registration_fails() {
        let accounts = accounts();
        accounts.register("bob", "pw").unwrap();
        assert!(matches!(
            accounts.register("bob", "other"),
            Err(AccountError::AlreadyExists)
        ));
        accounts.login("bob", "pw").unwrap();
    }

    #[test]
    fn empty_credentials_are_rejected() {
        let accounts = accounts();
        assert!(matches!(
            accounts.register("", "pw"),
            Err(AccountError::MissingCredentials)
        ));
        assert!(matches!(
            accounts.login("bob", ""),
            Err(AccountError::MissingCredentials)
        ));
        assert!(AccountError::MissingCredentials.is_user_facing());
    }

    #[test]
    fn lists_ignore_duplicates() {
        let accounts = accounts();
        accounts.register("bob", "pw").unwrap();
        assert!(accounts.add_to_list("bob", ListKind::ToWatch, "Heat").unwrap());
        assert!(!accounts.add_to_list("bob", ListKind::ToWatch, "Heat").unwrap());
        assert!(accounts.add_to_list("bob", ListKind::Favorites, "Heat").unwrap());
        let user = accounts.get("bob").unwrap().unwrap();
        assert_eq!(user.to_watch, vec!["Heat"]);
        assert_eq!(user.favorites, vec!["Heat"]);
    }

    #[test]
    fn concurrent_list_additions_are_all_kept() {
        let accounts = accounts();
        accounts.register("bob", "pw").unwrap();
        let handles = (0..8)
            .map(|i| {
                let accounts = accounts.clone();
                std::thread::spawn(move || {
                    accounts
                        .add_to_list("bob", ListKind::ToWatch, &format!("Movie {}", i))
                        .unwrap()
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        let mut titles = accounts.get("bob").unwrap().unwrap().to_watch;
        titles.sort();
        assert_eq!(
            titles,
            (0..8).map(|i| format!("Movie {}", i)).collect::<Vec<_>>()
        );
    }
}
