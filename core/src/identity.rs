use std::collections::BTreeSet;
use std::fmt;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::TrackerError;
use crate::store::{KvStore, keys};

/// A normalised (trimmed, lower-cased) email address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn parse(email: &str) -> Result<Self> {
        let normalized = email.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(TrackerError::validation("Please enter an email address").into());
        }
        if !normalized.contains('@') {
            return Err(
                TrackerError::validation(format!("'{}' is not an email address", email.trim()))
                    .into(),
            );
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Emails permitted to log in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    emails: BTreeSet<Identity>,
}

impl AllowList {
    /// Entries that are not valid emails are skipped.
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emails = emails
            .into_iter()
            .filter_map(|e| Identity::parse(e.as_ref()).ok())
            .collect();
        Self { emails }
    }

    /// Parse a comma- or newline-separated list. Lines starting with `#` are comments.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.starts_with('#'))
                .flat_map(|l| l.split(','))
                .map(str::trim)
                .filter(|e| !e.is_empty()),
        )
    }

    #[must_use]
    pub fn contains(&self, identity: &Identity) -> bool {
        self.emails.contains(identity)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.emails.len()
    }
}

pub fn login(store: &(impl KvStore + ?Sized), allow_list: &AllowList, email: &str) -> Result<Identity> {
    let identity = Identity::parse(email)?;
    if !allow_list.contains(&identity) {
        return Err(TrackerError::NotAllowed(identity.0).into());
    }
    store.set(keys::CURRENT_USER, identity.as_str())?;
    debug!(user = %identity, "logged in");
    Ok(identity)
}

/// The stored user, if any and still allowed.
pub fn current_user(store: &(impl KvStore + ?Sized), allow_list: &AllowList) -> Result<Option<Identity>> {
    let Some(raw) = store.get(keys::CURRENT_USER)? else {
        return Ok(None);
    };
    let Ok(identity) = Identity::parse(&raw) else {
        warn!(value = %raw, "discarding unreadable stored user");
        store.remove(keys::CURRENT_USER)?;
        return Ok(None);
    };
    if !allow_list.contains(&identity) {
        debug!(user = %identity, "stored user is no longer allowed");
        return Ok(None);
    }
    Ok(Some(identity))
}

/// Returns whether someone was logged in.
pub fn logout(store: &(impl KvStore + ?Sized)) -> Result<bool> {
    store.remove(keys::CURRENT_USER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;

    fn allow() -> AllowList {
        AllowList::parse("alice@example.com, Bob@Example.com\n# retired\ncarol@example.com")
    }

    #[test]
    fn test_parse_normalizes() {
        let id = Identity::parse("  Alice@Example.COM ").unwrap();
        assert_eq!(id.as_str(), "alice@example.com");
        assert_eq!(id.to_string(), "alice@example.com");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        for bad in ["", "   ", "alice"] {
            let err = Identity::parse(bad).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<TrackerError>(),
                Some(TrackerError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_allow_list_parse() {
        let list = allow();
        assert_eq!(list.len(), 3);
        assert!(list.contains(&Identity::parse("bob@example.com").unwrap()));
        assert!(!AllowList::parse("# nobody\n").contains(&Identity::parse("a@b.c").unwrap()));
        assert!(AllowList::parse("").is_empty());
    }

    #[test]
    fn test_allow_list_skips_invalid_entries() {
        let list = AllowList::new(["not-an-email", "dan@example.com"]);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_login_and_current_user() {
        let db = Database::open_in_memory().unwrap();
        let id = login(&db, &allow(), " BOB@example.com").unwrap();
        assert_eq!(id.as_str(), "bob@example.com");
        assert_eq!(db.get(keys::CURRENT_USER).unwrap().unwrap(), "bob@example.com");
        assert_eq!(current_user(&db, &allow()).unwrap(), Some(id));
    }

    #[test]
    fn test_login_not_allowed() {
        let db = Database::open_in_memory().unwrap();
        let err = login(&db, &allow(), "mallory@example.com").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::NotAllowed(e)) if e == "mallory@example.com"
        ));
        assert!(db.get(keys::CURRENT_USER).unwrap().is_none());
    }

    #[test]
    fn test_current_user_removed_from_list() {
        let db = Database::open_in_memory().unwrap();
        login(&db, &allow(), "carol@example.com").unwrap();
        let shorter = AllowList::parse("alice@example.com");
        assert!(current_user(&db, &shorter).unwrap().is_none());
    }

    #[test]
    fn test_current_user_garbage_is_cleared() {
        let db = Database::open_in_memory().unwrap();
        db.set(keys::CURRENT_USER, "   ").unwrap();
        assert!(current_user(&db, &allow()).unwrap().is_none());
        assert!(db.get(keys::CURRENT_USER).unwrap().is_none());
    }

    #[test]
    fn test_logout() {
        let db = Database::open_in_memory().unwrap();
        login(&db, &allow(), "alice@example.com").unwrap();
        assert!(logout(&db).unwrap());
        assert!(current_user(&db, &allow()).unwrap().is_none());
        assert!(!logout(&db).unwrap());
    }
}
