//! Credential and dynamic TXT record storage.
//!
//! Stores registered credentials and, for each credential's subdomain, exactly two TXT slots
//! holding [RFC-8555][RFC-8555] [DNS-01] challenge response values. Each update overwrites the
//! slot written longest ago, so the previous and the current value both stay visible while a
//! CA validates.
//!
//! Two implementations are provided, [`memory::InMemoryCredentialStore`] and
//! [`sqlite::SqliteCredentialStore`]. The former is not durable across restarts.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4

use crate::credential::Credential;
use crate::error::Error;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

pub mod memory;
pub mod sqlite;

#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryCredentialStore;
#[allow(clippy::module_name_repetitions)]
pub use sqlite::SqliteCredentialStore;

/// `DynCredentialStore` is the single shared handle to a [`CredentialStore`].
///
/// Every store operation, reads included, runs while holding its one [`Mutex`]. Registration
/// (a credential plus its two slots) and slot rotation (find oldest, then overwrite it) are
/// therefore atomic with respect to every other operation.
#[allow(clippy::module_name_repetitions)]
pub type DynCredentialStore = Arc<Mutex<dyn CredentialStore + Send>>;

/// An async trait describing storage of credentials and their rotating TXT slots.
///
/// Methods take `&mut self`: a store is only reached through the exclusive lock of a
/// [`DynCredentialStore`].
#[async_trait::async_trait]
#[allow(clippy::module_name_repetitions)]
pub trait CredentialStore {
    /// Persist a newly generated credential with two empty TXT slots, all or nothing.
    ///
    /// The credential arrives already hashed: nothing slow runs while the store is locked.
    async fn register(&mut self, credential: Credential) -> Result<(), Error>;

    /// Fetch the credential for `username`, or [`Error::UnknownUsername`].
    async fn lookup(&mut self, username: Uuid) -> Result<Credential, Error>;

    /// Get the non-empty TXT values for `subdomain` in slot order. Unknown subdomains have none.
    async fn challenge_values(&mut self, subdomain: &str) -> Result<Vec<String>, Error>;

    /// Overwrite the oldest TXT slot of `subdomain`. Unknown subdomains are silently ignored.
    async fn update_challenge(&mut self, subdomain: &str, value: &str) -> Result<(), Error>;

    /// Check the backend is reachable.
    async fn ping(&mut self) -> Result<(), Error>;
}

/// The update timestamp for the slot about to be overwritten: now, but always later than the
/// newest slot so rotation order survives several updates within one second.
pub(crate) fn next_update_timestamp(newest: i64) -> i64 {
    OffsetDateTime::now_utc()
        .unix_timestamp()
        .max(newest.saturating_add(1))
}
