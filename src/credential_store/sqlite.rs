//! A SQLite-backed implementation of the [`CredentialStore`][super::CredentialStore] trait.
//!
//! Credentials live in a `credentials` table and every subdomain owns exactly two rows of the
//! `txt_slots` table. The row with the smallest `last_update` (lowest `rowid` on ties) is the
//! oldest and is the one an update overwrites.
use crate::access::AllowList;
use crate::credential::Credential;
use crate::credential_store::{next_update_timestamp, CredentialStore};
use crate::error::Error;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use uuid::Uuid;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS credentials (
        username TEXT PRIMARY KEY NOT NULL,
        secret_hash TEXT NOT NULL,
        subdomain TEXT UNIQUE NOT NULL,
        allow_from TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS txt_slots (
        subdomain TEXT NOT NULL,
        value TEXT NOT NULL DEFAULT '',
        last_update INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS txt_slots_by_subdomain ON txt_slots (subdomain);
";

/// A [`CredentialStore`] persisted in a SQLite database.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct SqliteCredentialStore {
    conn: Connection,
}

impl SqliteCredentialStore {
    /// Open (creating if needed) the SQLite database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Database`] if the database can't be opened or the schema created.
    pub fn open(p: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(p)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::with_connection(conn)
    }

    /// Open a private in-memory database, lost when the store is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Database`] if the schema can't be created.
    pub fn open_in_memory() -> Result<Self, Error> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, Error> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

#[async_trait::async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn register(&mut self, credential: Credential) -> Result<(), Error> {
        let allow_from = serde_json::to_string(&credential.allow_from)?;

        // Dropping the transaction before commit rolls everything back.
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO credentials (username, secret_hash, subdomain, allow_from)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                credential.username.to_string(),
                credential.secret_hash,
                credential.subdomain,
                allow_from
            ],
        )?;
        tx.execute(
            "INSERT INTO txt_slots (subdomain, value, last_update)
             VALUES (?1, '', 0), (?1, '', 0)",
            params![credential.subdomain],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn lookup(&mut self, username: Uuid) -> Result<Credential, Error> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT secret_hash, subdomain, allow_from FROM credentials WHERE username = ?1",
                params![username.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((secret_hash, subdomain, allow_from)) = row else {
            return Err(Error::UnknownUsername(username));
        };
        let allow_from: AllowList = serde_json::from_str(&allow_from)
            .map_err(|err| Error::CorruptCredential(username.to_string(), err.to_string()))?;
        Ok(Credential {
            username,
            secret_hash,
            subdomain,
            allow_from,
        })
    }

    async fn challenge_values(&mut self, subdomain: &str) -> Result<Vec<String>, Error> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT value FROM txt_slots
             WHERE subdomain = ?1 AND value != ''
             ORDER BY rowid LIMIT 2",
        )?;
        let values = stmt
            .query_map(params![subdomain], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(values)
    }

    async fn update_challenge(&mut self, subdomain: &str, value: &str) -> Result<(), Error> {
        let tx = self.conn.transaction()?;
        let slots = {
            let mut stmt = tx.prepare(
                "SELECT rowid, last_update FROM txt_slots
                 WHERE subdomain = ?1
                 ORDER BY last_update, rowid",
            )?;
            let rows = stmt.query_map(params![subdomain], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        let Some(&(oldest, _)) = slots.first() else {
            return Ok(());
        };
        let newest = slots.iter().map(|&(_, ts)| ts).max().unwrap_or(0);
        tx.execute(
            "UPDATE txt_slots SET value = ?1, last_update = ?2 WHERE rowid = ?3",
            params![value, next_update_timestamp(newest), oldest],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), Error> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}
