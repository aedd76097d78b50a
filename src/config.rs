use crate::credential_store::{DynCredentialStore, InMemoryCredentialStore, SqliteCredentialStore};
use crate::error::Error;
use hickory_server::proto::rr::{LowerName, Name};
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub type SharedConfig = Arc<Config>;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub domain: LowerName,
    pub ns_domain: LowerName,
    pub ns_admin: String,
    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub api_timeout: Duration,
    pub dns_udp_bind_addr: Option<SocketAddr>,
    pub dns_tcp_bind_addr: Option<SocketAddr>,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub dns_tcp_timeout: Duration,
    #[serde(default)]
    pub disable_registration: bool,
    #[serde(default)]
    pub use_header: bool,
    #[serde(default = "default_header_name")]
    pub header_name: String,
    #[serde(default)]
    pub own_challenge: String,
    #[serde(default = "default_static_ttl")]
    pub static_ttl: u32,
    #[serde(default)]
    pub addrs: HashMap<LowerName, Vec<IpAddr>>,
    #[serde(default)]
    pub ns_records: HashMap<LowerName, Vec<LowerName>>,
    #[serde(default)]
    pub cname_records: HashMap<LowerName, LowerName>,
    #[serde(default)]
    pub txt_records: HashMap<LowerName, Vec<String>>,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Selects the [`CredentialStore`][crate::credential_store::CredentialStore] backend.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(tag = "engine", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Credentials live only as long as the process.
    #[default]
    Memory,
    /// Credentials persist in the SQLite database at `path`, created if missing.
    Sqlite { path: String },
}

fn default_header_name() -> String {
    "X-Forwarded-For".to_string()
}

fn default_static_ttl() -> u32 {
    3600
}

impl Config {
    /// Load a [`Config`] from the JSON file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the path can't be opened, [`Error::InvalidJSON`] if the content
    /// doesn't describe a config, and [`Error::NoDnsListener`] if no DNS listener is enabled.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.has_dns_listener()?;
        Ok(conf)
    }

    /// Open the configured credential store behind the process-wide store lock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Database`] if the SQLite database can't be opened or initialized.
    pub fn credential_store(&self) -> Result<DynCredentialStore, Error> {
        Ok(match &self.store {
            StoreConfig::Memory => Arc::new(Mutex::new(InMemoryCredentialStore::default())),
            StoreConfig::Sqlite { path } => {
                Arc::new(Mutex::new(SqliteCredentialStore::open(path)?))
            }
        })
    }

    /// The SOA RNAME derived from [`Config::ns_admin`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DNSError`] if the admin address isn't a valid DNS name.
    pub fn ns_admin(&self) -> Result<Name, Error> {
        Ok(Name::from_str(&self.sanitized_ns_admin())?)
    }

    /// The full domain clients CNAME their `_acme-challenge` names to, without the trailing dot.
    #[must_use]
    pub fn full_domain(&self, subdomain: &str) -> String {
        let domain = self.domain.to_string();
        format!("{subdomain}.{}", domain.trim_end_matches('.'))
    }

    fn sanitized_ns_admin(&self) -> Cow<str> {
        match self.ns_admin.split_once('@') {
            Some((user, domain)) => {
                let user = user.replace('.', "\\.");
                Cow::Owned(format!("{user}.{domain}"))
            }
            _ => Cow::Borrowed(&self.ns_admin),
        }
    }

    fn has_dns_listener(&self) -> Result<(), Error> {
        if self.dns_udp_bind_addr.is_none() && self.dns_tcp_bind_addr.is_none() {
            return Err(Error::NoDnsListener);
        }
        Ok(())
    }
}
