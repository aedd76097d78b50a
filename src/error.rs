//! Error types.

use hickory_server::proto::error::ProtoError;
use uuid::Uuid;

/// Error enumerates the possible error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned for any authentication or authorization failure on the
    /// [`/update` API endpoint][crate::api#update-post]. The cause is deliberately not carried:
    /// unknown usernames, wrong secrets, disallowed networks and subdomain mismatches are
    /// indistinguishable to the client.
    #[error("forbidden")]
    Forbidden,

    /// Returned when a [`/register`][crate::api#register-post] request lists an `allowfrom`
    /// entry that isn't a valid CIDR network.
    #[error("invalid CIDR network: \"{0}\"")]
    InvalidCidr(String),

    /// Returned when clients `POST` a body that can't be decoded as the expected JSON shape.
    #[error("malformed JSON payload")]
    MalformedJson(#[source] serde_json::Error),

    /// Returned when an update names a `subdomain` that isn't a single valid DNS label.
    #[error("invalid subdomain: \"{0}\"")]
    InvalidSubdomain(String),

    /// Returned when clients `POST` the [`/update` API endpoint][crate::api#update-post] with
    /// a `txt` value that isn't a valid [RFC-8555][RFC-8555] [DNS-01] challenge response value.
    ///
    /// These values MUST be 43 characters of the unpadded URL-safe BASE64 alphabet.
    ///
    /// [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
    /// [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
    #[error("TXT value is not a valid DNS-01 challenge response")]
    InvalidDNS01,

    /// Returned by [`CredentialStore::lookup`][crate::credential_store::CredentialStore::lookup]
    /// when no credential exists for the username.
    #[error("no credential registered for username {0}")]
    UnknownUsername(Uuid),

    /// Returned when an authenticated update couldn't be written to the credential store.
    #[error("updating TXT record failed")]
    UpdateFailed(#[source] Box<Error>),

    /// Returned when hashing a freshly generated secret fails.
    #[error("secret hashing failed")]
    SecretHash(#[from] bcrypt::BcryptError),

    /// Returned when work moved to the blocking thread pool panicked or was cancelled.
    #[error("blocking task failed")]
    BlockingTask(#[from] tokio::task::JoinError),

    /// Returned when the SQLite credential store backend fails.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Returned when a stored credential row can't be decoded.
    #[error("corrupt credential row for username {0}: {1}")]
    CorruptCredential(String, String),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON from disk (e.g. to
    /// [trying to load a `Config`][crate::config::Config::try_from_file]) fails
    /// due to invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when the DNS server encounters a generic DNS protocol error.
    #[error("DNS error")]
    DNSError(#[from] ProtoError),

    /// Returned when the configuration enables neither a UDP nor a TCP DNS listener.
    #[error("no DNS listener configured: set dns_udp_bind_addr and/or dns_tcp_bind_addr")]
    NoDnsListener,
}
