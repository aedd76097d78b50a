//! ACME Delegate
//!
//! A self-hosted authoritative DNS server for delegating [RFC-8555][RFC-8555] [DNS-01]
//! challenges, in the spirit of [acme-dns].
//!
//! Clients [register][crate::api#register-post] a credential over the HTTP API and receive a
//! random subdomain of the configured domain. They CNAME `_acme-challenge.<their domain>` to it,
//! then [push challenge values][crate::api#update-post] before each certificate issuance. The
//! [DNS server][crate::dns] answers `TXT` queries for the subdomain with the two most recent
//! values, so a CA retrying during a rotation still sees a valid one.
//!
//! Works with all authoritative DNS hosting providers that support CNAME records, and never
//! needs credentials for them.
//!
//! [acme-dns]: https://github.com/joohoi/acme-dns
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
//!
#![warn(clippy::pedantic)]

pub mod access;
pub mod api;
pub mod config;
pub mod credential;
pub mod credential_store;
pub mod dns;
pub mod error;

pub use access::AllowList;
pub use api::new as new_http;
pub use config::{Config, SharedConfig};
pub use credential_store::{
    CredentialStore, DynCredentialStore, InMemoryCredentialStore, SqliteCredentialStore,
};
pub use dns::new as new_dns;
pub use dns::OwnChallenge;
