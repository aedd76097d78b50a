//! Authoritative DNS server for the configured domain.
//!
//! # Dynamic TXT Records
//!
//! Every registered credential owns a subdomain of [`Config::domain`][crate::config::Config::domain]
//! with two TXT slots. A `TXT` query is answered from the slots of the subdomain named by the
//! first label of the query name, with one record per non-empty slot and a TTL of one second.
//! Slots are filled by clients `POST`ing the [`/update` API endpoint][crate::api#update-post].
//!
//! E.g. after registering and updating with the returned credential:
//!
//! ```bash
//! ❯ curl -X POST http://localhost:3000/register
//! {"username":"c36f50e8-4632-44f0-83fe-e070fef28a10","password":"htB9mR9DYgcu9bX_afHF62erXaH2TS7bg9KW3F7Z","fulldomain":"8e5700ea-a4bf-4b3e-bd9b-5df0f80b3cb6.auth.example.org","subdomain":"8e5700ea-a4bf-4b3e-bd9b-5df0f80b3cb6","allowfrom":[]}
//! ❯ curl -H 'X-Api-User: c36f50e8-4632-44f0-83fe-e070fef28a10' \
//!   -H 'X-Api-Key: htB9mR9DYgcu9bX_afHF62erXaH2TS7bg9KW3F7Z' \
//!   --json '{"subdomain":"8e5700ea-a4bf-4b3e-bd9b-5df0f80b3cb6","txt":"LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo"}' \
//!   http://localhost:3000/update
//! {"txt":"LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo"}
//! ```
//!
//! A `TXT` query for the subdomain returns the pushed value:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 +short 8e5700ea-a4bf-4b3e-bd9b-5df0f80b3cb6.auth.example.org TXT
//! "LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo"
//! ```
//!
//! Each update overwrites the older of the two slots, so during a rotation both the previous
//! and the current value are served.
//!
//! # Own Challenge
//!
//! `TXT` queries for exactly `_acme-challenge.<domain>` are answered with the value held by the
//! [`OwnChallenge`] handle, seeded from
//! [`Config::own_challenge`][crate::config::Config::own_challenge].
//!
//! # Static Records
//!
//! `A`/`AAAA`, `NS`, `CNAME` and `TXT` records are read once from the
//! [`Config`][crate::config::Config] (`addrs`, `ns_records`, `cname_records`, `txt_records`)
//! and keyed by exact owner name. When a name owns no record of the queried type but owns a
//! `CNAME`, the `CNAME` is returned.
//!
//! A `SOA` record for the domain is synthesized from
//! [`Config::ns_domain`][crate::config::Config::ns_domain] and
//! [`Config::ns_admin`][crate::config::Config::ns_admin]:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 auth.example.org +short SOA
//! ns1.auth.example.org. admin.example.org. 2023031217 28800 7200 604800 86400
//! ```
//!
//! _Note: The zone serial (`2023031217`) is the date and hour the server started._
//!
//! # Response Codes
//!
//! Responses are authoritative for the domain, every static owner name and all names below
//! them. Names with no static records and no answers get `NXDOMAIN`; authoritative `NXDOMAIN`
//! responses carry the SOA in the authority section. Requests that aren't standard queries get
//! `NOTIMP`, and requests with an EDNS version above 0 get `BADVERS`.

mod handlers;
pub mod responder;
pub mod server;
pub mod zone;

pub use handlers::Handler;
pub use server::new;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handle to the value served for this server's own `_acme-challenge` name.
pub type OwnChallenge = Arc<RwLock<String>>;
