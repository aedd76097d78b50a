//! HTTP API for registering credentials and updating dynamic TXT record responses.
//!
//! Every error response has a JSON body of the form `{"error": "<code>"}`.
//!
//! # API Endpoints
//!
//! ## `/health` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the credential store is
//!   reachable, HTTP 500 otherwise.
//!
//! ## `/register` (POST)
//!
//!   Registers a new credential. The optional JSON request body restricts the networks updates
//!   for the credential may come from:
//!
//!   ```json
//!   { "allowfrom": [ "192.0.2.0/24", "2001:db8::/32" ] }
//!   ```
//!
//!   An empty body or an empty `allowfrom` list leaves the credential unrestricted.
//!
//!   Returns HTTP 201 (Created) and a JSON response body of the form:
//!
//!   ```json
//!   {
//!     "username": "c36f50e8-4632-44f0-83fe-e070fef28a10",
//!     "password": "htB9mR9DYgcu9bX_afHF62erXaH2TS7bg9KW3F7Z",
//!     "fulldomain": "8e5700ea-a4bf-4b3e-bd9b-5df0f80b3cb6.auth.example.org",
//!     "subdomain": "8e5700ea-a4bf-4b3e-bd9b-5df0f80b3cb6",
//!     "allowfrom": [ "192.0.2.0/24", "2001:db8::/32" ]
//!   }
//!   ```
//!
//!   The `password` is only ever returned here. Clients then CNAME
//!   `_acme-challenge.<their domain>` to `fulldomain`.
//!
//!   Errors: HTTP 400 `invalid_allowfrom_cidr` for an `allowfrom` entry that isn't a CIDR
//!   network, HTTP 400 `malformed_json_payload` for an undecodable body, HTTP 500 when the
//!   credential store fails.
//!
//!   The route doesn't exist when
//!   [`Config::disable_registration`][crate::config::Config::disable_registration] is set.
//!
//! ## `/update` (POST)
//!
//!   Requires the `X-Api-User` (username) and `X-Api-Key` (password) headers and expects a
//!   JSON request body of the form:
//!
//!   ```json
//!   { "subdomain": "8e5700ea-a4bf-4b3e-bd9b-5df0f80b3cb6", "txt": "LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo" }
//!   ```
//!
//!  Where `subdomain` is the credential's own subdomain. The caller's address must be inside
//!  the credential's `allowfrom` networks. With
//!  [`Config::use_header`][crate::config::Config::use_header] the addresses are read from the
//!  [`Config::header_name`][crate::config::Config::header_name] header instead of the peer
//!  address; only enable this behind a proxy that overwrites that header.
//!
//!  The `txt` value must be a valid [RFC-8555][RFC-8555] [DNS-01] challenge response. It
//!  replaces the older of the subdomain's two TXT values.
//!
//!  For successful updates, returns HTTP 200 (OK) and a JSON response body of the form:
//!
//!  ```json
//!  { "txt": "LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo" }
//!  ```
//!
//!  Errors: HTTP 401 `forbidden` for any authentication or authorization failure, HTTP 400
//!  `bad_subdomain` or `bad_txt` for invalid values, HTTP 500 `db_error` when the credential
//!  store fails.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4

mod api_error;
mod auth;
mod model;
mod routes;
pub mod server;

pub use server::{new, router};
