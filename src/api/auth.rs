//! Authentication and authorization of [`/update`][crate::api#update-post] requests.
//!
//! Every attempt performs exactly one bcrypt verification, whether or not the presented
//! username resolved to a credential. Unknown or malformed usernames are checked against a
//! placeholder hash that nothing verifies against, so response latency doesn't reveal which
//! usernames exist. Keep this property when changing [`authenticate`].
use crate::access::forwarded_addresses;
use crate::api::api_error::APIError;
use crate::api::model::{valid_key, UpdateRecordRequest};
use crate::api::server::AppState;
use crate::credential::{secret_matches, Credential, PLACEHOLDER_SECRET_HASH};
use crate::error::Error;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use uuid::Uuid;

pub(super) const API_USER_HEADER: &str = "X-Api-User";
pub(super) const API_KEY_HEADER: &str = "X-Api-Key";

/// An update that passed [`authenticate`], attached to the request extensions.
#[derive(Debug, Clone)]
pub(super) struct AuthorizedUpdate {
    pub username: Uuid,
    pub payload: UpdateRecordRequest,
}

/// Why an update was refused. Only ever logged: clients see a generic `forbidden`.
#[derive(thiserror::Error, Debug)]
enum Rejection {
    #[error("missing or malformed X-Api-User header")]
    MalformedUsername,
    #[error("missing or malformed X-Api-Key header for {0}")]
    MalformedKey(Uuid),
    #[error("unknown username {0}")]
    UnknownUsername(Uuid),
    #[error("credential lookup for {0} failed: {1}")]
    LookupFailed(Uuid, Error),
    #[error("wrong secret for {0}")]
    WrongSecret(Uuid),
    #[error("update for {0} not allowed from {1}")]
    NetworkNotAllowed(Uuid, String),
    #[error("subdomain mismatch for {username}: expected \"{expected}\", found \"{found}\"")]
    SubdomainMismatch {
        username: Uuid,
        expected: String,
        found: String,
    },
}

/// Middleware guarding the update route.
///
/// Resolves the credential named by the `X-Api-User`/`X-Api-Key` headers, checks the caller's
/// address against its allow list, decodes the body and requires its `subdomain` to be the
/// credential's own. On success the [`AuthorizedUpdate`] is handed to the next handler; any
/// failure responds `401 {"error":"forbidden"}`.
pub(super) async fn authenticate(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next<Body>,
) -> Response {
    match authorize(&state, peer, request).await {
        Ok(request) => next.run(request).await,
        Err(rejection) => {
            tracing::warn!("rejected update from {peer}: {rejection}");
            APIError::from(Error::Forbidden).into_response()
        }
    }
}

async fn authorize(
    state: &AppState,
    peer: SocketAddr,
    request: Request<Body>,
) -> Result<Request<Body>, Rejection> {
    let (parts, body) = request.into_parts();
    let credential = verify_credential(state, &parts.headers).await?;

    let caller = caller_addresses(state, &parts.headers, peer);
    let permitted = if state.config.use_header {
        credential
            .allow_from
            .permits_any(&forwarded_addresses(&caller))
    } else {
        credential.allow_from.permits(peer.ip())
    };
    if !permitted {
        return Err(Rejection::NetworkNotAllowed(credential.username, caller));
    }

    let bytes = match hyper::body::to_bytes(body).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!("reading update body failed: {err}");
            Default::default()
        }
    };
    let payload = UpdateRecordRequest::decode(&bytes);
    if payload.subdomain != credential.subdomain {
        return Err(Rejection::SubdomainMismatch {
            username: credential.username,
            expected: credential.subdomain,
            found: payload.subdomain,
        });
    }

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(AuthorizedUpdate {
        username: credential.username,
        payload,
    });
    Ok(request)
}

async fn verify_credential(state: &AppState, headers: &HeaderMap) -> Result<Credential, Rejection> {
    let secret = header_value(headers, API_KEY_HEADER).to_string();
    let resolved = match Uuid::parse_str(header_value(headers, API_USER_HEADER)) {
        Err(_) => Err(Rejection::MalformedUsername),
        Ok(username) if !valid_key(&secret) => Err(Rejection::MalformedKey(username)),
        Ok(username) => match state.credential_store.lock().await.lookup(username).await {
            Ok(credential) => Ok(credential),
            Err(Error::UnknownUsername(_)) => Err(Rejection::UnknownUsername(username)),
            Err(err) => Err(Rejection::LookupFailed(username, err)),
        },
    };

    let secret_hash = resolved
        .as_ref()
        .map_or(PLACEHOLDER_SECRET_HASH, |credential| {
            credential.secret_hash.as_str()
        })
        .to_string();
    let secret_ok = verify_secret(secret, secret_hash).await;

    let credential = resolved?;
    if !secret_ok {
        return Err(Rejection::WrongSecret(credential.username));
    }
    Ok(credential)
}

// A bcrypt verification blocks for tens of milliseconds.
async fn verify_secret(secret: String, secret_hash: String) -> bool {
    tokio::task::spawn_blocking(move || secret_matches(&secret, &secret_hash))
        .await
        .unwrap_or(false)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// The caller as used for the network check: the configured forwarding header when
/// `use_header` is set, otherwise the peer address.
fn caller_addresses(state: &AppState, headers: &HeaderMap, peer: SocketAddr) -> String {
    if state.config.use_header {
        header_value(headers, &state.config.header_name).to_string()
    } else {
        peer.ip().to_string()
    }
}
