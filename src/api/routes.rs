use crate::access::AllowList;
use crate::api::api_error::APIError;
use crate::api::auth::{self, AuthorizedUpdate};
use crate::api::model::{
    valid_subdomain, valid_txt, RegisterRequest, RegisterResult, UpdateRecordResult,
};
use crate::api::server::AppState;
use crate::credential::Registration;
use crate::error::Error;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use serde_json::json;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub(super) fn new(state: AppState) -> Router {
    let mut router = Router::new().route("/health", get(health_check)).route(
        "/update",
        post(update).route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        )),
    );
    if !state.config.disable_registration {
        router = router.route("/register", post(register));
    }
    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse, APIError> {
    state.credential_store.lock().await.ping().await?;
    Ok(Json(json!({"ok":"healthy"})))
}

async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, APIError> {
    let request: RegisterRequest = if body.is_empty() {
        RegisterRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(Error::MalformedJson)?
    };
    let allow_from = AllowList::parse(&request.allowfrom)?;
    let (registration, credential) = Registration::generate_hashed(allow_from).await?;
    state
        .credential_store
        .lock()
        .await
        .register(credential)
        .await?;
    tracing::info!(
        "registered {} for subdomain \"{}\"",
        registration.username,
        registration.subdomain
    );
    Ok((
        StatusCode::CREATED,
        Json(RegisterResult {
            username: registration.username,
            password: registration.secret,
            fulldomain: state.config.full_domain(&registration.subdomain),
            subdomain: registration.subdomain,
            allowfrom: registration.allow_from,
        }),
    ))
}

async fn update(
    State(state): State<AppState>,
    Extension(update): Extension<AuthorizedUpdate>,
) -> Result<Json<UpdateRecordResult>, APIError> {
    let AuthorizedUpdate { username, payload } = update;

    if !valid_subdomain(&payload.subdomain) {
        tracing::debug!("rejected update from {username}: bad subdomain");
        return Err(Error::InvalidSubdomain(payload.subdomain).into());
    }
    if !valid_txt(&payload.txt) {
        tracing::debug!("rejected update from {username}: bad TXT value");
        return Err(Error::InvalidDNS01.into());
    }

    let result = state
        .credential_store
        .lock()
        .await
        .update_challenge(&payload.subdomain, &payload.txt)
        .await;
    if let Err(err) = result {
        tracing::error!("updating TXT for \"{}\" failed: {err}", payload.subdomain);
        return Err(Error::UpdateFailed(Box::new(err)).into());
    }

    tracing::info!(
        "accepted update from {username} for \"{}\"",
        state.config.full_domain(&payload.subdomain)
    );
    Ok(Json(UpdateRecordResult { txt: payload.txt }))
}
