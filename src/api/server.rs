use crate::api::routes;
use crate::config::SharedConfig;
use crate::credential_store::DynCredentialStore;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;

#[derive(Clone)]
pub(super) struct AppState {
    pub config: SharedConfig,
    pub credential_store: DynCredentialStore,
}

/// The API [`Router`], with its state applied.
///
/// Handlers read the caller address from [`ConnectInfo<SocketAddr>`][axum::extract::ConnectInfo],
/// so the router must be served with
/// [`into_make_service_with_connect_info`][Router::into_make_service_with_connect_info].
pub fn router(config: SharedConfig, credential_store: DynCredentialStore) -> Router {
    routes::new(AppState {
        config,
        credential_store,
    })
}

/// Bind [`Config::api_bind_addr`][crate::config::Config::api_bind_addr] and return the server
/// future.
///
/// # Errors
///
/// Returns an error if the address can't be bound.
pub fn new(
    config: SharedConfig,
    credential_store: DynCredentialStore,
) -> hyper::Result<impl Future<Output = hyper::Result<()>>> {
    let server = axum::Server::try_bind(&config.api_bind_addr)?.serve(
        router(config.clone(), credential_store)
            .into_make_service_with_connect_info::<SocketAddr>(),
    );
    tracing::info!("API listening on {}", server.local_addr());
    Ok(server)
}
