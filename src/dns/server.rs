use crate::config::SharedConfig;
use crate::credential_store::DynCredentialStore;
use crate::dns::handlers::Handler;
use crate::dns::responder::Responder;
use crate::dns::zone::Zone;
use crate::dns::OwnChallenge;
use crate::error::Error;
use hickory_server::ServerFuture;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};

/// Bind the configured DNS listeners and start serving.
///
/// # Errors
///
/// Returns [`Error::IO`] if a listener can't be bound, [`Error::DNSError`] if the zone can't be
/// built from the config, and [`Error::NoDnsListener`] if no listener is configured.
pub async fn new(
    config: SharedConfig,
    credential_store: DynCredentialStore,
    own_challenge: OwnChallenge,
) -> Result<ServerFuture<Handler>, Error> {
    let handler = handler(&config, credential_store, own_challenge)?;
    let udp_socket = match config.dns_udp_bind_addr {
        Some(addr) => Some(UdpSocket::bind(addr).await?),
        None => None,
    };
    let tcp_listener = match config.dns_tcp_bind_addr {
        Some(addr) => Some(TcpListener::bind(addr).await?),
        None => None,
    };
    serve(handler, udp_socket, tcp_listener, config.dns_tcp_timeout)
}

/// Build the request [`Handler`] answering for the configured zone.
///
/// # Errors
///
/// Returns [`Error::DNSError`] if the zone can't be built from the config.
pub fn handler(
    config: &SharedConfig,
    credential_store: DynCredentialStore,
    own_challenge: OwnChallenge,
) -> Result<Handler, Error> {
    let zone = Zone::from_config(config)?;
    Ok(Handler::new(Responder::new(
        zone,
        credential_store,
        own_challenge,
    )))
}

/// Serve `handler` on already bound sockets. At least one of them must be given.
///
/// # Errors
///
/// Returns [`Error::NoDnsListener`] if neither socket is given, or [`Error::IO`] if a socket's
/// local address can't be read.
pub fn serve(
    handler: Handler,
    udp_socket: Option<UdpSocket>,
    tcp_listener: Option<TcpListener>,
    tcp_timeout: Duration,
) -> Result<ServerFuture<Handler>, Error> {
    if udp_socket.is_none() && tcp_listener.is_none() {
        return Err(Error::NoDnsListener);
    }
    let mut dns_server = ServerFuture::new(handler);
    if let Some(socket) = udp_socket {
        tracing::info!("DNS listening on UDP {}", socket.local_addr()?);
        dns_server.register_socket(socket);
    }
    if let Some(listener) = tcp_listener {
        tracing::info!("DNS listening on TCP {}", listener.local_addr()?);
        dns_server.register_listener(listener, tcp_timeout);
    }
    Ok(dns_server)
}
