#![allow(dead_code)]
use acme_delegate::{Config, DynCredentialStore, InMemoryCredentialStore, SharedConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DOMAIN: &str = "auth.example.org";
pub const VALID_TXT: &str = "LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo";

pub fn config_value() -> Value {
    json!({
        "domain": DOMAIN,
        "ns_domain": "ns1.auth.example.org",
        "ns_admin": "admin@example.org",
        "api_bind_addr": "127.0.0.1:0",
        "api_timeout": 5,
        "dns_udp_bind_addr": "127.0.0.1:0",
        "dns_tcp_timeout": 5,
        "own_challenge": "own-challenge-value",
        "addrs": { "ns1.auth.example.org": ["192.0.2.53"] },
        "ns_records": { "auth.example.org": ["ns1.auth.example.org"] },
    })
}

pub fn config_from(value: Value) -> SharedConfig {
    let config: Config = serde_json::from_value(value).unwrap();
    Arc::new(config)
}

pub fn config() -> SharedConfig {
    config_from(config_value())
}

pub fn memory_store() -> DynCredentialStore {
    Arc::new(Mutex::new(InMemoryCredentialStore::default()))
}
