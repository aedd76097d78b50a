mod common;

use acme_delegate::credential::Registration;
use acme_delegate::dns::server::{handler, serve};
use acme_delegate::{AllowList, DynCredentialStore, OwnChallenge, SqliteCredentialStore};
use common::{config, memory_store, VALID_TXT};
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;

struct TestServer {
    addr: SocketAddr,
    own_challenge: OwnChallenge,
}

async fn start(store: DynCredentialStore) -> TestServer {
    let config = config();
    let own_challenge: OwnChallenge = Arc::new(RwLock::new(config.own_challenge.clone()));
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let handler = handler(&config, store, own_challenge.clone()).unwrap();
    let mut server = serve(handler, Some(socket), None, config.dns_tcp_timeout).unwrap();
    tokio::spawn(async move { server.block_until_done().await });
    TestServer {
        addr,
        own_challenge,
    }
}

fn query(name: &str, record_type: RecordType) -> Message {
    let mut message = Message::new();
    message
        .set_id(4242)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .add_query(Query::query(Name::from_str(name).unwrap(), record_type));
    message
}

async fn exchange(server: &TestServer, message: &Message) -> Message {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket
        .send_to(&message.to_vec().unwrap(), server.addr)
        .await
        .unwrap();
    let mut buf = [0u8; 4096];
    let (len, _) = timeout(Duration::from_secs(5), socket.recv_from(&mut buf))
        .await
        .expect("no response from DNS server")
        .unwrap();
    let response = Message::from_vec(&buf[..len]).unwrap();
    assert_eq!(response.id(), message.id());
    response
}

fn txt_values(message: &Message) -> Vec<String> {
    message
        .answers()
        .iter()
        .filter_map(|r| match r.data() {
            Some(RData::TXT(txt)) => Some(txt.to_string()),
            _ => None,
        })
        .collect()
}

async fn updated_subdomain(store: &DynCredentialStore) -> String {
    let (registration, credential) = Registration::generate_hashed(AllowList::default())
        .await
        .unwrap();
    let mut store = store.lock().await;
    store.register(credential).await.unwrap();
    store
        .update_challenge(&registration.subdomain, VALID_TXT)
        .await
        .unwrap();
    registration.subdomain
}

async fn assert_serves_updated_txt(store: DynCredentialStore) {
    let subdomain = updated_subdomain(&store).await;
    let server = start(store).await;

    let response = exchange(
        &server,
        &query(&format!("{subdomain}.auth.example.org."), RecordType::TXT),
    )
    .await;
    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert!(response.authoritative());
    assert_eq!(txt_values(&response), [VALID_TXT]);
    assert_eq!(response.answers()[0].ttl(), 1);
    assert!(response.name_servers().is_empty());
}

#[tokio::test]
async fn updated_txt_is_served_from_memory_store() {
    assert_serves_updated_txt(memory_store()).await;
}

#[tokio::test]
async fn updated_txt_is_served_from_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteCredentialStore::open(dir.path().join("store.db")).unwrap();
    assert_serves_updated_txt(Arc::new(Mutex::new(store))).await;
}

#[tokio::test]
async fn unrelated_name_is_nxdomain_without_authority() {
    let server = start(memory_store()).await;
    let response = exchange(&server, &query("www.unrelated.test.", RecordType::TXT)).await;
    assert_eq!(response.response_code(), ResponseCode::NXDomain);
    assert!(!response.authoritative());
    assert!(response.answers().is_empty());
    assert!(response.name_servers().is_empty());
}

#[tokio::test]
async fn empty_answer_in_zone_carries_soa() {
    let server = start(memory_store()).await;
    let response = exchange(
        &server,
        &query("not-registered.auth.example.org.", RecordType::TXT),
    )
    .await;
    assert_eq!(response.response_code(), ResponseCode::NXDomain);
    assert!(response.authoritative());
    assert_eq!(response.name_servers().len(), 1);
    assert_eq!(response.name_servers()[0].record_type(), RecordType::SOA);
}

#[tokio::test]
async fn own_challenge_is_answered() {
    let server = start(memory_store()).await;
    let message = query("_acme-challenge.auth.example.org.", RecordType::TXT);

    let response = exchange(&server, &message).await;
    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert_eq!(txt_values(&response), ["own-challenge-value"]);

    *server.own_challenge.write().await = VALID_TXT.to_string();
    let response = exchange(&server, &message).await;
    assert_eq!(txt_values(&response), [VALID_TXT]);
}

#[tokio::test]
async fn static_records_are_answered() {
    let server = start(memory_store()).await;

    let response = exchange(&server, &query("ns1.auth.example.org.", RecordType::A)).await;
    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert!(response.authoritative());
    assert_eq!(response.answers().len(), 1);

    let response = exchange(&server, &query("auth.example.org.", RecordType::SOA)).await;
    assert_eq!(response.answers().len(), 1);
    assert_eq!(response.answers()[0].record_type(), RecordType::SOA);
}

#[tokio::test]
async fn edns_is_negotiated() {
    let server = start(memory_store()).await;
    let mut message = query("auth.example.org.", RecordType::NS);
    let mut edns = Edns::new();
    edns.set_max_payload(4096);
    message.set_edns(edns);

    let response = exchange(&server, &message).await;
    assert_eq!(response.response_code(), ResponseCode::NoError);
    let edns = response.extensions().as_ref().expect("response without OPT");
    assert_eq!(edns.max_payload(), 512);
    assert_eq!(edns.version(), 0);
}

#[tokio::test]
async fn unsupported_edns_version_is_badvers() {
    let server = start(memory_store()).await;
    let mut message = query("auth.example.org.", RecordType::NS);
    let mut edns = Edns::new();
    edns.set_version(1);
    message.set_edns(edns);

    let response = exchange(&server, &message).await;
    // BADVERS and BADSIG share the value 16; the decoder names it BADSIG.
    assert_eq!(
        u16::from(response.response_code()),
        u16::from(ResponseCode::BADVERS)
    );
    assert!(response.answers().is_empty());
    let edns = response.extensions().as_ref().expect("response without OPT");
    assert_eq!(edns.version(), 0);
    assert_eq!(edns.max_payload(), 512);
}

#[tokio::test]
async fn non_query_opcode_is_not_implemented() {
    let server = start(memory_store()).await;
    let mut message = query("auth.example.org.", RecordType::SOA);
    message.set_op_code(OpCode::Status);

    let response = exchange(&server, &message).await;
    assert_eq!(response.response_code(), ResponseCode::NotImp);
    assert!(response.answers().is_empty());
}
