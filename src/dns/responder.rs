use crate::credential_store::DynCredentialStore;
use crate::dns::zone::Zone;
use crate::dns::OwnChallenge;
use hickory_server::proto::op::{LowerQuery, ResponseCode};
use hickory_server::proto::rr::rdata::TXT;
use hickory_server::proto::rr::{LowerName, Name, RData, Record, RecordType};
use std::sync::Arc;

/// TTL of dynamic TXT answers. Challenge values rotate and must not be cached across a rotation.
pub const DYNAMIC_TTL: u32 = 1;

/// The outcome of answering the questions of one query message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub answers: Vec<Record>,
    pub response_code: ResponseCode,
    pub authoritative: bool,
    /// Present for authoritative negative answers.
    pub soa: Option<Record>,
}

/// Answers queries from the static [`Zone`] and the dynamic TXT slots of a
/// [`CredentialStore`][crate::credential_store::CredentialStore].
#[derive(Clone)]
pub struct Responder {
    zone: Arc<Zone>,
    credential_store: DynCredentialStore,
    own_challenge: OwnChallenge,
}

impl Responder {
    #[must_use]
    pub fn new(zone: Zone, credential_store: DynCredentialStore, own_challenge: OwnChallenge) -> Self {
        Responder {
            zone: Arc::new(zone),
            credential_store,
            own_challenge,
        }
    }

    /// Answer every question. The response is authoritative if any question was, and an
    /// authoritative `NXDOMAIN` carries the zone's SOA in the authority section.
    pub async fn resolve(&self, queries: &[LowerQuery]) -> Resolution {
        let mut resolution = Resolution {
            answers: Vec::default(),
            response_code: ResponseCode::NoError,
            authoritative: false,
            soa: None,
        };
        for query in queries {
            let (answers, response_code, authoritative) = self.answer(query).await;
            resolution.answers.extend(answers);
            resolution.response_code = response_code;
            resolution.authoritative |= authoritative;
        }
        if resolution.authoritative && resolution.response_code == ResponseCode::NXDomain {
            resolution.soa = Some(self.zone.soa().clone());
        }
        resolution
    }

    async fn answer(&self, query: &LowerQuery) -> (Vec<Record>, ResponseCode, bool) {
        let name = query.name();
        let authoritative = self.zone.is_authoritative(name);
        let own_challenge = self.zone.is_own_challenge(name);
        let mut response_code = if own_challenge || self.zone.answering_for(name) {
            ResponseCode::NoError
        } else {
            ResponseCode::NXDomain
        };

        let mut answers = self.zone.lookup(name, query.query_type());
        if query.query_type() == RecordType::TXT {
            if own_challenge {
                answers.push(self.own_challenge_txt(name).await);
            } else {
                answers.extend(self.dynamic_txt(name).await);
            }
        }
        if !answers.is_empty() {
            response_code = ResponseCode::NoError;
        }

        tracing::debug!(
            "answering {} {} with {} ({} records)",
            query.query_type(),
            name,
            response_code,
            answers.len()
        );
        (answers, response_code, authoritative)
    }

    async fn own_challenge_txt(&self, name: &LowerName) -> Record {
        let value = self.own_challenge.read().await.clone();
        txt_record(name, value)
    }

    async fn dynamic_txt(&self, name: &LowerName) -> Vec<Record> {
        let subdomain = first_label(name);
        if subdomain.is_empty() {
            return Vec::default();
        }
        let values = self
            .credential_store
            .lock()
            .await
            .challenge_values(&subdomain)
            .await;
        match values {
            Ok(values) => values
                .into_iter()
                .map(|value| txt_record(name, value))
                .collect(),
            Err(err) => {
                tracing::error!("reading TXT values for \"{subdomain}\" failed: {err}");
                Vec::default()
            }
        }
    }
}

fn txt_record(name: &LowerName, value: String) -> Record {
    Record::from_rdata(name.into(), DYNAMIC_TTL, RData::TXT(TXT::new(vec![value])))
}

fn first_label(name: &LowerName) -> String {
    Name::from(name)
        .iter()
        .next()
        .map(|label| String::from_utf8_lossy(label).to_ascii_lowercase())
        .unwrap_or_default()
}
