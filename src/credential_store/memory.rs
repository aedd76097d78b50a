use crate::credential::Credential;
use crate::credential_store::{next_update_timestamp, CredentialStore};
use crate::error::Error;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default, Debug, Clone, PartialEq, Eq)]
struct TxtSlot {
    value: String,
    last_update: i64,
}

/// A non-durable [`CredentialStore`]. Every subdomain owns a fixed pair of slots; the slot with
/// the smallest update timestamp (lowest index on ties) is the oldest.
#[derive(Default, Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct InMemoryCredentialStore {
    credentials: HashMap<Uuid, Credential>,
    txt_slots: HashMap<String, [TxtSlot; 2]>,
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn register(&mut self, credential: Credential) -> Result<(), Error> {
        self.txt_slots
            .insert(credential.subdomain.clone(), Default::default());
        self.credentials.insert(credential.username, credential);
        Ok(())
    }

    async fn lookup(&mut self, username: Uuid) -> Result<Credential, Error> {
        self.credentials
            .get(&username)
            .cloned()
            .ok_or(Error::UnknownUsername(username))
    }

    async fn challenge_values(&mut self, subdomain: &str) -> Result<Vec<String>, Error> {
        Ok(self.txt_slots.get(subdomain).map_or(Vec::default(), |slots| {
            slots
                .iter()
                .filter(|slot| !slot.value.is_empty())
                .map(|slot| slot.value.clone())
                .collect()
        }))
    }

    async fn update_challenge(&mut self, subdomain: &str, value: &str) -> Result<(), Error> {
        let Some(slots) = self.txt_slots.get_mut(subdomain) else {
            return Ok(());
        };
        let newest = slots.iter().map(|slot| slot.last_update).max().unwrap_or(0);
        // min_by_key keeps the first of equal keys, i.e. the lowest index.
        if let Some(oldest) = slots.iter_mut().min_by_key(|slot| slot.last_update) {
            oldest.value = value.to_string();
            oldest.last_update = next_update_timestamp(newest);
        }
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
