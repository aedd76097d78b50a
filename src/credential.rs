//! Credential lifecycle: identity, secret and subdomain generation, secret hashing and
//! verification.
use crate::access::AllowList;
use crate::error::Error;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

/// bcrypt work factor for stored secret hashes.
pub const SECRET_HASH_COST: u32 = 10;

/// Length of a generated secret: 30 random bytes, URL-safe BASE64 encoded.
pub const SECRET_LEN: usize = 40;

const SECRET_BYTES: usize = 30;

// A bcrypt hash no generated secret verifies against. Authenticating an unknown username checks
// the presented secret against this so the attempt costs the same as a wrong secret.
pub(crate) const PLACEHOLDER_SECRET_HASH: &str =
    "$2a$10$8JEFVNYYhLoBysjAxe2yBuXrkDojBQBkVpXEQgyQyjn43SvJ4vL36";

/// A stored credential. The secret is only known by its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: Uuid,
    pub secret_hash: String,
    pub subdomain: String,
    pub allow_from: AllowList,
}

/// A freshly registered credential, the only place the plaintext secret ever exists.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: Uuid,
    pub secret: String,
    pub subdomain: String,
    pub allow_from: AllowList,
}

impl Registration {
    /// Generate a new random username, secret and subdomain.
    #[must_use]
    pub fn generate(allow_from: AllowList) -> Self {
        Self {
            username: Uuid::new_v4(),
            secret: generate_secret(),
            subdomain: Uuid::new_v4().to_string(),
            allow_from,
        }
    }

    /// The storable form of this registration, with the secret replaced by its bcrypt hash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecretHash`] if hashing fails.
    pub fn credential(&self) -> Result<Credential, Error> {
        Ok(Credential {
            username: self.username,
            secret_hash: bcrypt::hash(&self.secret, SECRET_HASH_COST)?,
            subdomain: self.subdomain.clone(),
            allow_from: self.allow_from.clone(),
        })
    }

    /// Generate a registration together with its [`Credential`], hashing the secret on the
    /// blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecretHash`] if hashing fails, or [`Error::BlockingTask`] if the hashing
    /// task panicked.
    pub async fn generate_hashed(allow_from: AllowList) -> Result<(Self, Credential), Error> {
        tokio::task::spawn_blocking(move || -> Result<(Self, Credential), Error> {
            let registration = Self::generate(allow_from);
            let credential = registration.credential()?;
            Ok((registration, credential))
        })
        .await?
    }
}

fn generate_secret() -> String {
    let mut raw = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut raw);
    URL_SAFE.encode(raw)
}

/// Check a presented secret against a stored bcrypt hash. Malformed hashes never match.
#[must_use]
pub fn secret_matches(secret: &str, secret_hash: &str) -> bool {
    bcrypt::verify(secret, secret_hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_is_url_safe() {
        let registration = Registration::generate(AllowList::default());
        assert_eq!(registration.secret.len(), SECRET_LEN);
        assert!(registration
            .secret
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn identities_are_distinct_uuids() {
        let registration = Registration::generate(AllowList::default());
        assert_ne!(registration.username.to_string(), registration.subdomain);
        assert!(Uuid::parse_str(&registration.subdomain).is_ok());
    }

    #[test]
    fn hashed_secret_verifies() {
        let registration = Registration::generate(AllowList::default());
        let credential = registration.credential().unwrap();
        assert_ne!(credential.secret_hash, registration.secret);
        assert!(secret_matches(&registration.secret, &credential.secret_hash));
        assert!(!secret_matches("wrong", &credential.secret_hash));
    }

    #[test]
    fn placeholder_hash_rejects_generated_secrets() {
        let registration = Registration::generate(AllowList::default());
        assert!(!secret_matches(&registration.secret, PLACEHOLDER_SECRET_HASH));
        assert!(!secret_matches("anything", "not a bcrypt hash"));
    }

    #[tokio::test]
    async fn generate_hashed_pairs_secret_with_its_hash() {
        let allow_from = AllowList::parse(&["192.0.2.0/24"]).unwrap();
        let (registration, credential) = Registration::generate_hashed(allow_from.clone())
            .await
            .unwrap();
        assert_eq!(credential.username, registration.username);
        assert_eq!(credential.subdomain, registration.subdomain);
        assert_eq!(credential.allow_from, allow_from);
        assert!(secret_matches(&registration.secret, &credential.secret_hash));
    }
}
