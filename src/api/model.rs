use crate::access::AllowList;
use crate::credential::SECRET_LEN;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Length of an [RFC-8555][RFC-8555] [DNS-01] challenge response: a SHA-256 digest, unpadded
/// URL-safe BASE64 encoded.
///
/// [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
/// [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
const DNS01_LEN: usize = 43;

const MAX_LABEL_LEN: usize = 63;

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct RegisterRequest {
    #[serde(default)]
    pub allowfrom: Vec<String>,
}

#[derive(Serialize, Debug, Clone)]
pub(super) struct RegisterResult {
    pub username: Uuid,
    pub password: String,
    pub fulldomain: String,
    pub subdomain: String,
    pub allowfrom: AllowList,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub(super) struct UpdateRecordRequest {
    pub subdomain: String,
    pub txt: String,
}

impl UpdateRecordRequest {
    /// Decode an update body one field at a time. A field that is missing, `null` or not a
    /// string is left empty without losing the others, so validation reports what is wrong
    /// with it. A body that isn't JSON at all decodes to the empty request.
    pub(super) fn decode(body: &[u8]) -> Self {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!("JSON decode error: {err}");
                return Self::default();
            }
        };
        let field = |name: &str| match value.get(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                tracing::error!("JSON decode error: \"{name}\" is not a string: {other}");
                String::new()
            }
        };
        Self {
            subdomain: field("subdomain"),
            txt: field("txt"),
        }
    }
}

#[derive(Serialize, Debug, Clone, Default, Eq, PartialEq)]
pub(super) struct UpdateRecordResult {
    pub txt: String,
}

fn base64url_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// A single DNS label: 1 to 63 ASCII letters, digits and `-`, starting and ending with a
/// letter or digit.
pub(super) fn valid_subdomain(s: &str) -> bool {
    let (Some(first), Some(last)) = (s.chars().next(), s.chars().next_back()) else {
        return false;
    };
    s.len() <= MAX_LABEL_LEN
        && first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Exactly 43 characters of the unpadded URL-safe BASE64 alphabet.
pub(super) fn valid_txt(s: &str) -> bool {
    s.chars().count() == DNS01_LEN && s.chars().all(base64url_char)
}

/// Exactly 40 characters of the URL-safe BASE64 alphabet, the shape of a generated secret.
pub(super) fn valid_key(s: &str) -> bool {
    s.chars().count() == SECRET_LEN && s.chars().all(base64url_char)
}
