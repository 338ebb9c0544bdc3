//! Signed, time-limited identity tokens.
//!
//! Tokens use the compact JWT layout `header.claims.signature`, each part
//! base64url without padding, signed with HMAC-SHA256 over `header.claims`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{ Duration, Utc };
use hmac::{ Hmac, Mac };
use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value };
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";
const RESERVED_CLAIMS: [&str; 3] = ["sub", "iat", "exp"];

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token signing secret is not configured")]
    MissingSecret,
    #[error("malformed token")]
    Malformed,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

pub struct TokenService {
    secret: Option<Vec<u8>>,
    ttl: Duration,
}

impl TokenService {
    /// An empty secret counts as not configured.
    pub fn new(secret: Option<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.filter(|s| !s.trim().is_empty()).map(String::into_bytes),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn issue(&self, subject: &str, claims: Map<String, Value>) -> Result<String, TokenError> {
        self.issue_with_ttl(subject, claims, self.ttl)
    }

    /// Reserved names (`sub`, `iat`, `exp`) in `claims` are ignored.
    pub fn issue_with_ttl(
        &self,
        subject: &str,
        mut claims: Map<String, Value>,
        ttl: Duration
    ) -> Result<String, TokenError> {
        let secret = self.secret.as_deref().ok_or(TokenError::MissingSecret)?;
        for reserved in RESERVED_CLAIMS {
            claims.remove(reserved);
        }

        let now = Utc::now().timestamp();
        let body = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now + ttl.num_seconds(),
            extra: claims,
        };
        let header = Header { alg: ALGORITHM.to_string(), typ: "JWT".to_string() };

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&body)?)
        );
        let signature = sign(secret, &signing_input).finalize().into_bytes();
        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let secret = self.secret.as_deref().ok_or(TokenError::MissingSecret)?;

        let parts: Vec<&str> = token.split('.').collect();
        let [header_b64, claims_b64, signature_b64] = parts[..] else {
            return Err(TokenError::Malformed);
        };

        let header: Header = decode_segment(header_b64)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::Malformed);
        }

        let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|_| TokenError::Malformed)?;
        let signing_input = format!("{}.{}", header_b64, claims_b64);
        sign(secret, &signing_input)
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = decode_segment(claims_b64)?;
        if Utc::now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

/// Token lifetime for a configured hour count, or `None` when it does not fit a `Duration`.
pub fn ttl_from_hours(hours: u64) -> Option<Duration> {
    i64::try_from(hours).ok().and_then(Duration::try_hours)
}

fn sign(secret: &[u8], input: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(input.as_bytes());
    mac
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}
