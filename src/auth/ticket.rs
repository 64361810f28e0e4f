//! Encrypted, self-expiring session tickets.
//!
//! A ticket is the plaintext `uuid|user_data|expiry` encrypted with AES in
//! CFB mode and hex encoded. The uuid is a random v4 identifier and the expiry
//! an RFC 3339 UTC timestamp with second precision. The server keeps no
//! session state: whoever holds the key can verify any ticket.

use std::fmt;

use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use base64::prelude::{Engine as _, BASE64_STANDARD};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::password::{self, PasswordError};
use crate::filter::Filter;
use crate::request::Request;
use crate::response::Response;

/// Two weeks.
pub const DEFAULT_EXPIRY_MINUTES: i64 = 20_160;

pub const DEFAULT_BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

const IV_LEN: usize = 16;

/// How the cipher initialization vector is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketMode {
    /// IV is the first 16 key bytes; every ticket shares it. Compatible with
    /// tickets issued by earlier deployments.
    #[default]
    KeyDerivedIv,
    /// Fresh random IV per ticket, prepended to the ciphertext. Tickets are
    /// not interchangeable with [`TicketMode::KeyDerivedIv`].
    RandomIv,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TicketError {
    #[error("ticket key must be 16, 24 or 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    /// A `|` in user data would split the ticket into too many fields
    #[error("user data must not contain '|'")]
    InvalidUserData,

    #[error("ticket expiry must be a positive number of minutes, got {0}")]
    InvalidExpiry(i64),

    #[error("cipher error: {0}")]
    Cipher(String),
}

/// Ticket codec settings; the key never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct TicketConfig {
    pub key: Vec<u8>,
    pub expiry_minutes: i64,
    pub mode: TicketMode,
    pub bcrypt_cost: u32,
    /// Dedicated header carrying the raw ticket, checked after `Authorization`
    pub header: Option<String>,
}

impl fmt::Debug for TicketConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketConfig")
            .field("key", &format_args!("<{} bytes>", self.key.len()))
            .field("expiry_minutes", &self.expiry_minutes)
            .field("mode", &self.mode)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("header", &self.header)
            .finish()
    }
}

impl TicketConfig {
    /// Defaults for everything but the key.
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            expiry_minutes: DEFAULT_EXPIRY_MINUTES,
            mode: TicketMode::default(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            header: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: TicketMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_expiry_minutes(mut self, minutes: i64) -> Self {
        self.expiry_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }
}

/// Why a ticket was rejected. Logged at debug level only; callers just see `None`.
#[derive(Debug)]
enum Rejection {
    Empty,
    NotHex,
    TooShort,
    Cipher,
    NotUtf8,
    FieldCount(usize),
    BadExpiry,
    Expired(DateTime<Utc>),
}

/// Issues and verifies session tickets with a server-held key.
#[derive(Clone)]
pub struct TicketCodec {
    config: TicketConfig,
}

impl fmt::Debug for TicketCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketCodec")
            .field("config", &self.config)
            .finish()
    }
}

impl TicketCodec {
    /// # Errors
    ///
    /// [`TicketError::InvalidKeyLength`] unless the key is 16, 24 or 32 bytes.
    pub fn new(config: TicketConfig) -> Result<Self, TicketError> {
        match config.key.len() {
            16 | 24 | 32 => Ok(Self { config }),
            n => Err(TicketError::InvalidKeyLength(n)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &TicketConfig {
        &self.config
    }

    /// Issue a ticket for `user_data` with the configured default expiry.
    ///
    /// # Errors
    ///
    /// See [`TicketCodec::generate_token`].
    pub fn signin(&self, user_data: &str) -> Result<String, TicketError> {
        self.generate_token(user_data, self.config.expiry_minutes)
    }

    /// Issue a ticket for `user_data` expiring `expiry_minutes` from now.
    ///
    /// # Errors
    ///
    /// [`TicketError::InvalidUserData`] when `user_data` contains `|` and
    /// [`TicketError::InvalidExpiry`] for a non-positive or overflowing expiry.
    pub fn generate_token(&self, user_data: &str, expiry_minutes: i64) -> Result<String, TicketError> {
        self.generate_token_at(user_data, expiry_minutes, Utc::now())
    }

    /// [`TicketCodec::generate_token`] with an explicit issue time.
    ///
    /// # Errors
    ///
    /// As for [`TicketCodec::generate_token`].
    pub fn generate_token_at(
        &self,
        user_data: &str,
        expiry_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<String, TicketError> {
        if user_data.contains('|') {
            return Err(TicketError::InvalidUserData);
        }
        if expiry_minutes <= 0 {
            return Err(TicketError::InvalidExpiry(expiry_minutes));
        }
        let expiry = Duration::try_minutes(expiry_minutes)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or(TicketError::InvalidExpiry(expiry_minutes))?;

        let plaintext = format!(
            "{}|{}|{}",
            random_uuid(),
            user_data,
            expiry.to_rfc3339_opts(SecondsFormat::Secs, true)
        );

        let mut buf = plaintext.into_bytes();
        let token = match self.config.mode {
            TicketMode::KeyDerivedIv => {
                self.encrypt(self.derived_iv(), &mut buf)?;
                buf
            }
            TicketMode::RandomIv => {
                let mut iv = [0u8; IV_LEN];
                OsRng.fill_bytes(&mut iv);
                self.encrypt(&iv, &mut buf)?;
                let mut out = Vec::with_capacity(IV_LEN + buf.len());
                out.extend_from_slice(&iv);
                out.extend_from_slice(&buf);
                out
            }
        };
        Ok(hex::encode(token))
    }

    /// User data carried by a valid, unexpired ticket.
    ///
    /// Every failure is the same `None`: malformed, undecryptable and expired
    /// tickets are indistinguishable to the caller.
    #[must_use]
    pub fn authenticate_token(&self, token: &str) -> Option<String> {
        self.authenticate_token_at(token, Utc::now())
    }

    /// [`TicketCodec::authenticate_token`] at an explicit instant. A ticket is
    /// rejected from its expiry instant onwards.
    #[must_use]
    pub fn authenticate_token_at(&self, token: &str, now: DateTime<Utc>) -> Option<String> {
        match self.open(token, now) {
            Ok(user_data) => Some(user_data),
            Err(reason) => {
                debug!(reason = ?reason, "Ticket rejected");
                None
            }
        }
    }

    fn open(&self, token: &str, now: DateTime<Utc>) -> Result<String, Rejection> {
        if token.is_empty() {
            return Err(Rejection::Empty);
        }
        let mut bytes = hex::decode(token).map_err(|_| Rejection::NotHex)?;

        let plaintext = match self.config.mode {
            TicketMode::KeyDerivedIv => {
                self.decrypt(self.derived_iv(), &mut bytes)
                    .map_err(|_| Rejection::Cipher)?;
                bytes
            }
            TicketMode::RandomIv => {
                if bytes.len() <= IV_LEN {
                    return Err(Rejection::TooShort);
                }
                let mut body = bytes.split_off(IV_LEN);
                self.decrypt(&bytes, &mut body)
                    .map_err(|_| Rejection::Cipher)?;
                body
            }
        };

        let plaintext = String::from_utf8(plaintext).map_err(|_| Rejection::NotUtf8)?;
        let fields: Vec<&str> = plaintext.split('|').collect();
        let [_, user_data, expiry] = fields.as_slice() else {
            return Err(Rejection::FieldCount(fields.len()));
        };

        let expiry = DateTime::parse_from_rfc3339(expiry)
            .map_err(|_| Rejection::BadExpiry)?
            .with_timezone(&Utc);
        if now >= expiry {
            return Err(Rejection::Expired(expiry));
        }
        Ok((*user_data).to_string())
    }

    /// Fresh bcrypt salt; see [`password::generate_salt`].
    #[must_use]
    pub fn salt(&self) -> String {
        password::generate_salt()
    }

    /// bcrypt hash of `password` with `salt` at the configured cost.
    ///
    /// # Errors
    ///
    /// See [`password::hash_password`].
    pub fn hash(&self, password: &str, salt: &str) -> Result<String, PasswordError> {
        password::hash_password(password, salt, self.config.bcrypt_cost)
    }

    /// Auth filter body: read the ticket from the request and set
    /// [`Request::user_data`].
    ///
    /// Accepted carriers, in order: `Authorization: Basic base64(ticket[:..])`,
    /// `Authorization: Bearer ticket`, then the configured dedicated header.
    /// Returns `None` to let dispatch continue, or a 401 challenge.
    pub fn authenticate(&self, request: &mut Request) -> Option<Response> {
        let user_data = self
            .ticket_from(request)
            .and_then(|ticket| self.authenticate_token(&ticket))
            .filter(|user_data| !user_data.is_empty());

        match user_data {
            Some(user_data) => {
                request.user_data = user_data;
                None
            }
            None => Some(Response::error(401, "Not authenticated").with_header("WWW-Authenticate", "Basic")),
        }
    }

    fn ticket_from(&self, request: &Request) -> Option<String> {
        if let Some(auth) = request.header("authorization") {
            let mut parts = auth.trim().splitn(2, ' ');
            match (parts.next(), parts.next().map(str::trim)) {
                (Some(scheme), Some(credentials)) if scheme.eq_ignore_ascii_case("basic") => {
                    let decoded = BASE64_STANDARD.decode(credentials).ok()?;
                    let decoded = String::from_utf8(decoded).ok()?;
                    return decoded.split(':').next().map(str::to_string);
                }
                (Some(scheme), Some(credentials)) if scheme.eq_ignore_ascii_case("bearer") => {
                    return Some(credentials.to_string());
                }
                _ => {}
            }
        }
        self.config
            .header
            .as_deref()
            .and_then(|name| request.header(name))
            .map(|value| value.trim().to_string())
    }

    fn derived_iv(&self) -> &[u8] {
        &self.config.key[..IV_LEN]
    }

    fn encrypt(&self, iv: &[u8], buf: &mut [u8]) -> Result<(), TicketError> {
        let key = self.config.key.as_slice();
        let cipher_err = |e: aes::cipher::InvalidLength| TicketError::Cipher(e.to_string());
        match key.len() {
            16 => cfb_mode::Encryptor::<aes::Aes128>::new_from_slices(key, iv)
                .map_err(cipher_err)?
                .encrypt(buf),
            24 => cfb_mode::Encryptor::<aes::Aes192>::new_from_slices(key, iv)
                .map_err(cipher_err)?
                .encrypt(buf),
            _ => cfb_mode::Encryptor::<aes::Aes256>::new_from_slices(key, iv)
                .map_err(cipher_err)?
                .encrypt(buf),
        }
        Ok(())
    }

    fn decrypt(&self, iv: &[u8], buf: &mut [u8]) -> Result<(), TicketError> {
        let key = self.config.key.as_slice();
        let cipher_err = |e: aes::cipher::InvalidLength| TicketError::Cipher(e.to_string());
        match key.len() {
            16 => cfb_mode::Decryptor::<aes::Aes128>::new_from_slices(key, iv)
                .map_err(cipher_err)?
                .decrypt(buf),
            24 => cfb_mode::Decryptor::<aes::Aes192>::new_from_slices(key, iv)
                .map_err(cipher_err)?
                .decrypt(buf),
            _ => cfb_mode::Decryptor::<aes::Aes256>::new_from_slices(key, iv)
                .map_err(cipher_err)?
                .decrypt(buf),
        }
        Ok(())
    }
}

/// Pre-phase auth filter; a no-op in the post phase.
impl Filter for TicketCodec {
    fn filter(&self, request: &mut Request, response: Option<&mut Response>) -> Option<Response> {
        match response {
            None => self.authenticate(request),
            Some(_) => None,
        }
    }
}

/// Hyphenated v4 UUID from 128 bits of OS randomness.
fn random_uuid() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use http::Method;

    const KEY: [u8; 16] = [
        0x6c, 0xf8, 0x05, 0x1b, 0x4a, 0xae, 0xc0, 0xa9, 0x7f, 0x47, 0x94, 0x8d, 0x11, 0xdf, 0xe0, 0x0a,
    ];

    fn codec(mode: TicketMode) -> TicketCodec {
        TicketCodec::new(TicketConfig::new(KEY.to_vec()).with_mode(mode)).unwrap()
    }

    #[test]
    fn test_key_lengths() {
        for len in [16, 24, 32] {
            assert!(TicketCodec::new(TicketConfig::new(vec![7u8; len])).is_ok());
        }
        assert_eq!(
            TicketCodec::new(TicketConfig::new(vec![7u8; 10])).unwrap_err(),
            TicketError::InvalidKeyLength(10)
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let text = format!("{:?}", codec(TicketMode::KeyDerivedIv));
        assert!(text.contains("<16 bytes>"));
        assert!(!text.contains("108"));
    }

    #[test]
    fn test_round_trip_before_expiry() {
        for mode in [TicketMode::KeyDerivedIv, TicketMode::RandomIv] {
            let codec = codec(mode);
            let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
            let token = codec.generate_token_at("user-1", 5, now).unwrap();
            assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
            assert_eq!(
                codec.authenticate_token_at(&token, now + Duration::minutes(4)),
                Some("user-1".to_string())
            );
        }
    }

    #[test]
    fn test_rejects_at_and_after_expiry() {
        let codec = codec(TicketMode::KeyDerivedIv);
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let token = codec.generate_token_at("u", 5, now).unwrap();
        let expiry = now + Duration::minutes(5);
        assert_eq!(codec.authenticate_token_at(&token, expiry - Duration::seconds(1)), Some("u".into()));
        assert_eq!(codec.authenticate_token_at(&token, expiry), None);
        assert_eq!(codec.authenticate_token_at(&token, expiry + Duration::days(1)), None);
    }

    #[test]
    fn test_plaintext_layout() {
        let codec = codec(TicketMode::KeyDerivedIv);
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let token = codec.generate_token_at("alice", 60, now).unwrap();

        let mut bytes = hex::decode(token).unwrap();
        codec.decrypt(&KEY, &mut bytes).unwrap();
        let plaintext = String::from_utf8(bytes).unwrap();
        let fields: Vec<&str> = plaintext.split('|').collect();

        assert_eq!(fields.len(), 3);
        let id = uuid::Uuid::parse_str(fields[0]).unwrap();
        assert_eq!(id.get_version_num(), 4);
        assert_eq!(fields[0].len(), 36);
        assert_eq!(fields[1], "alice");
        assert_eq!(fields[2], "2024-01-01T01:00:00Z");
    }

    #[test]
    fn test_key_derived_iv_is_deterministic_per_plaintext_prefix() {
        let codec = codec(TicketMode::KeyDerivedIv);
        let mut a = b"same plaintext".to_vec();
        let mut b = a.clone();
        codec.encrypt(codec.derived_iv(), &mut a).unwrap();
        codec.encrypt(codec.derived_iv(), &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_modes_are_not_interchangeable() {
        let derived = codec(TicketMode::KeyDerivedIv);
        let random = codec(TicketMode::RandomIv);
        let token = random.signin("bob").unwrap();
        assert_eq!(derived.authenticate_token(&token), None);
        assert_eq!(random.authenticate_token(&token), Some("bob".into()));
    }

    #[test]
    fn test_invalid_inputs() {
        let codec = codec(TicketMode::KeyDerivedIv);
        assert_eq!(codec.generate_token("a|b", 5).unwrap_err(), TicketError::InvalidUserData);
        assert_eq!(codec.generate_token("a", 0).unwrap_err(), TicketError::InvalidExpiry(0));
        assert_eq!(codec.generate_token("a", i64::MAX).unwrap_err(), TicketError::InvalidExpiry(i64::MAX));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let codec = codec(TicketMode::KeyDerivedIv);
        assert_eq!(codec.authenticate_token(""), None);
        assert_eq!(codec.authenticate_token("zz"), None);
        assert_eq!(codec.authenticate_token("abc"), None);
        assert_eq!(codec.authenticate_token("00112233445566778899"), None);

        let other = TicketCodec::new(TicketConfig::new(vec![1u8; 16])).unwrap();
        let token = other.signin("mallory").unwrap();
        assert_eq!(codec.authenticate_token(&token), None);
    }

    #[test]
    fn test_authenticate_basic_header() {
        let codec = codec(TicketMode::KeyDerivedIv);
        let token = codec.signin("user-9").unwrap();
        let credentials = BASE64_STANDARD.encode(format!("{token}:ignored"));

        let mut req = Request::new(Method::GET, "/").with_header("Authorization", format!("Basic {credentials}"));
        assert!(codec.authenticate(&mut req).is_none());
        assert_eq!(req.user_data, "user-9");
    }

    #[test]
    fn test_authenticate_bearer_and_dedicated_header() {
        let config = TicketConfig::new(KEY.to_vec()).with_header("X-Ticket");
        let codec = TicketCodec::new(config).unwrap();
        let token = codec.signin("u").unwrap();

        let mut req = Request::new(Method::GET, "/").with_header("Authorization", format!("Bearer {token}"));
        assert!(codec.authenticate(&mut req).is_none());
        assert_eq!(req.user_data, "u");

        let mut req = Request::new(Method::GET, "/").with_header("x-ticket", token);
        assert!(codec.authenticate(&mut req).is_none());
        assert_eq!(req.user_data, "u");
    }

    #[test]
    fn test_authenticate_failure_challenges() {
        let codec = codec(TicketMode::KeyDerivedIv);
        let mut req = Request::new(Method::GET, "/").with_header("Authorization", "Basic !!!");
        let res = codec.authenticate(&mut req).unwrap();
        assert_eq!(res.status, 401);
        assert_eq!(res.get_header("www-authenticate"), Some("Basic"));
        assert!(req.user_data.is_empty());

        let mut req = Request::new(Method::GET, "/");
        assert_eq!(codec.authenticate(&mut req).map(|r| r.status), Some(401));
    }

    #[test]
    fn test_filter_only_acts_in_pre_phase() {
        let codec = codec(TicketMode::KeyDerivedIv);
        let mut req = Request::new(Method::GET, "/");
        let mut res = Response::new(200);
        assert!(codec.filter(&mut req, Some(&mut res)).is_none());
        assert!(codec.filter(&mut req, None).is_some());
    }
}
