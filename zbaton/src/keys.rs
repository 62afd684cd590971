//! CURVE key material.
//!
//! CurveZMQ uses long-term X25519 key pairs:
//! - A server socket carries its own [`KeyPair`] and runs as CURVE server.
//! - A client socket carries its own pair plus the server's [`PublicKey`]
//!   for each endpoint it connects to.
//!
//! Keys are 32 raw bytes; libzmq's text form is 40 characters of Z85.

use rand::rngs::OsRng;
use std::fmt;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};

use crate::error::{Error, Result};

/// CURVE key size in bytes
pub const CURVE_KEY_SIZE: usize = 32;

/// Length of a Z85-encoded key
pub const CURVE_Z85_SIZE: usize = 40;

fn decode_z85(text: &str) -> Result<[u8; CURVE_KEY_SIZE]> {
    if text.len() != CURVE_Z85_SIZE {
        return Err(Error::crypto(format!(
            "Z85 key must be {CURVE_Z85_SIZE} characters, got {}",
            text.len()
        )));
    }
    let raw = zmq::z85_decode(text).map_err(|e| Error::crypto(format!("invalid Z85 key: {e}")))?;
    key_bytes(&raw)
}

fn key_bytes(raw: &[u8]) -> Result<[u8; CURVE_KEY_SIZE]> {
    <[u8; CURVE_KEY_SIZE]>::try_from(raw).map_err(|_| {
        Error::crypto(format!(
            "key must be {CURVE_KEY_SIZE} bytes, got {}",
            raw.len()
        ))
    })
}

fn encode_z85(bytes: &[u8; CURVE_KEY_SIZE]) -> String {
    // 32 is a multiple of 4, the only condition z85 encoding can fail on.
    zmq::z85_encode(bytes).unwrap_or_default()
}

/// CURVE public key (32 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; CURVE_KEY_SIZE]);

impl PublicKey {
    /// Create from raw bytes, checking the length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        key_bytes(bytes).map(Self)
    }

    /// Parse libzmq's 40-character Z85 text form.
    pub fn from_z85(text: &str) -> Result<Self> {
        decode_z85(text).map(Self)
    }

    pub const fn as_bytes(&self) -> &[u8; CURVE_KEY_SIZE] {
        &self.0
    }

    pub fn to_z85(&self) -> String {
        encode_z85(&self.0)
    }
}

impl From<[u8; CURVE_KEY_SIZE]> for PublicKey {
    fn from(bytes: [u8; CURVE_KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_z85()).finish()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_z85())
    }
}

/// CURVE secret key (32 bytes)
#[derive(Clone)]
pub struct SecretKey(StaticSecret);

impl SecretKey {
    /// Create from raw bytes, checking the length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        key_bytes(bytes).map(|b| Self(StaticSecret::from(b)))
    }

    /// Parse libzmq's 40-character Z85 text form.
    pub fn from_z85(text: &str) -> Result<Self> {
        decode_z85(text).map(|b| Self(StaticSecret::from(b)))
    }

    pub fn to_bytes(&self) -> [u8; CURVE_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(*X25519Public::from(&self.0).as_bytes())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey").field(&"[REDACTED]").finish()
    }
}

/// Long-term CURVE key pair.
#[derive(Clone, Debug)]
pub struct KeyPair {
    public: PublicKey,
    secret: SecretKey,
}

impl KeyPair {
    /// Generate a fresh pair from the OS random source.
    pub fn generate() -> Self {
        Self::from_secret(SecretKey(StaticSecret::random_from_rng(OsRng)))
    }

    /// Build the pair for an existing secret.
    pub fn from_secret(secret: SecretKey) -> Self {
        Self {
            public: secret.public_key(),
            secret,
        }
    }

    /// Build a pair from both halves, checking that they match.
    pub fn new(public: PublicKey, secret: SecretKey) -> Result<Self> {
        if secret.public_key() != public {
            return Err(Error::crypto("public key does not match secret key"));
        }
        Ok(Self { public, secret })
    }

    pub const fn public(&self) -> &PublicKey {
        &self.public
    }

    pub const fn secret(&self) -> &SecretKey {
        &self.secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 32 test vector
    const Z85_TEXT: &str = "HelloWorld";
    const Z85_BYTES: [u8; 8] = [0x86, 0x4F, 0xD2, 0x6F, 0xB5, 0x59, 0xF7, 0x5B];

    #[test]
    fn test_z85_vector() {
        assert_eq!(zmq::z85_encode(&Z85_BYTES).unwrap(), Z85_TEXT);
    }

    #[test]
    fn test_public_key_z85() {
        let raw = hex::decode("8e0bdd697628b91d8f245587ee95c5b04d48963f79259877b49cd9063aead3b7")
            .unwrap();
        let key = PublicKey::from_bytes(&raw).unwrap();
        let text = key.to_z85();
        assert_eq!(text.len(), CURVE_Z85_SIZE);
        assert_eq!(PublicKey::from_z85(&text).unwrap(), key);
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!(matches!(
            PublicKey::from_bytes(&[0u8; 31]),
            Err(Error::CryptoConfig(_))
        ));
        assert!(matches!(
            PublicKey::from_z85("tooshort"),
            Err(Error::CryptoConfig(_))
        ));
        assert!(SecretKey::from_bytes(&[0u8; 33]).is_err());
    }

    #[test]
    fn test_generated_pair_matches() {
        let pair = KeyPair::generate();
        assert_eq!(pair.secret().public_key(), *pair.public());

        let again = KeyPair::from_secret(pair.secret().clone());
        assert_eq!(again.public(), pair.public());

        let other = KeyPair::generate();
        assert!(KeyPair::new(*other.public(), pair.secret().clone()).is_err());
    }

    #[test]
    fn test_secret_debug_redacted() {
        let pair = KeyPair::generate();
        let debug = format!("{pair:?}");
        assert!(debug.contains("[REDACTED]"));
        let secret_hex = hex::encode(pair.secret().to_bytes());
        assert!(!debug.contains(&secret_hex));
    }
}
