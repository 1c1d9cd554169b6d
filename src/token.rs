use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// An app's key/secret pair, used for every HMAC signature on the wire.
#[derive(Debug, Clone)]
pub struct Token {
    pub key: String,
    pub secret: String,
}

impl Token {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// HMAC-SHA256 hex digest of `message` under this token's secret.
    pub fn sign(&self, message: &str) -> String {
        self.sign_bytes(message.as_bytes())
    }

    pub fn sign_bytes(&self, message: &[u8]) -> String {
        hmac_hex(self.secret.as_bytes(), message)
    }

    pub fn verify(&self, message: &str, signature: &str) -> bool {
        secure_compare(&self.sign(message), signature)
    }
}

/// Lowercase hex HMAC-SHA256 digest.
pub fn hmac_hex(secret: &[u8], message: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC can take a key of any size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time string comparison for digests.
pub fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
