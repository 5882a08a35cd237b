//! Query-string signing for authenticated exchange endpoints.

use super::TradeSourceError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Build a query string from ordered key/value pairs, percent-encoding values.
pub fn encode_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Hex-encoded HMAC-SHA256 of `query` keyed by `secret`.
pub fn sign_query(secret: &str, query: &str) -> Result<String, TradeSourceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TradeSourceError::Signing(e.to_string()))?;
    mac.update(query.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
