use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header LINE puts the request signature in.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

fn mac_for(body: &[u8], channel_secret: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(channel_secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    mac
}

/// Base64 HMAC-SHA256 of `body` keyed with the channel secret.
pub fn compute_signature(body: &[u8], channel_secret: &str) -> String {
    general_purpose::STANDARD.encode(mac_for(body, channel_secret).finalize().into_bytes())
}

/// Check `signature` against the raw request body as received on the wire.
///
/// Anything that is not valid base64 is rejected. The digest comparison is
/// constant-time.
pub fn verify_signature(body: &[u8], signature: &str, channel_secret: &str) -> bool {
    let Ok(claimed) = general_purpose::STANDARD.decode(signature.trim()) else {
        return false;
    };

    mac_for(body, channel_secret).verify_slice(&claimed).is_ok()
}
