use base64::Engine as _;
use rand::RngCore;

/// Random URL-safe token (base64url, no padding) built from `n_bytes` of entropy.
pub(crate) fn url_safe_token(n_bytes: usize) -> String {
    let mut bytes = vec![0u8; n_bytes];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
