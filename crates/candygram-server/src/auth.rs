//! Signature-based request authentication.
//!
//! Every relay request carries the caller's public key, a random token,
//! and the caller's signature over that token. Verification uses the same
//! asymmetric primitive as peer-to-peer message signatures, and runs
//! before any endpoint logic.

use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use candygram_shared::constants::{HEADER_PUBLIC_KEY, HEADER_SIGNATURE, HEADER_TOKEN};
use candygram_shared::identity;

use crate::error::ServerError;

pub async fn require_signature(
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ServerError> {
    if let Err(error) = verify_headers(req.headers()) {
        warn!(remote = %remote_addr(&req), %error, "rejecting unauthenticated request");
        return Err(error);
    }
    Ok(next.run(req).await)
}

pub(crate) fn verify_headers(headers: &HeaderMap) -> Result<(), ServerError> {
    let key_text = header_str(headers, HEADER_PUBLIC_KEY)?;
    let token = decode_hex_header(headers, HEADER_TOKEN)?;
    let signature = decode_hex_header(headers, HEADER_SIGNATURE)?;

    let public_key = identity::public_key_from_text(key_text)
        .map_err(|e| ServerError::BadRequest(format!("{HEADER_PUBLIC_KEY} header: {e}")))?;

    if !identity::verify_signature(&public_key, &token, &signature) {
        return Err(ServerError::Unauthorized);
    }
    Ok(())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ServerError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ServerError::BadRequest(format!("missing or unreadable {name} header")))
}

fn decode_hex_header(headers: &HeaderMap, name: &str) -> Result<Vec<u8>, ServerError> {
    hex::decode(header_str(headers, name)?)
        .map_err(|e| ServerError::BadRequest(format!("{name} header: {e}")))
}

fn remote_addr<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|info| info.0.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use candygram_shared::Identity;

    fn signed_headers(identity: &Identity) -> HeaderMap {
        let auth = identity.auth_token().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            HEADER_PUBLIC_KEY,
            HeaderValue::from_str(&identity.public_text()).unwrap(),
        );
        headers.insert(
            HEADER_TOKEN,
            HeaderValue::from_str(&auth.token_hex()).unwrap(),
        );
        headers.insert(
            HEADER_SIGNATURE,
            HeaderValue::from_str(&auth.signature_hex()).unwrap(),
        );
        headers
    }

    #[test]
    fn test_valid_signature_passes() {
        let identity = Identity::generate().unwrap();
        assert!(verify_headers(&signed_headers(&identity)).is_ok());
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let identity = Identity::generate().unwrap();
        let mut headers = signed_headers(&identity);

        let mut sig = headers[HEADER_SIGNATURE].to_str().unwrap().to_string();
        // flip one hex digit
        let flipped = if sig.ends_with('0') { '1' } else { '0' };
        sig.pop();
        sig.push(flipped);
        headers.insert(HEADER_SIGNATURE, HeaderValue::from_str(&sig).unwrap());

        assert!(matches!(
            verify_headers(&headers),
            Err(ServerError::Unauthorized)
        ));
    }

    #[test]
    fn test_signature_from_other_key_rejected() {
        let signer = Identity::generate().unwrap();
        let imposter = Identity::generate().unwrap();

        let mut headers = signed_headers(&signer);
        headers.insert(
            HEADER_PUBLIC_KEY,
            HeaderValue::from_str(&imposter.public_text()).unwrap(),
        );

        assert!(matches!(
            verify_headers(&headers),
            Err(ServerError::Unauthorized)
        ));
    }

    #[test]
    fn test_missing_headers_rejected() {
        let identity = Identity::generate().unwrap();
        let mut headers = signed_headers(&identity);
        headers.remove(HEADER_TOKEN);

        assert!(matches!(
            verify_headers(&headers),
            Err(ServerError::BadRequest(_))
        ));
    }

    #[test]
    fn test_non_hex_token_rejected() {
        let identity = Identity::generate().unwrap();
        let mut headers = signed_headers(&identity);
        headers.insert(HEADER_TOKEN, HeaderValue::from_static("not hex"));

        assert!(matches!(
            verify_headers(&headers),
            Err(ServerError::BadRequest(_))
        ));
    }
}
