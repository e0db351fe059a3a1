use super::BuildStrategy;
use crate::error::SocketError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Signs outbound Http [`RestRequest`](super::rest::RestRequest)s using venue-specific API key
/// credentials. Used by the Polymarket/Kalshi clients in `echelon-adapter`, which both require
/// an HMAC-signed header rather than the [`super::public::PublicNoHeaders`] strategy.
#[derive(Clone)]
pub struct RequestSigner {
    api_key_header: &'static str,
    signature_header: &'static str,
    api_key: String,
    secret: Vec<u8>,
}

impl RequestSigner {
    pub fn new(
        api_key_header: &'static str,
        signature_header: &'static str,
        api_key: impl Into<String>,
        secret: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            api_key_header,
            signature_header,
            api_key: api_key.into(),
            secret: secret.into(),
        }
    }

    fn sign(&self, payload: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .expect("HMAC accepts a key of any length");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }
}

impl BuildStrategy for RequestSigner {
    fn build<Request>(
        &self,
        request: Request,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Request, SocketError>
    where
        Request: super::rest::RestRequest,
    {
        let built = builder.build()?;
        let body = built.body().and_then(|b| b.as_bytes()).unwrap_or_default();
        let signature = self.sign(body);

        let mut built = built;
        built
            .headers_mut()
            .insert(self.api_key_header, self.api_key.parse().expect("valid header value"));
        built
            .headers_mut()
            .insert(self.signature_header, signature.parse().expect("valid header value"));

        let _ = request;
        Ok(built)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_is_deterministic() {
        let signer = RequestSigner::new("X-API-KEY", "X-SIGNATURE", "key", b"secret".to_vec());
        assert_eq!(signer.sign(b"payload"), signer.sign(b"payload"));
        assert_ne!(signer.sign(b"payload"), signer.sign(b"other"));
    }
}
