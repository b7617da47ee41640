use josekit::jwk::Jwk;
use josekit::jws::alg::rsassa::RsassaJwsVerifier;
use josekit::jws::{JwsHeader, RS256};
use josekit::jwt::{self, JwtPayload};
use serde_json::{json, Value};

/// A requester keypair for tests: signs consent request tokens and hands
/// out the matching verifier.
pub struct TestSigner {
    jwk: Jwk,
}

impl TestSigner {
    pub fn new() -> Self {
        Self {
            jwk: Jwk::generate_rsa_key(2048).expect("Failed to generate RSA key"),
        }
    }

    pub fn verifier(&self) -> RsassaJwsVerifier {
        let public = self.jwk.to_public_key().expect("Failed to derive public key");
        RS256
            .verifier_from_jwk(&public)
            .expect("Failed to build verifier")
    }

    /// Sign an arbitrary claim set as a compact JWT.
    pub fn sign(&self, claims: &[(&str, Value)]) -> String {
        let signer = RS256.signer_from_jwk(&self.jwk).expect("Failed to build signer");
        let mut header = JwsHeader::new();
        header.set_algorithm("RS256");
        let mut payload = JwtPayload::new();
        for (key, value) in claims {
            payload
                .set_claim(key, Some(value.clone()))
                .expect("Failed to set claim");
        }
        jwt::encode_with_signer(&payload, &header, &signer).expect("Failed to sign token")
    }

    /// A complete consent request token for `subject_id`, asking for an
    /// email and a name attribute.
    pub fn consent_request_token(&self, subject_id: &str) -> String {
        self.sign(&[
            ("id", json!(subject_id)),
            (
                "attr",
                json!({"email": ["a@example.com"], "name": ["Ada"]}),
            ),
            ("redirect_endpoint", json!("https://sp.example.com/return")),
            (
                "requester_name",
                json!([{"lang": "en", "text": "Example SP"}]),
            ),
            ("locked_attrs", json!(["email"])),
        ])
    }
}
