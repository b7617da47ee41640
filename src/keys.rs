//! Loading the trusted public keys consent request tokens must verify
//! against. Files named `*.json` are parsed as a single JWK; anything else
//! is treated as PEM (`PUBLIC KEY` / `RSA PUBLIC KEY`).

use josekit::jwk::Jwk;
use josekit::jws::alg::rsassa::RsassaJwsVerifier;
use josekit::jws::RS256;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::CmError;

pub fn load_trusted_keys(paths: &[PathBuf]) -> Result<Vec<RsassaJwsVerifier>, CmError> {
    let mut verifiers = Vec::with_capacity(paths.len());
    for path in paths {
        verifiers.push(load_key(path)?);
    }
    Ok(verifiers)
}

fn load_key(path: &Path) -> Result<RsassaJwsVerifier, CmError> {
    let bytes = fs::read(path)?;
    let verifier = if path.extension().is_some_and(|ext| ext == "json") {
        let jwk: Jwk = serde_json::from_slice(&bytes)?;
        RS256.verifier_from_jwk(&jwk)?
    } else {
        RS256.verifier_from_pem(&bytes)?
    };
    Ok(verifier)
}
