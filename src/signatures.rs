/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Signature algorithms used to check the signature of requests.
//!
//! An account selects its algorithm through its class (see
//! [Capabilities::signature](crate::class_loader::Capabilities)); accounts that do not
//! select one use the algorithm declared in the consensus parameters.

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use ed25519_dalek::Verifier;

/// The built-in families of signature algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    Ed25519,
    Sha256Dsa,
    Qtesla1,
    Qtesla3,
    /// Accepts every signature. Only meant for tests.
    Empty,
}

impl SignatureKind {
    pub fn name(&self) -> &'static str {
        match self {
            SignatureKind::Ed25519 => "ed25519",
            SignatureKind::Sha256Dsa => "sha256dsa",
            SignatureKind::Qtesla1 => "qtesla1",
            SignatureKind::Qtesla3 => "qtesla3",
            SignatureKind::Empty => "empty",
        }
    }
}

impl fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ed25519" => Ok(SignatureKind::Ed25519),
            "sha256dsa" => Ok(SignatureKind::Sha256Dsa),
            "qtesla1" => Ok(SignatureKind::Qtesla1),
            "qtesla3" => Ok(SignatureKind::Qtesla3),
            "empty" => Ok(SignatureKind::Empty),
            other => Err(format!("unknown signature algorithm {other}")),
        }
    }
}

/// A decoded public key, opaque to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey(pub Vec<u8>);

pub trait SignatureAlgorithm: Send + Sync {
    fn verify(&self, bytes: &[u8], public_key: &PublicKey, signature: &[u8]) -> bool;

    fn public_key_from_encoding(&self, encoding: &[u8]) -> Result<PublicKey, String>;
}

pub struct Ed25519;

impl SignatureAlgorithm for Ed25519 {
    fn verify(&self, bytes: &[u8], public_key: &PublicKey, signature: &[u8]) -> bool {
        let Ok(key_bytes) = <[u8; 32]>::try_from(public_key.0.as_slice()) else {
            return false;
        };
        let Ok(verifying_key) = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify(bytes, &signature).is_ok()
    }

    fn public_key_from_encoding(&self, encoding: &[u8]) -> Result<PublicKey, String> {
        if encoding.len() != ed25519_dalek::PUBLIC_KEY_LENGTH {
            return Err(format!(
                "an ed25519 public key must be {} bytes long",
                ed25519_dalek::PUBLIC_KEY_LENGTH
            ));
        }
        Ok(PublicKey(encoding.to_vec()))
    }
}

pub struct EmptySignature;

impl SignatureAlgorithm for EmptySignature {
    fn verify(&self, _bytes: &[u8], _public_key: &PublicKey, _signature: &[u8]) -> bool {
        true
    }

    fn public_key_from_encoding(&self, encoding: &[u8]) -> Result<PublicKey, String> {
        Ok(PublicKey(encoding.to_vec()))
    }
}

/// The signature algorithms known to a node.
#[derive(Clone)]
pub struct SignatureAlgorithms {
    algorithms: HashMap<SignatureKind, Arc<dyn SignatureAlgorithm>>,
}

impl Default for SignatureAlgorithms {
    fn default() -> Self {
        let mut algorithms: HashMap<SignatureKind, Arc<dyn SignatureAlgorithm>> = HashMap::new();
        algorithms.insert(SignatureKind::Ed25519, Arc::new(Ed25519));
        algorithms.insert(SignatureKind::Empty, Arc::new(EmptySignature));
        Self { algorithms }
    }
}

impl SignatureAlgorithms {
    /// register an implementation for a family, replacing any previous one.
    pub fn register(&mut self, kind: SignatureKind, algorithm: Arc<dyn SignatureAlgorithm>) {
        self.algorithms.insert(kind, algorithm);
    }

    pub fn get(&self, kind: SignatureKind) -> Option<Arc<dyn SignatureAlgorithm>> {
        self.algorithms.get(&kind).cloned()
    }
}
