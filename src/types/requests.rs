/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Transaction requests: immutable descriptions of intended transactions.
//!
//! Initial requests can only run before the node is initialized and are neither signed nor
//! charged. Every other request is a [NonInitialTransactionRequest], which names a caller,
//! a classpath, a nonce and a gas budget, and is signed unless it is a system request.

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    ConstructorSignature, MethodSignature, StorageReference, StorageValue, TransactionReference,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum TransactionRequest {
    /// Installs a jar before initialization, without verification of its caller.
    JarStoreInitial(JarStoreInitialRequest),
    /// Creates the gamete, the pre-funded first account of the node.
    GameteCreation(GameteCreationRequest),
    /// Marks the node as initialized, with the given manifest.
    Initialization(InitializationRequest),
    NonInitial(NonInitialTransactionRequest),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct JarStoreInitialRequest {
    pub jar: Vec<u8>,
    pub dependencies: Vec<TransactionReference>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct GameteCreationRequest {
    pub classpath: TransactionReference,
    pub initial_amount: i128,
    pub red_initial_amount: i128,
    /// Base64url encoding of the public key of the gamete.
    pub public_key: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct InitializationRequest {
    pub classpath: TransactionReference,
    pub manifest: StorageReference,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct NonInitialTransactionRequest {
    pub caller: StorageReference,
    pub gas_limit: u64,
    pub gas_price: u64,
    pub classpath: TransactionReference,
    pub nonce: u64,
    pub chain_id: String,
    pub payload: NonInitialPayload,
    /// `None` for unsigned system requests.
    pub signature: Option<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum NonInitialPayload {
    JarStore {
        jar: Vec<u8>,
        dependencies: Vec<TransactionReference>,
    },
    ConstructorCall {
        constructor: ConstructorSignature,
        actuals: Vec<StorageValue>,
    },
    InstanceMethodCall {
        method: MethodSignature,
        receiver: StorageReference,
        actuals: Vec<StorageValue>,
    },
    StaticMethodCall {
        method: MethodSignature,
        actuals: Vec<StorageValue>,
    },
}

impl TransactionRequest {
    /// Serialized form, used for hashing and for pricing storage.
    pub fn to_bytes(&self) -> Vec<u8> {
        // serialization into a vector cannot fail
        self.try_to_vec().unwrap_or_default()
    }

    /// The reference of this request: the hash of its serialization.
    pub fn reference(&self) -> TransactionReference {
        TransactionReference::from_bytes(&self.to_bytes())
    }

    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }

    pub fn is_initial(&self) -> bool {
        !matches!(self, TransactionRequest::NonInitial(_))
    }

    pub fn as_non_initial(&self) -> Option<&NonInitialTransactionRequest> {
        match self {
            TransactionRequest::NonInitial(request) => Some(request),
            _ => None,
        }
    }

    /// The classpath against which the request runs, if it has one.
    pub fn classpath(&self) -> Option<TransactionReference> {
        match self {
            TransactionRequest::JarStoreInitial(_) => None,
            TransactionRequest::GameteCreation(request) => Some(request.classpath),
            TransactionRequest::Initialization(request) => Some(request.classpath),
            TransactionRequest::NonInitial(request) => Some(request.classpath),
        }
    }

    /// The jar installed by this request, with its dependencies.
    pub fn jar(&self) -> Option<(&[u8], &[TransactionReference])> {
        match self {
            TransactionRequest::JarStoreInitial(request) => {
                Some((&request.jar, &request.dependencies))
            }
            TransactionRequest::NonInitial(NonInitialTransactionRequest {
                payload: NonInitialPayload::JarStore { jar, dependencies },
                ..
            }) => Some((jar, dependencies)),
            _ => None,
        }
    }
}

impl NonInitialTransactionRequest {
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// The bytes covered by the signature: the request without its signature.
    pub fn bytes_to_sign(&self) -> Vec<u8> {
        let unsigned = Self {
            signature: None,
            ..self.clone()
        };
        unsigned.try_to_vec().unwrap_or_default()
    }

    /// Storage references passed as actual arguments.
    pub fn storage_actuals(&self) -> Vec<StorageReference> {
        let actuals = match &self.payload {
            NonInitialPayload::JarStore { .. } => return Vec::new(),
            NonInitialPayload::ConstructorCall { actuals, .. }
            | NonInitialPayload::InstanceMethodCall { actuals, .. }
            | NonInitialPayload::StaticMethodCall { actuals, .. } => actuals,
        };
        actuals.iter().filter_map(StorageValue::as_reference).collect()
    }

    pub fn receiver(&self) -> Option<StorageReference> {
        match &self.payload {
            NonInitialPayload::InstanceMethodCall { receiver, .. } => Some(*receiver),
            _ => None,
        }
    }
}

impl From<NonInitialTransactionRequest> for TransactionRequest {
    fn from(request: NonInitialTransactionRequest) -> Self {
        TransactionRequest::NonInitial(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StorageType;

    fn call(signature: Option<Vec<u8>>) -> NonInitialTransactionRequest {
        NonInitialTransactionRequest {
            caller: StorageReference::new(TransactionReference([1u8; 32]), 0),
            gas_limit: 10_000,
            gas_price: 1,
            classpath: TransactionReference([2u8; 32]),
            nonce: 3,
            chain_id: "test".to_string(),
            payload: NonInitialPayload::StaticMethodCall {
                method: MethodSignature::getter("C", "m", StorageType::Int),
                actuals: vec![StorageValue::Int(1)],
            },
            signature,
        }
    }

    #[test]
    fn test_signature_not_covered_by_signed_bytes() {
        let a = call(Some(vec![1, 2, 3]));
        let b = call(Some(vec![4, 5, 6]));
        assert_eq!(a.bytes_to_sign(), b.bytes_to_sign());
        assert_ne!(
            TransactionRequest::from(a).reference(),
            TransactionRequest::from(b).reference()
        );
    }
}
