/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Transaction responses: the outcome of executing a request.

use borsh::{BorshDeserialize, BorshSerialize};

use super::{StorageReference, StorageValue, TransactionReference, Update};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum TransactionResponse {
    JarStoreInitial(JarStoreInitialResponse),
    GameteCreation(GameteCreationResponse),
    Initialization,
    /// The transaction completed normally. Unused gas was refunded.
    Success(SuccessfulResponse),
    /// A declared exception was thrown. Unused gas was refunded and all updates are kept.
    Exception(ExceptionResponse),
    /// An unexpected error occurred. No refund, only balance and nonce updates are kept.
    Failed(FailedResponse),
}

/// Gas consumed by a transaction, split by resource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct GasCosts {
    pub cpu: u64,
    pub ram: u64,
    pub storage: u64,
}

impl GasCosts {
    pub fn total(&self) -> u64 {
        self.cpu.saturating_add(self.ram).saturating_add(self.storage)
    }
}

/// A jar after instrumentation, as stored in the response that installed it.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InstrumentedJar {
    pub bytes: Vec<u8>,
}

impl InstrumentedJar {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct JarStoreInitialResponse {
    pub instrumented_jar: InstrumentedJar,
    pub dependencies: Vec<TransactionReference>,
    pub verification_version: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct GameteCreationResponse {
    pub updates: Vec<Update>,
    pub gamete: StorageReference,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SuccessfulResponse {
    pub outcome: Outcome,
    pub updates: Vec<Update>,
    pub events: Vec<StorageReference>,
    pub gas: GasCosts,
}

/// What a successful non-initial transaction produced.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Outcome {
    JarStore {
        instrumented_jar: InstrumentedJar,
        dependencies: Vec<TransactionReference>,
        verification_version: u32,
    },
    NewObject(StorageReference),
    /// Result of a method call, `None` for void methods.
    Value(Option<StorageValue>),
}

/// Description of the throwable that ended a transaction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Cause {
    pub class_name: String,
    pub message: String,
    /// Where the throwable was raised, if known.
    pub location: Option<String>,
}

impl Cause {
    pub fn new(class_name: &str, message: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            message: message.to_string(),
            location: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ExceptionResponse {
    pub cause: Cause,
    pub updates: Vec<Update>,
    pub events: Vec<StorageReference>,
    pub gas: GasCosts,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FailedResponse {
    pub cause: Cause,
    pub updates: Vec<Update>,
    pub gas: GasCosts,
    pub gas_for_penalty: u64,
}

impl TransactionResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.try_to_vec().unwrap_or_default()
    }

    /// Size of the serialized response, which is priced as storage.
    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }

    pub fn updates(&self) -> &[Update] {
        match self {
            TransactionResponse::JarStoreInitial(_) | TransactionResponse::Initialization => &[],
            TransactionResponse::GameteCreation(response) => &response.updates,
            TransactionResponse::Success(response) => &response.updates,
            TransactionResponse::Exception(response) => &response.updates,
            TransactionResponse::Failed(response) => &response.updates,
        }
    }

    pub fn events(&self) -> &[StorageReference] {
        match self {
            TransactionResponse::Success(response) => &response.events,
            TransactionResponse::Exception(response) => &response.events,
            _ => &[],
        }
    }

    pub fn gas(&self) -> GasCosts {
        match self {
            TransactionResponse::Success(response) => response.gas,
            TransactionResponse::Exception(response) => response.gas,
            TransactionResponse::Failed(response) => response.gas,
            _ => GasCosts::default(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TransactionResponse::Failed(_))
    }

    /// The jar installed by this response: its instrumented bytes, its dependencies and
    /// the verification version it was produced under.
    pub fn instrumented_jar(&self) -> Option<(&InstrumentedJar, &[TransactionReference], u32)> {
        match self {
            TransactionResponse::JarStoreInitial(response) => Some((
                &response.instrumented_jar,
                &response.dependencies,
                response.verification_version,
            )),
            TransactionResponse::Success(SuccessfulResponse {
                outcome:
                    Outcome::JarStore {
                        instrumented_jar,
                        dependencies,
                        verification_version,
                    },
                ..
            }) => Some((instrumented_jar, dependencies, *verification_version)),
            _ => None,
        }
    }

    /// The result of a successful method call.
    pub fn result(&self) -> Option<&StorageValue> {
        match self {
            TransactionResponse::Success(SuccessfulResponse {
                outcome: Outcome::Value(value),
                ..
            }) => value.as_ref(),
            _ => None,
        }
    }

    /// The object created by a successful constructor call.
    pub fn new_object(&self) -> Option<StorageReference> {
        match self {
            TransactionResponse::Success(SuccessfulResponse {
                outcome: Outcome::NewObject(object),
                ..
            }) => Some(*object),
            _ => None,
        }
    }
}
