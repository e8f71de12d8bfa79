/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! error defines sets of error definitions in entire life time of transaction processing.
//!
//! There are three families:
//! - [TransactionRejected]: admission failed. The transaction never ran, no gas is charged,
//!   no nonce is consumed and nothing is written.
//! - [ExecutionError]: something went wrong while the transaction was running. These are
//!   turned into `Failed` or `Exception` responses, which consume gas and are committed.
//! - [InternalFailure]: an invariant of the surrounding system does not hold. These are
//!   never downgraded into a rejection or a failed response.

use crate::constants;
use crate::types::{Cause, StorageReference};

/// Admission-time rejection, with a stable human-readable reason.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransactionRejected(pub String);

impl TransactionRejected {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    pub fn reason(&self) -> &str {
        &self.0
    }
}

/// Violation of an invariant that indicates a bug in the surrounding system.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("internal failure: {0}")]
pub struct InternalFailure(pub String);

impl InternalFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors returned by the public operations of the engine.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("transaction rejected: {0}")]
    Rejected(#[from] TransactionRejected),

    #[error(transparent)]
    Internal(#[from] InternalFailure),
}

impl NodeError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        NodeError::Rejected(TransactionRejected::new(reason))
    }

    /// The rejection reason, if this is a rejection.
    pub fn rejection(&self) -> Option<&str> {
        match self {
            NodeError::Rejected(rejected) => Some(rejected.reason()),
            NodeError::Internal(_) => None,
        }
    }
}

/// A throwable raised by contract code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Throwable {
    pub class_name: String,
    pub message: String,
    /// Checked exceptions can be declared by a method and become `Exception` responses.
    pub checked: bool,
    pub location: Option<String>,
}

impl Throwable {
    pub fn checked(class_name: &str, message: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            message: message.to_string(),
            checked: true,
            location: None,
        }
    }

    pub fn unchecked(class_name: &str, message: &str) -> Self {
        Self {
            checked: false,
            ..Self::checked(class_name, message)
        }
    }
}

/// Descriptive error definitions of the execution of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// Gas limit was insufficient, short by the given amount.
    #[error("out of gas: {missing} units are missing")]
    OutOfGas { missing: u64 },

    /// Contract code threw.
    #[error("{}: {}", .0.class_name, .0.message)]
    Thrown(Throwable),

    /// A value violates the storage type discipline.
    #[error("{0}")]
    Deserialization(String),

    /// A view method modified state other than gas bookkeeping.
    #[error("view method has side effects")]
    SideEffectsInViewMethod,

    #[error("{0}")]
    IllegalArgument(String),

    /// An object referenced by the transaction does not exist in store.
    #[error("unknown object {0}")]
    UnknownObject(StorageReference),

    /// The verifier refused a jar. Holds the first error it reported.
    #[error("{0}")]
    Verification(String),

    /// A balance or a nonce went out of the range of the integers that hold it.
    #[error("{0}")]
    Arithmetic(String),

    #[error(transparent)]
    Internal(#[from] InternalFailure),
}

impl ExecutionError {
    /// The cause recorded in the response, with the message clipped to `max_length` characters.
    pub(crate) fn cause(&self, max_length: usize) -> Cause {
        let (class_name, location) = match self {
            ExecutionError::OutOfGas { .. } => (constants::OUT_OF_GAS_ERROR, None),
            ExecutionError::Thrown(throwable) => {
                (throwable.class_name.as_str(), throwable.location.clone())
            }
            ExecutionError::Deserialization(_) => (constants::DESERIALIZATION_ERROR, None),
            ExecutionError::SideEffectsInViewMethod => {
                (constants::SIDE_EFFECTS_IN_VIEW_METHOD_EXCEPTION, None)
            }
            ExecutionError::IllegalArgument(_) => (constants::ILLEGAL_ARGUMENT_EXCEPTION, None),
            ExecutionError::UnknownObject(_) => (constants::NON_EXISTENT_OBJECT_ERROR, None),
            ExecutionError::Verification(_) => (constants::VERIFICATION_EXCEPTION, None),
            ExecutionError::Arithmetic(_) => (constants::ARITHMETIC_EXCEPTION, None),
            ExecutionError::Internal(_) => ("", None),
        };

        let message = match self {
            ExecutionError::Thrown(throwable) => throwable.message.clone(),
            other => other.to_string(),
        };

        Cause {
            class_name: class_name.to_string(),
            message: message.chars().take(max_length).collect(),
            location,
        }
    }
}
