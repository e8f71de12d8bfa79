/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The contract the engine requires from the ledger.
//!
//! A store presents two views: the committed one and the uncommitted tip. Within a batch of
//! transactions the engine reads the tip, so that each transaction observes the effects of
//! those before it; only the store's own commit makes the tip visible to other readers.

use crate::types::{
    ObjectState, StorageReference, TransactionReference, TransactionRequest, TransactionResponse,
};

pub trait Store: Send + Sync {
    /// The request with the given reference. Requests are immutable, so this also sees the
    /// requests pushed in the current, uncommitted batch.
    fn get_request(&self, reference: &TransactionReference) -> Option<TransactionRequest>;

    /// The committed response with the given reference.
    fn get_response(&self, reference: &TransactionReference) -> Option<TransactionResponse>;

    /// The response with the given reference at the uncommitted tip.
    fn get_response_uncommitted(
        &self,
        reference: &TransactionReference,
    ) -> Option<TransactionResponse>;

    /// The manifest of the node at the uncommitted tip, if the node is initialized.
    fn get_manifest_uncommitted(&self) -> Option<StorageReference>;

    /// Class tag and current field values of an object at the uncommitted tip.
    fn get_state_uncommitted(&self, object: &StorageReference) -> Option<ObjectState>;

    /// Pushes the outcome of a request to the uncommitted tip: either its response, or the
    /// reason for its rejection. Pushing a response for an existing reference replaces it.
    fn push(
        &self,
        reference: &TransactionReference,
        request: &TransactionRequest,
        outcome: Result<&TransactionResponse, &str>,
    );
}
