/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! transition defines the entry point of the engine: the [Runtime], which turns requests into
//! responses against a [Store].
//!
//! For each request, [Runtime::process] takes a snapshot of the derived values of the node,
//! admits and executes the request, pushes the outcome (the response, or the reason of the
//! rejection) to the uncommitted tip of the store, and finally lets the node cache decide
//! whether the response changed any derived value.

use std::sync::Arc;

use crate::{
    cache::NodeCache,
    error::{NodeError, TransactionRejected},
    execution::node::NodeView,
    params::{ConsensusParams, RuntimeConfig},
    signatures::{SignatureAlgorithm, SignatureAlgorithms, SignatureKind},
    store::Store,
    types::{
        NonInitialPayload, NonInitialTransactionRequest, StorageReference, TransactionReference,
        TransactionRequest, TransactionResponse,
    },
    verifier::Verifier,
    vm::Vm,
};

/// Runtime executes transaction requests on top of a store.
pub struct Runtime<S: Store> {
    store: S,
    vm: Arc<dyn Vm>,
    verifier: Arc<dyn Verifier>,
    signatures: SignatureAlgorithms,
    config: RuntimeConfig,
    cache: NodeCache,
}

impl<S: Store> Runtime<S> {
    /// Instantiate Runtime with the default configuration.
    pub fn new(store: S, vm: Arc<dyn Vm>, verifier: Arc<dyn Verifier>) -> Self {
        let config = RuntimeConfig::default();
        Self {
            store,
            vm,
            verifier,
            signatures: SignatureAlgorithms::default(),
            cache: NodeCache::new(&config),
            config,
        }
    }

    /// specify the local configuration of the node. The caches are rebuilt empty.
    pub fn set_config(mut self, config: RuntimeConfig) -> Self {
        self.cache = NodeCache::new(&config);
        self.config = config;
        self
    }

    /// specify the implementation of a family of signature algorithms.
    pub fn set_signature_algorithm(
        mut self,
        kind: SignatureKind,
        algorithm: Arc<dyn SignatureAlgorithm>,
    ) -> Self {
        self.signatures.register(kind, algorithm);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The reference a request gets in the store.
    pub fn reference_of(request: &TransactionRequest) -> TransactionReference {
        request.reference()
    }

    fn node(&self) -> NodeView<'_> {
        NodeView {
            store: &self.store,
            cache: &self.cache,
            vm: self.vm.as_ref(),
            verifier: self.verifier.as_ref(),
            signatures: &self.signatures,
            config: &self.config,
        }
    }

    /// process admits and executes a request, and pushes its outcome to the store. Once the
    /// node is initialized, non-initial requests must be signed.
    pub fn process(&self, request: &TransactionRequest) -> Result<TransactionResponse, NodeError> {
        self.deliver(request, false)
    }

    /// process_system is [Runtime::process] for the unsigned requests the node itself issues,
    /// such as the rewarding of validators. They skip the signature, chain id and gas price
    /// checks.
    pub fn process_system(
        &self,
        request: &NonInitialTransactionRequest,
    ) -> Result<TransactionResponse, NodeError> {
        self.deliver(&TransactionRequest::from(request.clone()), true)
    }

    fn deliver(
        &self,
        request: &TransactionRequest,
        system: bool,
    ) -> Result<TransactionResponse, NodeError> {
        let reference = request.reference();
        let node = self.node();

        let outcome = check_origin(&node, request, system).and_then(|()| {
            let snapshot = node.snapshot()?;
            node.build(reference, request, &snapshot, false)
        });

        match outcome {
            Ok(response) => {
                self.store.push(&reference, request, Ok(&response));
                self.cache
                    .requests()
                    .put(reference, Arc::new(request.clone()));
                tracing::info!(
                    %reference,
                    kind = kind_of(request),
                    outcome = outcome_of(&response),
                    gas = response.gas().total(),
                    "transaction executed"
                );

                let class_loader = match request.classpath() {
                    Some(classpath) if !response.events().is_empty() => {
                        Some(node.class_loader(classpath, &node.snapshot()?)?)
                    }
                    _ => None,
                };
                self.cache
                    .invalidate_if_needed(&node, &response, class_loader.as_deref())?;
                Ok(response)
            }
            Err(NodeError::Rejected(rejected)) => {
                tracing::debug!(%reference, reason = rejected.reason(), "transaction rejected");
                self.store.push(&reference, request, Err(rejected.reason()));
                Err(rejected.into())
            }
            Err(internal) => {
                tracing::error!(%reference, error = %internal, "transaction aborted");
                Err(internal)
            }
        }
    }

    /// run_view executes a request without pushing anything to the store. The nonce of the
    /// caller is neither checked nor consumed, and the request cannot modify state other
    /// than gas bookkeeping.
    pub fn run_view(
        &self,
        request: &NonInitialTransactionRequest,
    ) -> Result<TransactionResponse, NodeError> {
        let node = self.node();
        let request = TransactionRequest::from(request.clone());
        let reference = request.reference();
        let snapshot = node.snapshot()?;
        node.build(reference, &request, &snapshot, true)
    }

    /* ↓↓↓ Queries ↓↓↓ */

    pub fn get_request(&self, reference: &TransactionReference) -> Option<TransactionRequest> {
        self.node()
            .get_request(reference)
            .map(|request| request.as_ref().clone())
    }

    /// The committed response of a transaction, after reverification of the jar it installed,
    /// if any.
    pub fn get_response(
        &self,
        reference: &TransactionReference,
    ) -> Result<Option<TransactionResponse>, NodeError> {
        Ok(self
            .node()
            .get_response(reference)?
            .map(|response| response.as_ref().clone()))
    }

    pub fn get_consensus(&self) -> Result<ConsensusParams, NodeError> {
        Ok(self.node().consensus()?.as_ref().clone())
    }

    pub fn get_gas_price(&self) -> Result<Option<u64>, NodeError> {
        self.node().gas_price()
    }

    /// Current inflation, in units per million.
    pub fn get_inflation(&self) -> Result<Option<i64>, NodeError> {
        self.node().inflation()
    }

    pub fn get_manifest(&self) -> Option<StorageReference> {
        self.store.get_manifest_uncommitted()
    }

    pub fn get_validators(&self) -> Result<Option<StorageReference>, NodeError> {
        Ok(self.node().singletons()?.validators)
    }

    pub fn get_gas_station(&self) -> Result<Option<StorageReference>, NodeError> {
        Ok(self.node().singletons()?.gas_station)
    }

    pub fn get_versions(&self) -> Result<Option<StorageReference>, NodeError> {
        Ok(self.node().singletons()?.versions)
    }

    /// Clears every cache, for instance after the store was moved to another state.
    pub fn invalidate_caches(&self) {
        self.cache.invalidate();
    }
}

/// Unsigned requests after initialization can only come from the node itself.
fn check_origin(
    node: &NodeView<'_>,
    request: &TransactionRequest,
    system: bool,
) -> Result<(), NodeError> {
    match request.as_non_initial() {
        Some(request) if !system && !request.is_signed() && node.is_initialized() => {
            Err(TransactionRejected::new("only the node can run unsigned requests").into())
        }
        _ => Ok(()),
    }
}

fn kind_of(request: &TransactionRequest) -> &'static str {
    match request {
        TransactionRequest::JarStoreInitial(_) => "jar store initial",
        TransactionRequest::GameteCreation(_) => "gamete creation",
        TransactionRequest::Initialization(_) => "initialization",
        TransactionRequest::NonInitial(request) => match &request.payload {
            NonInitialPayload::JarStore { .. } => "jar store",
            NonInitialPayload::ConstructorCall { .. } => "constructor call",
            NonInitialPayload::InstanceMethodCall { .. } => "instance method call",
            NonInitialPayload::StaticMethodCall { .. } => "static method call",
        },
    }
}

fn outcome_of(response: &TransactionResponse) -> &'static str {
    match response {
        TransactionResponse::Success(_) => "success",
        TransactionResponse::Exception(_) => "exception",
        TransactionResponse::Failed(_) => "failed",
        _ => "initial",
    }
}
