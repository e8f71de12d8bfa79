/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The caches of a node.
//!
//! [NodeCache] holds two kinds of state:
//! - bounded [SharedLru] maps of requests, responses, class loaders and signature checks,
//!   which are pure performance devices in front of the store;
//! - derived values (consensus parameters, gas price, inflation and the references to the
//!   manifest singletons), computed lazily by running view calls against the manifest
//!   contracts and kept until a committed response signals that they might have changed.
//!
//! Derived values are never mutated in place: readers either see the old snapshot or the
//! new one, never a mix of the two.

pub mod lru;
pub use self::lru::SharedLru;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::{
    class_loader::EngineClassLoader,
    error::NodeError,
    execution::node::NodeView,
    params::{ConsensusParams, RuntimeConfig},
    store::Store,
    types::{
        FieldSignature, StorageReference, StorageValue, TransactionReference, TransactionRequest,
        TransactionResponse,
    },
};

/// References to the singleton contracts reachable from the manifest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Singletons {
    pub manifest: Option<StorageReference>,
    pub validators: Option<StorageReference>,
    pub gas_station: Option<StorageReference>,
    pub versions: Option<StorageReference>,
}

/// Which derived values a committed response might have changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Invalidation {
    pub consensus: bool,
    pub gas_price: bool,
    pub inflation: bool,
}

impl Invalidation {
    fn all() -> Self {
        Self {
            consensus: true,
            gas_price: true,
            inflation: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.consensus || self.gas_price || self.inflation)
    }
}

pub struct NodeCache {
    requests: SharedLru<TransactionReference, Arc<TransactionRequest>>,
    responses: SharedLru<TransactionReference, Arc<TransactionResponse>>,
    class_loaders: SharedLru<TransactionReference, Arc<EngineClassLoader>>,
    /// Outcome of the signature check of each request, by request reference.
    signatures: SharedLru<TransactionReference, bool>,

    consensus: RwLock<Option<Arc<ConsensusParams>>>,
    gas_price: RwLock<Option<Option<u64>>>,
    inflation: RwLock<Option<Option<i64>>>,
    singletons: RwLock<Option<Singletons>>,
}

impl NodeCache {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            requests: SharedLru::new(config.request_cache_size),
            responses: SharedLru::new(config.response_cache_size),
            class_loaders: SharedLru::new(config.class_loader_cache_size),
            signatures: SharedLru::new(config.signature_cache_size),
            consensus: RwLock::new(None),
            gas_price: RwLock::new(None),
            inflation: RwLock::new(None),
            singletons: RwLock::new(None),
        }
    }

    pub fn requests(&self) -> &SharedLru<TransactionReference, Arc<TransactionRequest>> {
        &self.requests
    }

    pub fn responses(&self) -> &SharedLru<TransactionReference, Arc<TransactionResponse>> {
        &self.responses
    }

    pub fn class_loaders(&self) -> &SharedLru<TransactionReference, Arc<EngineClassLoader>> {
        &self.class_loaders
    }

    pub fn signatures(&self) -> &SharedLru<TransactionReference, bool> {
        &self.signatures
    }

    /* ↓↓↓ Derived values ↓↓↓ */

    /// The cached consensus parameters, without computing them if missing.
    pub fn peek_consensus(&self) -> Option<Arc<ConsensusParams>> {
        self.consensus.read().clone()
    }

    pub fn consensus(
        &self,
        compute: impl FnOnce() -> Result<ConsensusParams, NodeError>,
    ) -> Result<Arc<ConsensusParams>, NodeError> {
        if let Some(consensus) = self.peek_consensus() {
            return Ok(consensus);
        }
        let consensus = Arc::new(compute()?);
        *self.consensus.write() = Some(consensus.clone());
        Ok(consensus)
    }

    pub fn gas_price(
        &self,
        compute: impl FnOnce() -> Result<Option<u64>, NodeError>,
    ) -> Result<Option<u64>, NodeError> {
        lazily(&self.gas_price, compute)
    }

    pub fn inflation(
        &self,
        compute: impl FnOnce() -> Result<Option<i64>, NodeError>,
    ) -> Result<Option<i64>, NodeError> {
        lazily(&self.inflation, compute)
    }

    pub fn singletons(
        &self,
        compute: impl FnOnce() -> Result<Singletons, NodeError>,
    ) -> Result<Singletons, NodeError> {
        lazily(&self.singletons, compute)
    }

    /// Clears every cache unconditionally.
    pub fn invalidate(&self) {
        tracing::debug!("invalidating all node caches");
        self.requests.clear();
        self.responses.clear();
        self.class_loaders.clear();
        self.signatures.clear();
        *self.consensus.write() = None;
        *self.gas_price.write() = None;
        *self.inflation.write() = None;
        *self.singletons.write() = None;
    }

    /// Decides which derived values a committed response might have changed, by looking at
    /// the events it emitted. Only events of the update families, created by the singleton
    /// responsible for that family, count.
    pub fn invalidation_for(
        &self,
        response: &TransactionResponse,
        initialized: bool,
        class_loader: Option<&EngineClassLoader>,
        store: &dyn Store,
        singletons: &Singletons,
    ) -> Invalidation {
        if matches!(response, TransactionResponse::Initialization) {
            return Invalidation::all();
        }

        let mut invalidation = Invalidation::default();
        let Some(class_loader) = class_loader else {
            return invalidation;
        };
        if !initialized || response.events().is_empty() {
            return invalidation;
        }

        for event in response.events() {
            let Some(state) = store.get_state_uncommitted(event) else {
                continue;
            };
            let Some(capabilities) = class_loader.capabilities(&state.class_tag.class_name) else {
                continue;
            };
            let creator = match state.fields.get(&FieldSignature::event_creator()) {
                Some(StorageValue::Reference(creator)) => Some(*creator),
                _ => None,
            };
            let created_by = |singleton: Option<StorageReference>| {
                creator.is_some() && creator == singleton
            };

            if capabilities.is_consensus_update_event
                && (created_by(singletons.manifest)
                    || created_by(singletons.validators)
                    || created_by(singletons.gas_station)
                    || created_by(singletons.versions))
            {
                invalidation.consensus = true;
            }
            if capabilities.is_gas_price_update_event && created_by(singletons.gas_station) {
                invalidation.gas_price = true;
            }
            if capabilities.is_inflation_update_event && created_by(singletons.validators) {
                invalidation.inflation = true;
            }
        }

        invalidation
    }

    /// Called once for every committed response: recomputes the derived values that the
    /// response might have changed. Each value is recomputed independently and replaced as
    /// a whole.
    pub(crate) fn invalidate_if_needed(
        &self,
        node: &NodeView<'_>,
        response: &TransactionResponse,
        class_loader: Option<&EngineClassLoader>,
    ) -> Result<(), NodeError> {
        let initialized = node.is_initialized();
        let singletons = if matches!(response, TransactionResponse::Initialization) {
            let singletons = node.fetch_singletons()?;
            *self.singletons.write() = Some(singletons);
            singletons
        } else if initialized && !response.events().is_empty() {
            self.singletons(|| node.fetch_singletons())?
        } else {
            return Ok(());
        };

        let invalidation =
            self.invalidation_for(response, initialized, class_loader, node.store, &singletons);
        if invalidation.is_empty() {
            return Ok(());
        }

        if invalidation.consensus {
            let consensus = Arc::new(node.fetch_consensus(&singletons)?);
            tracing::info!(
                chain_id = %consensus.chain_id,
                verification_version = consensus.verification_version,
                "recomputed the consensus parameters"
            );
            *self.consensus.write() = Some(consensus);
            // class loaders and installed jars were checked under the previous verification rules
            self.class_loaders.clear();
            self.responses.clear();
        }
        if invalidation.gas_price {
            let gas_price = node.fetch_gas_price(&singletons)?;
            tracing::info!(?gas_price, "recomputed the gas price");
            *self.gas_price.write() = Some(gas_price);
        }
        if invalidation.inflation {
            let inflation = node.fetch_inflation(&singletons)?;
            tracing::info!(?inflation, "recomputed the inflation");
            *self.inflation.write() = Some(inflation);
        }
        Ok(())
    }
}

fn lazily<T: Clone>(
    slot: &RwLock<Option<T>>,
    compute: impl FnOnce() -> Result<T, NodeError>,
) -> Result<T, NodeError> {
    if let Some(value) = slot.read().clone() {
        return Ok(value);
    }
    let value = compute()?;
    *slot.write() = Some(value.clone());
    Ok(value)
}
