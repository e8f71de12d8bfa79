/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The node as seen by the execution of one transaction: the store, the caches and the
//! external collaborators, together with the derived values the transaction runs under.

use std::{collections::HashSet, sync::Arc};

use crate::{
    cache::{NodeCache, Singletons},
    class_loader::EngineClassLoader,
    constants,
    error::{InternalFailure, NodeError, TransactionRejected},
    params::{ConsensusParams, RuntimeConfig},
    reverification::Reverification,
    signatures::SignatureAlgorithms,
    store::Store,
    types::{
        InstrumentedJar, MethodSignature, NonInitialPayload, NonInitialTransactionRequest,
        StorageReference, StorageValue, TransactionReference, TransactionRequest,
        TransactionResponse,
    },
    verifier::Verifier,
    vm::Vm,
};

use super::{initial, non_initial::NonInitialBuilder};

/// Derived values a transaction runs under. Taken once before admission and never refreshed
/// while the transaction runs.
#[derive(Clone, Debug)]
pub(crate) struct Snapshot {
    pub consensus: Arc<ConsensusParams>,
    pub initialized: bool,
    pub validators: Option<StorageReference>,
    /// Current gas price, if the gas station is known and does not ignore prices.
    pub gas_price: Option<u64>,
    /// Inflation in units per million.
    pub inflation: i64,
    /// Whether `consensus` holds the current verification rules. Jars are reverified, and
    /// class loaders cached, only if it does.
    pub reverifies: bool,
}

pub(crate) struct NodeView<'a> {
    pub store: &'a dyn Store,
    pub cache: &'a NodeCache,
    pub vm: &'a dyn Vm,
    pub verifier: &'a dyn Verifier,
    pub signatures: &'a SignatureAlgorithms,
    pub config: &'a RuntimeConfig,
}

impl<'a> NodeView<'a> {
    pub fn is_initialized(&self) -> bool {
        self.store.get_manifest_uncommitted().is_some()
    }

    pub fn get_request(&self, reference: &TransactionReference) -> Option<Arc<TransactionRequest>> {
        self.cache
            .requests()
            .get_or_compute(reference, || {
                Ok::<_, std::convert::Infallible>(self.store.get_request(reference).map(Arc::new))
            })
            .unwrap_or(None)
    }

    /// The committed response of a transaction. Responses that installed a jar are reverified
    /// first, if the verification rules changed since they were produced.
    pub fn get_response(
        &self,
        reference: &TransactionReference,
    ) -> Result<Option<Arc<TransactionResponse>>, NodeError> {
        self.cache.responses().get_or_compute(reference, || {
            let Some(response) = self.store.get_response(reference) else {
                return Ok(None);
            };
            if response.instrumented_jar().is_none() {
                return Ok(Some(Arc::new(response)));
            }

            let consensus = self.consensus()?;
            let mut reverification = Reverification::new(self, &consensus);
            let response = reverification.reverify(*reference)?;
            reverification.push_replacements();
            Ok(Some(Arc::new(response)))
        })
    }

    /* ↓↓↓ Derived values ↓↓↓ */

    pub fn consensus(&self) -> Result<Arc<ConsensusParams>, NodeError> {
        self.cache.consensus(|| {
            if self.is_initialized() {
                self.fetch_consensus(&self.singletons()?)
            } else {
                Ok(self.config.genesis_consensus.clone())
            }
        })
    }

    pub fn singletons(&self) -> Result<Singletons, NodeError> {
        self.cache.singletons(|| self.fetch_singletons())
    }

    pub fn gas_price(&self) -> Result<Option<u64>, NodeError> {
        self.cache
            .gas_price(|| self.fetch_gas_price(&self.singletons()?))
    }

    pub fn inflation(&self) -> Result<Option<i64>, NodeError> {
        self.cache
            .inflation(|| self.fetch_inflation(&self.singletons()?))
    }

    /// The derived values for a transaction submitted to the node, computing those missing.
    pub fn snapshot(&self) -> Result<Snapshot, NodeError> {
        let consensus = self.consensus()?;
        if !self.is_initialized() {
            return Ok(Snapshot {
                consensus,
                initialized: false,
                validators: None,
                gas_price: None,
                inflation: 0,
                reverifies: true,
            });
        }

        let singletons = self.singletons()?;
        let gas_price = if consensus.ignores_gas_price {
            None
        } else {
            self.gas_price()?
        };
        let inflation = self.inflation()?.unwrap_or(consensus.initial_inflation);
        Ok(Snapshot {
            consensus,
            initialized: true,
            validators: singletons.validators,
            gas_price,
            inflation,
            reverifies: true,
        })
    }

    /// The derived values for the view calls that recompute the derived values themselves.
    /// Nothing is computed: such calls are free and pay no validators. While the consensus
    /// is being computed for the first time, the verification rules are unknown and installed
    /// jars are used as they are.
    fn query_snapshot(&self) -> Snapshot {
        let initialized = self.is_initialized();
        let cached = self.cache.peek_consensus();
        Snapshot {
            reverifies: cached.is_some() || !initialized,
            consensus: cached.unwrap_or_else(|| Arc::new(self.config.genesis_consensus.clone())),
            initialized,
            validators: None,
            gas_price: None,
            inflation: 0,
        }
    }

    pub fn fetch_singletons(&self) -> Result<Singletons, NodeError> {
        let Some(manifest) = self.store.get_manifest_uncommitted() else {
            return Ok(Singletons::default());
        };

        let query = self.query_snapshot();
        let reference_of = |method: MethodSignature| -> Result<Option<StorageReference>, NodeError> {
            match self.query(manifest, &method, manifest, &query)? {
                StorageValue::Null => Ok(None),
                StorageValue::Reference(reference) => Ok(Some(reference)),
                other => Err(unexpected(&method, &other)),
            }
        };

        Ok(Singletons {
            manifest: Some(manifest),
            validators: reference_of(constants::get_validators())?,
            gas_station: reference_of(constants::get_gas_station())?,
            versions: reference_of(constants::get_versions())?,
        })
    }

    /// Rebuilds every consensus parameter from the state of the manifest contracts.
    pub fn fetch_consensus(&self, singletons: &Singletons) -> Result<ConsensusParams, NodeError> {
        let mut consensus = self.config.genesis_consensus.clone();
        let Some(manifest) = singletons.manifest else {
            return Ok(consensus);
        };

        let query = self.query_snapshot();
        let ask = |receiver: StorageReference, method: MethodSignature| {
            self.query(manifest, &method, receiver, &query)
                .map(|value| (method, value))
        };

        consensus.chain_id = as_string(ask(manifest, constants::get_chain_id())?)?;
        consensus.max_error_length = as_u32(ask(manifest, constants::get_max_error_length())?)?;
        consensus.max_dependencies = as_u32(ask(manifest, constants::get_max_dependencies())?)?;
        consensus.max_cumulative_size_of_dependencies = as_u64(ask(
            manifest,
            constants::get_max_cumulative_size_of_dependencies(),
        )?)?;
        consensus.allows_self_charged = as_bool(ask(manifest, constants::allows_self_charged())?)?;
        consensus.allows_unsigned_faucet =
            as_bool(ask(manifest, constants::allows_unsigned_faucet())?)?;
        consensus.skips_verification = as_bool(ask(manifest, constants::skips_verification())?)?;
        let (method, signature) = ask(manifest, constants::get_signature())?;
        consensus.signature = signature
            .as_str()
            .and_then(|name| name.parse().ok())
            .ok_or_else(|| unexpected(&method, &signature))?;

        if let Some(gas_station) = singletons.gas_station {
            consensus.max_gas_per_transaction =
                as_u64(ask(gas_station, constants::get_max_gas_per_transaction())?)?;
            consensus.initial_gas_price =
                as_u64(ask(gas_station, constants::get_initial_gas_price())?)?;
            consensus.target_gas_at_reward =
                as_u64(ask(gas_station, constants::get_target_gas_at_reward())?)?;
            consensus.oblivion = as_u64(ask(gas_station, constants::get_oblivion())?)?;
            consensus.ignores_gas_price =
                as_bool(ask(gas_station, constants::ignores_gas_price())?)?;
        }

        if let Some(validators) = singletons.validators {
            let (method, inflation) = ask(validators, constants::get_initial_inflation())?;
            consensus.initial_inflation = inflation
                .as_long()
                .ok_or_else(|| unexpected(&method, &inflation))?;
        }

        if let Some(versions) = singletons.versions {
            consensus.verification_version =
                as_u32(ask(versions, constants::get_verification_version())?)?;
        }

        Ok(consensus)
    }

    pub fn fetch_gas_price(&self, singletons: &Singletons) -> Result<Option<u64>, NodeError> {
        let (Some(manifest), Some(gas_station)) = (singletons.manifest, singletons.gas_station)
        else {
            return Ok(None);
        };
        let method = constants::get_gas_price();
        let value = self.query(manifest, &method, gas_station, &self.query_snapshot())?;
        as_u64((method, value)).map(Some)
    }

    pub fn fetch_inflation(&self, singletons: &Singletons) -> Result<Option<i64>, NodeError> {
        let (Some(manifest), Some(validators)) = (singletons.manifest, singletons.validators)
        else {
            return Ok(None);
        };
        let method = constants::get_current_inflation();
        let value = self.query(manifest, &method, validators, &self.query_snapshot())?;
        value
            .as_long()
            .map(Some)
            .ok_or_else(|| unexpected(&method, &value))
    }

    /// Runs a free view call with a fixed gas allowance, on behalf of `caller`, in the
    /// classpath that installed the class of the caller.
    fn query(
        &self,
        caller: StorageReference,
        method: &MethodSignature,
        receiver: StorageReference,
        snapshot: &Snapshot,
    ) -> Result<StorageValue, NodeError> {
        let classpath = self
            .store
            .get_state_uncommitted(&caller)
            .map(|state| state.class_tag.jar)
            .ok_or_else(|| InternalFailure::new(format!("unknown object {caller}")))?;

        let request = NonInitialTransactionRequest {
            caller,
            gas_limit: constants::GAS_FOR_CONSENSUS_QUERY,
            gas_price: 0,
            classpath,
            nonce: 0,
            chain_id: snapshot.consensus.chain_id.clone(),
            payload: NonInitialPayload::InstanceMethodCall {
                method: method.clone(),
                receiver,
                actuals: Vec::new(),
            },
            signature: None,
        };
        let reference = TransactionRequest::from(request.clone()).reference();

        let response = NonInitialBuilder::new(self, snapshot, reference, &request, true)
            .and_then(|builder| builder.build())
            .map_err(|error| match error {
                NodeError::Rejected(rejected) => NodeError::Internal(InternalFailure::new(
                    format!("the query {method} was rejected: {rejected}"),
                )),
                internal => internal,
            })?;

        match &response {
            TransactionResponse::Success(_) => response
                .result()
                .cloned()
                .ok_or_else(|| InternalFailure::new(format!("{method} returned no value")).into()),
            TransactionResponse::Exception(response) => Err(InternalFailure::new(format!(
                "the query {method} threw {}",
                response.cause.class_name
            ))
            .into()),
            TransactionResponse::Failed(response) => Err(InternalFailure::new(format!(
                "the query {method} failed: {}",
                response.cause.message
            ))
            .into()),
            _ => Err(InternalFailure::new(format!("unexpected response to the query {method}")).into()),
        }
    }

    /* ↓↓↓ Class loading ↓↓↓ */

    /// The class loader of a classpath, built and cached on first use.
    pub fn class_loader(
        &self,
        classpath: TransactionReference,
        snapshot: &Snapshot,
    ) -> Result<Arc<EngineClassLoader>, NodeError> {
        if let Some(class_loader) = self.cache.class_loaders().get(&classpath) {
            return Ok(class_loader);
        }

        let jars = self.jars_of(&[classpath], 0, 0, snapshot)?;
        let class_loader = Arc::new(EngineClassLoader::build(classpath, jars, self.vm)?);
        if snapshot.reverifies {
            self.cache
                .class_loaders()
                .put(classpath, class_loader.clone());
        }
        Ok(class_loader)
    }

    /// The instrumented jars reachable from `roots`, dependencies first, after reverification.
    /// `extra_jars` and `extra_size` account for a jar being installed on top of them.
    pub fn jars_of(
        &self,
        roots: &[TransactionReference],
        extra_jars: usize,
        extra_size: u64,
        snapshot: &Snapshot,
    ) -> Result<Vec<(TransactionReference, InstrumentedJar)>, NodeError> {
        let consensus = &snapshot.consensus;
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut cumulative_size = extra_size;
        for root in roots {
            self.collect_jars(*root, &mut seen, &mut order, &mut cumulative_size)?;
        }

        if order.len() + extra_jars > consensus.max_dependencies as usize {
            return Err(NodeError::rejected(format!(
                "too many dependencies in classpath: max is {}",
                consensus.max_dependencies
            )));
        }
        if cumulative_size > consensus.max_cumulative_size_of_dependencies {
            return Err(NodeError::rejected(format!(
                "too large cumulative size of dependencies in classpath: max is {} bytes",
                consensus.max_cumulative_size_of_dependencies
            )));
        }

        let reverification = if snapshot.reverifies {
            let mut reverification = Reverification::new(self, consensus);
            for root in roots {
                reverification.reverify(*root)?;
            }
            reverification.push_replacements();
            Some(reverification)
        } else {
            None
        };

        order
            .into_iter()
            .map(|reference| {
                let current = match &reverification {
                    Some(reverification) => reverification.response(&reference).cloned(),
                    None => self.store.get_response_uncommitted(&reference),
                };
                current
                    .as_ref()
                    .and_then(TransactionResponse::instrumented_jar)
                    .map(|(jar, _, _)| (reference, jar.clone()))
                    .ok_or_else(|| {
                        NodeError::rejected(format!(
                            "the jar installed by {reference} failed reverification"
                        ))
                    })
            })
            .collect()
    }

    fn collect_jars(
        &self,
        reference: TransactionReference,
        seen: &mut HashSet<TransactionReference>,
        order: &mut Vec<TransactionReference>,
        cumulative_size: &mut u64,
    ) -> Result<(), TransactionRejected> {
        if !seen.insert(reference) {
            return Ok(());
        }

        let response = self
            .store
            .get_response_uncommitted(&reference)
            .ok_or_else(|| TransactionRejected::new(format!("unknown transaction reference {reference}")))?;
        let (jar, dependencies, _) = response.instrumented_jar().ok_or_else(|| {
            TransactionRejected::new(format!("the transaction {reference} did not install a jar"))
        })?;

        *cumulative_size = cumulative_size.saturating_add(jar.len() as u64);
        for dependency in dependencies {
            self.collect_jars(*dependency, seen, order, cumulative_size)?;
        }
        order.push(reference);
        Ok(())
    }

    /* ↓↓↓ Execution ↓↓↓ */

    /// Admits and executes a request, yielding its response. Nothing is pushed to the store.
    pub fn build(
        &self,
        reference: TransactionReference,
        request: &TransactionRequest,
        snapshot: &Snapshot,
        view: bool,
    ) -> Result<TransactionResponse, NodeError> {
        match request {
            TransactionRequest::NonInitial(request) => {
                NonInitialBuilder::new(self, snapshot, reference, request, view)?.build()
            }
            _ if snapshot.initialized => Err(NodeError::rejected(
                "cannot run an initial transaction in an already initialized node",
            )),
            TransactionRequest::JarStoreInitial(request) => {
                initial::jar_store_initial(self, snapshot, request)
            }
            TransactionRequest::GameteCreation(request) => {
                initial::gamete_creation(self, snapshot, reference, request)
            }
            TransactionRequest::Initialization(request) => {
                initial::initialization(self, snapshot, request)
            }
        }
    }
}

fn unexpected(method: &MethodSignature, value: &StorageValue) -> NodeError {
    InternalFailure::new(format!("unexpected value {value} returned by {method}")).into()
}

fn as_string((method, value): (MethodSignature, StorageValue)) -> Result<String, NodeError> {
    match value {
        StorageValue::String(string) => Ok(string),
        other => Err(unexpected(&method, &other)),
    }
}

fn as_bool((method, value): (MethodSignature, StorageValue)) -> Result<bool, NodeError> {
    value.as_bool().ok_or_else(|| unexpected(&method, &value))
}

fn as_u32((method, value): (MethodSignature, StorageValue)) -> Result<u32, NodeError> {
    value
        .as_int()
        .and_then(|int| u32::try_from(int).ok())
        .ok_or_else(|| unexpected(&method, &value))
}

/// Accepts longs and big integers, the two types the manifest uses for amounts.
fn as_u64((method, value): (MethodSignature, StorageValue)) -> Result<u64, NodeError> {
    let converted = match &value {
        StorageValue::Long(long) => u64::try_from(*long).ok(),
        StorageValue::BigInteger(big) => u64::try_from(*big).ok(),
        _ => None,
    };
    converted.ok_or_else(|| unexpected(&method, &value))
}
