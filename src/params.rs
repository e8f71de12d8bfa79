/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The input structures that parameterize transaction processing.
//!
//! [ConsensusParams] is the node-wide snapshot of the on-chain manifest. It is never mutated:
//! the node cache replaces it wholesale when a response signals that it might have changed.
//! [RuntimeConfig] holds the local, node-specific tuning.

use crate::signatures::SignatureKind;

/// Consensus parameters, as read from the manifest contracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusParams {
    pub chain_id: String,
    /// Maximal length of the message of the cause of a failed response.
    pub max_error_length: u32,
    /// Maximal number of jars in a classpath, including transitive dependencies.
    pub max_dependencies: u32,
    /// Maximal cumulative size, in bytes, of the jars in a classpath.
    pub max_cumulative_size_of_dependencies: u64,
    /// Whether instance methods can be charged to their receiver.
    pub allows_self_charged: bool,
    pub allows_unsigned_faucet: bool,
    pub skips_verification: bool,
    /// Signature algorithm of accounts that do not declare a specific one.
    pub signature: SignatureKind,
    pub max_gas_per_transaction: u64,
    pub initial_gas_price: u64,
    pub target_gas_at_reward: u64,
    pub oblivion: u64,
    pub ignores_gas_price: bool,
    /// Inflation, in units per million, applied to the gas paid to the validators.
    pub initial_inflation: i64,
    pub verification_version: u32,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            chain_id: String::new(),
            max_error_length: 300,
            max_dependencies: 20,
            max_cumulative_size_of_dependencies: 10_000_000,
            allows_self_charged: false,
            allows_unsigned_faucet: false,
            skips_verification: false,
            signature: SignatureKind::Ed25519,
            max_gas_per_transaction: 1_000_000_000,
            initial_gas_price: 100,
            target_gas_at_reward: 1_000_000,
            oblivion: 250_000,
            ignores_gas_price: false,
            initial_inflation: 0,
            verification_version: 0,
        }
    }
}

/// Local configuration of a node running the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub request_cache_size: usize,
    pub response_cache_size: usize,
    pub class_loader_cache_size: usize,
    pub signature_cache_size: usize,
    /// Ceiling of the gas limit of view transactions.
    pub max_gas_per_view_transaction: u64,
    /// Stack size of the thread that runs the body of a transaction.
    pub execution_stack_size: usize,
    /// Consensus parameters used until the node is initialized.
    pub genesis_consensus: ConsensusParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            request_cache_size: 1_000,
            response_cache_size: 1_000,
            class_loader_cache_size: 200,
            signature_cache_size: 1_000,
            max_gas_per_view_transaction: 100_000_000,
            execution_stack_size: 8 * 1024 * 1024,
            genesis_consensus: ConsensusParams::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_genesis_consensus(mut self, consensus: ConsensusParams) -> Self {
        self.genesis_consensus = consensus;
        self
    }

    pub fn set_max_gas_per_view_transaction(mut self, max_gas: u64) -> Self {
        self.max_gas_per_view_transaction = max_gas;
        self
    }

    /// specify the sizes of the request, response, class loader and signature caches.
    pub fn set_cache_sizes(
        mut self,
        requests: usize,
        responses: usize,
        class_loaders: usize,
        signatures: usize,
    ) -> Self {
        self.request_cache_size = requests;
        self.response_cache_size = responses;
        self.class_loader_cache_size = class_loaders;
        self.signature_cache_size = signatures;
        self
    }

    pub fn set_execution_stack_size(mut self, stack_size: usize) -> Self {
        self.execution_stack_size = stack_size;
        self
    }
}
