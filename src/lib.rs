/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Hotmoka Runtime is the deterministic **transaction execution engine** of a node running
//! gas-metered smart contracts. For each request it decides whether the request can start,
//! executes it, and computes the exact set of state updates it produced:
//!
//! ```text
//! f(S, REQ) -> RESP | REJ
//!
//! S    = state at the uncommitted tip of the store
//! REQ  = transaction request
//! RESP = transaction response, carrying the updates to S and the gas consumed
//! REJ  = reason of the rejection, if the request could not start
//! ```
//!
//! The same request against the same state always yields the same response, so that
//! independent nodes agree on the outcome of every transaction.
//!
//! ### Example
//!
//! ```rust
//! // prepare a store, a virtual machine and a verifier, then process requests.
//! let runtime = hotmoka_runtime::Runtime::new(store, vm, verifier);
//! let response = runtime.process(&request)?;
//! ```
//!
//! In summary, the [Runtime](transition::Runtime) admits a request and [executes](execution)
//! it against an [ExecutionContext](context::ExecutionContext), which charges [gas] for every
//! step and collects the modified objects of the transaction. The node [cache] keeps the
//! derived values (consensus parameters, gas price, inflation) coherent with the state, and
//! [reverification] keeps installed jars coherent with the current verification rules. The
//! contract code itself runs in a [Vm](vm::Vm); jars are checked by a [Verifier](verifier::Verifier).

pub mod cache;
pub use cache::NodeCache;

pub mod class_loader;
pub use class_loader::{Capabilities, EngineClassLoader};

pub mod constants;

pub mod context;
pub use context::ExecutionContext;

pub mod error;
pub use error::{ExecutionError, InternalFailure, NodeError, Throwable, TransactionRejected};

pub mod execution;

pub mod gas;

pub mod params;
pub use params::{ConsensusParams, RuntimeConfig};

pub mod reverification;

pub mod signatures;
pub use signatures::{SignatureAlgorithm, SignatureKind};

pub mod store;
pub use store::Store;

pub mod transition;
pub use transition::Runtime;

pub mod types;

pub mod verifier;
pub use verifier::{VerificationError, VerificationRules, Verifier};

pub mod vm;
pub use vm::{ClassDescriptor, Invocation, MethodDescriptor, Vm};
