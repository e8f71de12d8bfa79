/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Reverification of installed jars against the current verification rules.
//!
//! Every response that installed a jar records the verification version it was produced
//! under. When the node moves to a new version, such responses are checked again, lazily, the
//! first time their jar is needed: dependencies first, then the jar itself, whose original
//! bytes are verified again against the instrumented bytes of its (reverified) dependencies.
//!
//! The outcome replaces the stored response:
//! - if verification still succeeds, the same response tagged with the current version;
//! - if it now fails, or a dependency failed, a `Failed` response with the first error.
//!
//! Replacements are pushed to the store before the jar is used, so that later class loading
//! sees the corrected responses.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    constants,
    error::{InternalFailure, NodeError},
    execution::node::NodeView,
    params::ConsensusParams,
    types::{
        Cause, FailedResponse, InstrumentedJar, JarStoreInitialResponse, Outcome,
        SuccessfulResponse, TransactionReference, TransactionResponse,
    },
    verifier::VerificationRules,
};

/// Cause message of a jar whose dependency failed reverification.
pub const DEPENDENCY_FAILED: &str = "a dependency failed reverification";

pub(crate) struct Reverification<'n, 'a> {
    node: &'n NodeView<'a>,
    consensus: &'n ConsensusParams,
    /// Current response of every transaction visited so far.
    responses: BTreeMap<TransactionReference, TransactionResponse>,
    /// Transactions whose response changed.
    replaced: BTreeSet<TransactionReference>,
}

impl<'n, 'a> Reverification<'n, 'a> {
    pub fn new(node: &'n NodeView<'a>, consensus: &'n ConsensusParams) -> Self {
        Self {
            node,
            consensus,
            responses: BTreeMap::new(),
            replaced: BTreeSet::new(),
        }
    }

    /// The response of `transaction` after reverification.
    pub fn response(&self, transaction: &TransactionReference) -> Option<&TransactionResponse> {
        self.responses.get(transaction)
    }

    /// The responses that changed, by transaction.
    pub fn replacements(&self) -> impl Iterator<Item = (&TransactionReference, &TransactionResponse)> {
        self.replaced
            .iter()
            .filter_map(|reference| self.responses.get(reference).map(|r| (reference, r)))
    }

    /// Reverifies a transaction that installed a jar, after its dependencies.
    pub fn reverify(
        &mut self,
        transaction: TransactionReference,
    ) -> Result<TransactionResponse, NodeError> {
        if let Some(response) = self.responses.get(&transaction) {
            return Ok(response.clone());
        }

        let response = self
            .node
            .store
            .get_response_uncommitted(&transaction)
            .ok_or_else(|| {
                InternalFailure::new(format!("unknown transaction reference {transaction}"))
            })?;
        // a jar that failed an earlier reverification stays failed
        if response.is_failed() {
            self.responses.insert(transaction, response.clone());
            return Ok(response);
        }
        let (_, dependencies, version) = response.instrumented_jar().ok_or_else(|| {
            InternalFailure::new(format!("the transaction {transaction} did not install a jar"))
        })?;
        let dependencies = dependencies.to_vec();

        let mut dependency_jars = Vec::with_capacity(dependencies.len());
        let mut dependency_failed = false;
        for dependency in &dependencies {
            let reverified = self.reverify(*dependency)?;
            match reverified.instrumented_jar() {
                Some((jar, _, _)) => dependency_jars.push(jar.clone()),
                None => dependency_failed = true,
            }
        }

        let reverified = if dependency_failed {
            Some(self.failed(transaction, &response, DEPENDENCY_FAILED)?)
        } else if version == self.consensus.verification_version {
            None
        } else {
            Some(self.verify_again(transaction, &response, &dependency_jars)?)
        };

        let current = match reverified {
            Some(replacement) => {
                self.replaced.insert(transaction);
                replacement
            }
            None => response,
        };
        self.responses.insert(transaction, current.clone());
        Ok(current)
    }

    /// Verifies the original jar again and yields the replacement response.
    fn verify_again(
        &self,
        transaction: TransactionReference,
        response: &TransactionResponse,
        dependency_jars: &[InstrumentedJar],
    ) -> Result<TransactionResponse, NodeError> {
        let request = self.node.get_request(&transaction).ok_or_else(|| {
            InternalFailure::new(format!("cannot find the request of transaction {transaction}"))
        })?;
        let (jar, _) = request.jar().ok_or_else(|| {
            InternalFailure::new(format!("the request of transaction {transaction} did not store a jar"))
        })?;

        let rules = VerificationRules {
            verification_version: self.consensus.verification_version,
            is_initial: request.is_initial(),
            skips_verification: self.consensus.skips_verification,
        };
        let dependencies: Vec<&InstrumentedJar> = dependency_jars.iter().collect();

        match self.node.verifier.verify_and_instrument(jar, &dependencies, rules) {
            Ok(_) => {
                tracing::info!(
                    %transaction,
                    verification_version = self.consensus.verification_version,
                    "jar reverified under the current verification version"
                );
                Ok(with_version(
                    response.clone(),
                    self.consensus.verification_version,
                ))
            }
            Err(errors) => {
                let message = errors
                    .first()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "verification failed".to_string());
                self.failed(transaction, response, &message)
            }
        }
    }

    /// The failed response replacing a jar installation. Updates and gas of the original
    /// response are kept, no penalty is charged. Initial jars cannot fail after the fact.
    fn failed(
        &self,
        transaction: TransactionReference,
        response: &TransactionResponse,
        message: &str,
    ) -> Result<TransactionResponse, NodeError> {
        tracing::warn!(%transaction, reason = message, "jar failed reverification");
        match response {
            TransactionResponse::Success(success) => {
                let max_length = self.consensus.max_error_length as usize;
                Ok(TransactionResponse::Failed(FailedResponse {
                    cause: Cause::new(
                        constants::VERIFICATION_EXCEPTION,
                        &message.chars().take(max_length).collect::<String>(),
                    ),
                    updates: success.updates.clone(),
                    gas: success.gas,
                    gas_for_penalty: 0,
                }))
            }
            _ => Err(InternalFailure::new(format!(
                "the initial jar installed by {transaction} failed reverification: {message}"
            ))
            .into()),
        }
    }

    /// Writes the replaced responses to the store and to the response cache.
    pub fn push_replacements(&self) {
        for (reference, response) in self.replacements() {
            let Some(request) = self.node.get_request(reference) else {
                continue;
            };
            self.node.store.push(reference, &request, Ok(response));
            self.node
                .cache
                .responses()
                .put(*reference, std::sync::Arc::new(response.clone()));
        }
    }
}

fn with_version(response: TransactionResponse, verification_version: u32) -> TransactionResponse {
    match response {
        TransactionResponse::JarStoreInitial(initial) => {
            TransactionResponse::JarStoreInitial(JarStoreInitialResponse {
                verification_version,
                ..initial
            })
        }
        TransactionResponse::Success(SuccessfulResponse {
            outcome:
                Outcome::JarStore {
                    instrumented_jar,
                    dependencies,
                    ..
                },
            updates,
            events,
            gas,
        }) => TransactionResponse::Success(SuccessfulResponse {
            outcome: Outcome::JarStore {
                instrumented_jar,
                dependencies,
                verification_version,
            },
            updates,
            events,
            gas,
        }),
        other => other,
    }
}
