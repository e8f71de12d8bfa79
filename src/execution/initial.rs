/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Builders of the responses of initial requests, which bootstrap a node before it is
//! initialized: installation of the base jars, creation of the gamete and initialization.
//!
//! Initial requests are neither signed nor charged. Anything that goes wrong rejects them.

use crate::{
    constants,
    context::ExecutionContext,
    error::{ExecutionError, NodeError},
    gas::GasAccount,
    types::{
        FieldSignature, GameteCreationRequest, GameteCreationResponse, InitializationRequest,
        InstrumentedJar, JarStoreInitialRequest, JarStoreInitialResponse, StorageReference,
        StorageValue, TransactionReference, TransactionResponse,
    },
    verifier::VerificationRules,
};

use super::{
    node::{NodeView, Snapshot},
    updates::UpdateExtractor,
};

pub(crate) fn jar_store_initial(
    node: &NodeView<'_>,
    snapshot: &Snapshot,
    request: &JarStoreInitialRequest,
) -> Result<TransactionResponse, NodeError> {
    let consensus = &snapshot.consensus;
    let dependencies = node.jars_of(
        &request.dependencies,
        1,
        request.jar.len() as u64,
        snapshot,
    )?;

    let rules = VerificationRules {
        verification_version: consensus.verification_version,
        is_initial: true,
        skips_verification: consensus.skips_verification,
    };
    let jars: Vec<&InstrumentedJar> = dependencies.iter().map(|(_, jar)| jar).collect();
    let instrumented_jar = node
        .verifier
        .verify_and_instrument(&request.jar, &jars, rules)
        .map_err(|errors| {
            NodeError::rejected(
                errors
                    .first()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "verification failed".to_string()),
            )
        })?;

    Ok(TransactionResponse::JarStoreInitial(JarStoreInitialResponse {
        instrumented_jar,
        dependencies: request.dependencies.clone(),
        verification_version: consensus.verification_version,
    }))
}

pub(crate) fn gamete_creation(
    node: &NodeView<'_>,
    snapshot: &Snapshot,
    reference: TransactionReference,
    request: &GameteCreationRequest,
) -> Result<TransactionResponse, NodeError> {
    let class_loader = node.class_loader(request.classpath, snapshot)?;

    if request.initial_amount < 0 || request.red_initial_amount < 0 {
        return Err(NodeError::rejected(
            "cannot create the gamete: the initial amounts cannot be negative",
        ));
    }

    let kind = snapshot.consensus.signature;
    let algorithm = node
        .signatures
        .get(kind)
        .ok_or_else(|| NodeError::rejected(format!("unsupported signature algorithm {kind}")))?;
    base64url::decode(&request.public_key)
        .map_err(|e| e.to_string())
        .and_then(|bytes| algorithm.public_key_from_encoding(&bytes))
        .map_err(|e| {
            NodeError::rejected(format!("cannot create the gamete: invalid public key: {e}"))
        })?;

    // the gamete calls nothing: its own future reference stands in for the caller
    let caller = StorageReference::new(reference, 0);
    let mut ctx = ExecutionContext::new(
        reference,
        caller,
        node.store,
        &class_loader,
        GasAccount::unbounded(),
    );

    let create = |ctx: &mut ExecutionContext<'_>| -> Result<GameteCreationResponse, ExecutionError> {
        let gamete = ctx.new_object(constants::GAMETE)?;
        ctx.set_balance(gamete, request.initial_amount)?;
        ctx.set_red_balance(gamete, request.red_initial_amount)?;
        ctx.set_field(gamete, FieldSignature::nonce(), StorageValue::BigInteger(0))?;
        ctx.set_field(
            gamete,
            FieldSignature::public_key(),
            StorageValue::String(request.public_key.clone()),
        )?;

        let updates = UpdateExtractor::new(&ctx.heap)
            .extract([gamete])?
            .into_iter()
            .collect();
        Ok(GameteCreationResponse { updates, gamete })
    };

    match create(&mut ctx) {
        Ok(response) => {
            tracing::info!(gamete = %response.gamete, "gamete created");
            Ok(TransactionResponse::GameteCreation(response))
        }
        Err(ExecutionError::Internal(failure)) => Err(failure.into()),
        Err(error) => Err(NodeError::rejected(format!(
            "cannot create the gamete: {error}"
        ))),
    }
}

pub(crate) fn initialization(
    node: &NodeView<'_>,
    snapshot: &Snapshot,
    request: &InitializationRequest,
) -> Result<TransactionResponse, NodeError> {
    let class_loader = node.class_loader(request.classpath, snapshot)?;

    let manifest = node
        .store
        .get_state_uncommitted(&request.manifest)
        .ok_or_else(|| NodeError::rejected(format!("unknown manifest {}", request.manifest)))?;
    let is_account = class_loader
        .capabilities(&manifest.class_tag.class_name)
        .map_or(false, |capabilities| capabilities.is_externally_owned_account);
    if !is_account {
        return Err(NodeError::rejected(
            "the manifest must be an externally owned account",
        ));
    }

    tracing::info!(manifest = %request.manifest, "node initialized");
    Ok(TransactionResponse::Initialization)
}
