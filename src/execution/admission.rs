/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Admission of non-initial requests.
//!
//! The checks run in a fixed order and stop at the first failure, with a reason that callers
//! can rely on. They read the uncommitted tip of the store, so that a request sees the effects
//! of those processed before it in the same batch. Nothing is charged and nothing is written
//! by a rejected request.

use crate::{
    class_loader::{Capabilities, EngineClassLoader},
    constants,
    error::TransactionRejected,
    gas,
    signatures::PublicKey,
    types::{
        Cause, FailedResponse, FieldSignature, GasCosts, NonInitialPayload,
        NonInitialTransactionRequest, ObjectState, StorageReference, StorageValue,
        TransactionReference, TransactionRequest, TransactionResponse, Update,
    },
};

use super::{
    node::{NodeView, Snapshot},
    phase,
};

/// What admission found out about a request.
#[derive(Clone, Debug)]
pub(crate) struct Admitted {
    pub payer: StorageReference,
    /// The call must not have side effects besides gas and nonce bookkeeping.
    pub checks_side_effects: bool,
    /// Checked exceptions are a normal outcome of the call.
    pub throws_exceptions: bool,
}

pub(crate) fn admit(
    node: &NodeView<'_>,
    snapshot: &Snapshot,
    reference: TransactionReference,
    request: &NonInitialTransactionRequest,
    class_loader: &EngineClassLoader,
    view: bool,
) -> Result<Admitted, TransactionRejected> {
    let consensus = &snapshot.consensus;

    // 1. the caller is an externally owned account
    let caller_state = state_of(node, request.caller)?;
    let caller = capabilities_of(class_loader, &caller_state);
    if !caller.is_externally_owned_account {
        return Err(TransactionRejected::new(
            "the caller of a request must be an externally owned account",
        ));
    }

    let method = match &request.payload {
        NonInitialPayload::InstanceMethodCall { method, .. }
        | NonInitialPayload::StaticMethodCall { method, .. } => class_loader.method(method),
        _ => None,
    };
    let self_charged = consensus.allows_self_charged
        && method.map_or(false, |method| method.is_self_charged);
    let payer = match request.receiver() {
        Some(receiver) if self_charged => receiver,
        _ => request.caller,
    };

    // 2. the payer is a contract
    let payer_state = if payer == request.caller {
        caller_state.clone()
    } else {
        let payer_state = state_of(node, payer)?;
        if !capabilities_of(class_loader, &payer_state).is_contract {
            return Err(TransactionRejected::new(
                "the payer of a request must be a contract",
            ));
        }
        payer_state
    };

    // 3. the gas limit is within bounds
    let max_gas = if view {
        node.config.max_gas_per_view_transaction
    } else {
        consensus.max_gas_per_transaction
    };
    if request.gas_limit > max_gas {
        return Err(TransactionRejected::new(format!(
            "the gas limit of the request is larger than the maximum allowed ({} > {max_gas})",
            request.gas_limit
        )));
    }

    // 4. the gas limit is enough to pay for the rejection of the request itself
    let minimal_gas = minimal_gas_required(
        request,
        payer,
        snapshot.validators,
        class_loader,
        consensus.max_error_length,
    );
    if request.gas_limit < minimal_gas {
        return Err(TransactionRejected::new(format!(
            "not enough gas to start the transaction, expected at least {minimal_gas} units of gas"
        )));
    }

    let checks_signed_request = !view && request.is_signed() && snapshot.initialized;

    // 5. the gas price is not below the current one
    if checks_signed_request && !consensus.ignores_gas_price {
        if let Some(gas_price) = snapshot.gas_price {
            if request.gas_price < gas_price {
                return Err(TransactionRejected::new(format!(
                    "the gas price of the request is smaller than the current gas price ({} < {gas_price})",
                    request.gas_price
                )));
            }
        }
    }

    // 6. the request is for this chain
    if checks_signed_request && request.chain_id != consensus.chain_id {
        return Err(TransactionRejected::new(format!(
            "incorrect chain id: the request reports {} but the node requires {}",
            request.chain_id, consensus.chain_id
        )));
    }

    // 7. the signature is valid
    if checks_signed_request && !is_unsigned_faucet_call(snapshot, request, &caller_state) {
        signature_must_be_valid(node, snapshot, reference, request, &caller_state, caller)?;
    }

    // 8. the nonce is the next one of the caller
    if !view {
        let expected = big_integer_field(&caller_state, &FieldSignature::nonce());
        if i128::from(request.nonce) != expected {
            return Err(TransactionRejected::new(format!(
                "incorrect nonce: the request reports {} but the account {} contains {expected}",
                request.nonce, request.caller
            )));
        }
    }

    // 9. the payer can buy all the gas of the request
    // funds beyond the range of the balances can buy any gas
    let funds = big_integer_field(&payer_state, &FieldSignature::balance())
        .saturating_add(big_integer_field(&payer_state, &FieldSignature::red_balance()));
    let cost = phase::cost_of(request.gas_limit, request.gas_price);
    if funds < cost {
        return Err(TransactionRejected::new(format!(
            "the payer has not enough funds to buy {} units of gas",
            request.gas_limit
        )));
    }

    let method_is_view = method.map_or(false, |method| method.is_view);
    Ok(Admitted {
        payer,
        checks_side_effects: view || method_is_view,
        throws_exceptions: method.map_or(false, |method| method.throws_exceptions),
    })
}

/// The gas needed to start the transaction and to pay for recording its failure: the base
/// cost, the storage of the request, the storage of the largest failed response the request
/// can produce and the loading of the jars of its classpath.
pub(crate) fn minimal_gas_required(
    request: &NonInitialTransactionRequest,
    payer: StorageReference,
    validators: Option<StorageReference>,
    class_loader: &EngineClassLoader,
    max_error_length: u32,
) -> u64 {
    let request_size = TransactionRequest::NonInitial(request.clone()).size();
    let failed_size =
        largest_failed_response(request.caller, payer, validators, max_error_length).size();

    gas::CPU_BASE_TRANSACTION_COST
        .saturating_add(gas::storage_cost_of_bytes(request_size))
        .saturating_add(gas::storage_cost_of_bytes(failed_size))
        .saturating_add(gas::cost_of_loading_jars(class_loader.lengths_of_jars()))
}

fn largest_failed_response(
    caller: StorageReference,
    payer: StorageReference,
    validators: Option<StorageReference>,
    max_error_length: u32,
) -> TransactionResponse {
    let coins = StorageValue::BigInteger(i128::MAX);
    let mut updates = vec![
        Update::field(caller, FieldSignature::nonce(), coins.clone()),
        Update::field(payer, FieldSignature::balance(), coins.clone()),
        Update::field(payer, FieldSignature::red_balance(), coins.clone()),
    ];
    if let Some(validators) = validators {
        updates.push(Update::field(validators, FieldSignature::balance(), coins));
    }

    TransactionResponse::Failed(FailedResponse {
        cause: Cause::new(
            constants::SIDE_EFFECTS_IN_VIEW_METHOD_EXCEPTION,
            &"x".repeat(max_error_length as usize),
        ),
        updates,
        gas: GasCosts {
            cpu: u64::MAX,
            ram: u64::MAX,
            storage: u64::MAX,
        },
        gas_for_penalty: u64::MAX,
    })
}

fn state_of(
    node: &NodeView<'_>,
    object: StorageReference,
) -> Result<ObjectState, TransactionRejected> {
    node.store
        .get_state_uncommitted(&object)
        .ok_or_else(|| TransactionRejected::new(format!("unknown object {object}")))
}

fn capabilities_of(class_loader: &EngineClassLoader, state: &ObjectState) -> Capabilities {
    class_loader
        .capabilities(&state.class_tag.class_name)
        .unwrap_or_default()
}

fn big_integer_field(state: &ObjectState, field: &FieldSignature) -> i128 {
    state
        .fields
        .get(field)
        .and_then(StorageValue::as_big_integer)
        .unwrap_or(0)
}

/// The gamete may send coins without signing when the consensus allows it.
fn is_unsigned_faucet_call(
    snapshot: &Snapshot,
    request: &NonInitialTransactionRequest,
    caller_state: &ObjectState,
) -> bool {
    snapshot.consensus.allows_unsigned_faucet
        && caller_state.class_tag.class_name == constants::GAMETE
        && match &request.payload {
            NonInitialPayload::InstanceMethodCall {
                method, receiver, ..
            } => *receiver == request.caller && method.name.starts_with("faucet"),
            _ => false,
        }
}

fn signature_must_be_valid(
    node: &NodeView<'_>,
    snapshot: &Snapshot,
    reference: TransactionReference,
    request: &NonInitialTransactionRequest,
    caller_state: &ObjectState,
    caller: Capabilities,
) -> Result<(), TransactionRejected> {
    let valid = match node.cache.signatures().get(&reference) {
        Some(valid) => valid,
        None => {
            let valid = verify_signature(node, snapshot, request, caller_state, caller)?;
            node.cache.signatures().put(reference, valid);
            valid
        }
    };

    if valid {
        Ok(())
    } else {
        Err(TransactionRejected::new("invalid request signature"))
    }
}

fn verify_signature(
    node: &NodeView<'_>,
    snapshot: &Snapshot,
    request: &NonInitialTransactionRequest,
    caller_state: &ObjectState,
    caller: Capabilities,
) -> Result<bool, TransactionRejected> {
    let kind = caller.signature.unwrap_or(snapshot.consensus.signature);
    let algorithm = node.signatures.get(kind).ok_or_else(|| {
        TransactionRejected::new(format!("unsupported signature algorithm {kind}"))
    })?;

    let encoded = caller_state
        .fields
        .get(&FieldSignature::public_key())
        .and_then(StorageValue::as_str)
        .ok_or_else(|| TransactionRejected::new("the caller has no public key"))?;
    let public_key: PublicKey = base64url::decode(encoded)
        .map_err(|e| e.to_string())
        .and_then(|bytes| algorithm.public_key_from_encoding(&bytes))
        .map_err(|e| {
            TransactionRejected::new(format!("the public key of the caller is invalid: {e}"))
        })?;

    let Some(signature) = &request.signature else {
        return Ok(false);
    };
    Ok(algorithm.verify(&request.bytes_to_sign(), &public_key, signature))
}
