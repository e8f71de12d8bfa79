/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines the coin movements around the execution of a non-initial transaction.
//!
//! Common Phases include:
//! - Pre-Charge: the payer is debited for all the gas of the request, red coins first.
//! - Charge: unused gas is refunded to the payer, green coins first up to the amount taken
//!   from green in Pre-Charge, and the price of the consumed gas is sent to the validators,
//!   scaled by the current inflation.
//!
//! A failed transaction gets no refund: the payer is debited for the whole gas limit and all
//! of it goes to the validators.

use crate::{context::ExecutionContext, error::ExecutionError, types::StorageReference};

/// Inflation is expressed in units per million.
pub(crate) const INFLATION_UNIT: i128 = 1_000_000;

/// How a cost is split between the red and green balances of the payer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Split {
    pub red: i128,
    pub green: i128,
}

/// Red coins pay first; green coins only cover the shortfall.
pub(crate) fn split_payment(red_balance: i128, cost: i128) -> Split {
    let red = red_balance.max(0).min(cost);
    Split {
        red,
        green: cost - red,
    }
}

/// Green coins are refunded first, never more than what was taken from green.
pub(crate) fn split_refund(refund: i128, green_taken: i128) -> Split {
    let green = refund.min(green_taken.max(0));
    Split {
        red: refund - green,
        green,
    }
}

/// The amount the validators receive for `amount` coins of gas.
pub(crate) fn with_inflation(amount: i128, inflation: i64) -> i128 {
    let scaled = amount.saturating_mul(INFLATION_UNIT + i128::from(inflation)) / INFLATION_UNIT;
    scaled.max(0)
}

/// The cost of `gas` units at `gas_price`.
pub(crate) fn cost_of(gas: u64, gas_price: u64) -> i128 {
    i128::from(gas).saturating_mul(i128::from(gas_price))
}

/// Takes `cost` coins from the payer and returns how many came from its green balance.
pub(crate) fn debit_payer(
    ctx: &mut ExecutionContext<'_>,
    payer: StorageReference,
    cost: i128,
) -> Result<i128, ExecutionError> {
    let red_balance = ctx.red_balance(payer)?;
    let balance = ctx.balance(payer)?;
    let split = split_payment(red_balance, cost);
    ctx.set_red_balance(payer, checked(red_balance.checked_sub(split.red), payer)?)?;
    ctx.set_balance(payer, checked(balance.checked_sub(split.green), payer)?)?;
    Ok(split.green)
}

pub(crate) fn refund_payer(
    ctx: &mut ExecutionContext<'_>,
    payer: StorageReference,
    refund: i128,
    green_taken: i128,
) -> Result<(), ExecutionError> {
    let split = split_refund(refund, green_taken);
    let balance = ctx.balance(payer)?;
    let red_balance = ctx.red_balance(payer)?;
    ctx.set_balance(payer, checked(balance.checked_add(split.green), payer)?)?;
    ctx.set_red_balance(payer, checked(red_balance.checked_add(split.red), payer)?)
}

fn checked(amount: Option<i128>, payer: StorageReference) -> Result<i128, ExecutionError> {
    amount.ok_or_else(|| {
        ExecutionError::Arithmetic(format!("the balance of {payer} is out of range"))
    })
}

/// Sends the price of the consumed gas, with inflation, to the validators, if any.
pub(crate) fn pay_validators(
    ctx: &mut ExecutionContext<'_>,
    validators: Option<StorageReference>,
    amount: i128,
    inflation: i64,
) -> Result<(), ExecutionError> {
    let Some(validators) = validators else {
        return Ok(());
    };
    let reward = with_inflation(amount, inflation);
    if reward == 0 {
        return Ok(());
    }
    let balance = ctx.balance(validators)?;
    ctx.set_balance(validators, balance.saturating_add(reward))
}
