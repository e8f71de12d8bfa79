/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! GasAccount keeps track of the gas of a single transaction, split into CPU, RAM and storage.
//!
//! It is created when the execution of a transaction starts and dropped at its end; it is
//! never shared across transactions. Nested sub-budgets do not use a shared stack: the
//! remaining gas of the caller is handed back by [GasAccount::leave_sub_budget] from the
//! value saved on the Rust call stack by [GasAccount::enter_sub_budget].

use crate::error::ExecutionError;
use crate::types::GasCosts;

/// Resource a charge is accounted to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GasBucket {
    Cpu,
    Ram,
    Storage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Budget {
    Bounded(u64),
    /// Only used for the bootstrap transactions, which must never run out of gas.
    Unbounded,
}

#[derive(Clone, Debug)]
pub struct GasAccount {
    budget: Budget,
    consumed: GasCosts,
}

/// Remaining gas of the enclosing budget, to be handed back when a sub-budget ends.
#[derive(Debug)]
#[must_use]
pub struct SavedBudget {
    remaining: u64,
    reserved: u64,
}

impl GasAccount {
    pub fn new(gas_limit: u64) -> Self {
        Self {
            budget: Budget::Bounded(gas_limit),
            consumed: GasCosts::default(),
        }
    }

    /// An account on which every charge is a no-op.
    pub fn unbounded() -> Self {
        Self {
            budget: Budget::Unbounded,
            consumed: GasCosts::default(),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.budget == Budget::Unbounded
    }

    /// Gas still available. Unbounded accounts report `u64::MAX`.
    pub fn remaining(&self) -> u64 {
        match self.budget {
            Budget::Bounded(remaining) => remaining,
            Budget::Unbounded => u64::MAX,
        }
    }

    pub fn consumed(&self) -> GasCosts {
        self.consumed
    }

    /// Debits `amount` from the remaining gas and credits it to `bucket`.
    pub fn charge(&mut self, amount: u64, bucket: GasBucket) -> Result<(), ExecutionError> {
        let remaining = match &mut self.budget {
            Budget::Unbounded => return Ok(()),
            Budget::Bounded(remaining) => remaining,
        };

        if *remaining < amount {
            return Err(ExecutionError::OutOfGas {
                missing: amount - *remaining,
            });
        }
        *remaining -= amount;

        let counter = match bucket {
            GasBucket::Cpu => &mut self.consumed.cpu,
            GasBucket::Ram => &mut self.consumed.ram,
            GasBucket::Storage => &mut self.consumed.storage,
        };
        *counter = counter.saturating_add(amount);
        Ok(())
    }

    pub fn charge_cpu(&mut self, amount: u64) -> Result<(), ExecutionError> {
        self.charge(amount, GasBucket::Cpu)
    }

    pub fn charge_ram(&mut self, amount: u64) -> Result<(), ExecutionError> {
        self.charge(amount, GasBucket::Ram)
    }

    pub fn charge_storage(&mut self, amount: u64) -> Result<(), ExecutionError> {
        self.charge(amount, GasBucket::Storage)
    }

    /// Starts a sub-budget of exactly `amount`. The amount is charged as CPU, the current
    /// remaining gas is saved, and the remaining gas becomes `amount`.
    pub fn enter_sub_budget(&mut self, amount: u64) -> Result<SavedBudget, ExecutionError> {
        if self.is_unbounded() {
            return Ok(SavedBudget {
                remaining: u64::MAX,
                reserved: 0,
            });
        }

        self.charge_cpu(amount)?;
        let saved = SavedBudget {
            remaining: self.remaining(),
            reserved: amount,
        };
        self.budget = Budget::Bounded(amount);
        Ok(saved)
    }

    /// Ends a sub-budget: the leftover is added back onto the saved remaining gas and the
    /// reservation is removed from the CPU bucket, so that only what the sub-computation
    /// actually consumed stays charged.
    pub fn leave_sub_budget(&mut self, saved: SavedBudget) {
        if let Budget::Bounded(leftover) = self.budget {
            self.budget = Budget::Bounded(saved.remaining.saturating_add(leftover));
            self.consumed.cpu = self.consumed.cpu.saturating_sub(saved.reserved);
        }
    }

    /// Runs `body` under a sub-budget of `amount`, restoring the enclosing budget on every
    /// exit path.
    pub fn with_sub_budget<T>(
        &mut self,
        amount: u64,
        body: impl FnOnce(&mut Self) -> Result<T, ExecutionError>,
    ) -> Result<T, ExecutionError> {
        let saved = self.enter_sub_budget(amount)?;
        let result = body(self);
        self.leave_sub_budget(saved);
        result
    }
}
