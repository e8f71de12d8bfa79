/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Constants and formulas which are primitives used in the cost calculation of every step
//! of a transaction.
//!
//! |Resource | Related Function / Constants |
//! |:---     |:---                          |
//! |CPU      | [CPU_BASE_TRANSACTION_COST], [cpu_cost_for_loading_jar], [cpu_cost_for_installing_jar], [CPU_COST_FOR_GETTING_RESPONSE] |
//! |RAM      | [ram_cost_for_loading_jar], [ram_cost_for_installing_jar], [ram_cost_of_object] |
//! |Storage  | [STORAGE_COST_PER_SLOT], [STORAGE_SLOT_SIZE], [storage_cost_of_bytes] |

/* ↓↓↓ CPU ↓↓↓ */

/// Cost charged to every non-initial transaction when it starts.
pub const CPU_BASE_TRANSACTION_COST: u64 = 10;

/// Cost of fetching a response from the store during execution.
pub const CPU_COST_FOR_GETTING_RESPONSE: u64 = 50;

/// Cost of deserializing an object from store into the execution heap.
pub const CPU_COST_OF_DESERIALIZATION: u64 = 5;

/// CPU cost of loading a jar of the given size into a class loader.
pub const fn cpu_cost_for_loading_jar(num_bytes: usize) -> u64 {
    10 + (num_bytes as u64) / 200
}

/// CPU cost of verifying and instrumenting a jar of the given size.
pub const fn cpu_cost_for_installing_jar(num_bytes: usize) -> u64 {
    100 + (num_bytes as u64) / 400
}

/* ↓↓↓ RAM ↓↓↓ */

pub const RAM_COST_OF_OBJECT: u64 = 4;
pub const RAM_COST_OF_FIELD: u64 = 1;

/// RAM cost of an object with the given number of fields.
pub const fn ram_cost_of_object(num_fields: usize) -> u64 {
    RAM_COST_OF_OBJECT + RAM_COST_OF_FIELD * num_fields as u64
}

/// RAM cost of loading a jar of the given size into a class loader.
pub const fn ram_cost_for_loading_jar(num_bytes: usize) -> u64 {
    10 + (num_bytes as u64) / 40
}

/// RAM cost of verifying and instrumenting a jar of the given size.
pub const fn ram_cost_for_installing_jar(num_bytes: usize) -> u64 {
    100 + (num_bytes as u64) / 40
}

/* ↓↓↓ Storage ↓↓↓ */

/// Bytes in a storage slot.
pub const STORAGE_SLOT_SIZE: usize = 32;

/// Cost of each (possibly partial) slot of persisted data.
pub const STORAGE_COST_PER_SLOT: u64 = 25;

/// Storage cost of persisting the given number of bytes.
pub const fn storage_cost_of_bytes(num_bytes: usize) -> u64 {
    let slots = (num_bytes + STORAGE_SLOT_SIZE - 1) / STORAGE_SLOT_SIZE;
    STORAGE_COST_PER_SLOT * slots as u64
}

/// CPU and RAM cost of loading all the given jars, identified by their lengths.
pub fn cost_of_loading_jars(lengths: impl IntoIterator<Item = usize>) -> u64 {
    lengths
        .into_iter()
        .map(|len| cpu_cost_for_loading_jar(len).saturating_add(ram_cost_for_loading_jar(len)))
        .fold(0u64, u64::saturating_add)
}
