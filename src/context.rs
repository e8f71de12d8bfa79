/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines the Execution Context of a single transaction, which is passed by reference to the
//! [Vm](crate::vm::Vm) while it runs contract code.
//!
//! The context is the only way contract code reaches world state: objects are deserialized
//! from the uncommitted tip of the store into a private [Heap] on first access, and every
//! access is charged to the [GasAccount] of the transaction. A context is created at the
//! beginning of a transaction and dropped at its end; it is never shared between transactions.

use crate::{
    class_loader::EngineClassLoader,
    error::ExecutionError,
    execution::heap::{Heap, ObjectKind},
    gas::{self, GasAccount},
    store::Store,
    types::{
        ClassTag, FieldSignature, StorageReference, StorageType, StorageValue,
        TransactionReference, TransactionResponse,
    },
};

/// ExecutionContext encapsulates the heap, the gas account and the events of the transaction
/// being executed.
pub struct ExecutionContext<'a> {
    reference: TransactionReference,
    caller: StorageReference,
    store: &'a dyn Store,
    class_loader: &'a EngineClassLoader,
    pub(crate) gas: GasAccount,
    pub(crate) heap: Heap,
    events: Vec<StorageReference>,
}

impl<'a> ExecutionContext<'a> {
    pub(crate) fn new(
        reference: TransactionReference,
        caller: StorageReference,
        store: &'a dyn Store,
        class_loader: &'a EngineClassLoader,
        gas: GasAccount,
    ) -> Self {
        Self {
            reference,
            caller,
            store,
            class_loader,
            gas,
            heap: Heap::new(reference),
            events: Vec::new(),
        }
    }

    /// Reference of the transaction being executed.
    pub fn reference(&self) -> TransactionReference {
        self.reference
    }

    pub fn caller(&self) -> StorageReference {
        self.caller
    }

    pub fn class_loader(&self) -> &'a EngineClassLoader {
        self.class_loader
    }

    pub fn remaining_gas(&self) -> u64 {
        self.gas.remaining()
    }

    pub fn charge_cpu(&mut self, amount: u64) -> Result<(), ExecutionError> {
        self.gas.charge_cpu(amount)
    }

    pub fn charge_ram(&mut self, amount: u64) -> Result<(), ExecutionError> {
        self.gas.charge_ram(amount)
    }

    pub fn charge_storage(&mut self, amount: u64) -> Result<(), ExecutionError> {
        self.gas.charge_storage(amount)
    }

    /// Runs `body` with exactly `amount` units of gas. Whatever the body leaves unused is
    /// given back to the enclosing computation, also when it fails.
    pub fn with_gas<T>(
        &mut self,
        amount: u64,
        body: impl FnOnce(&mut Self) -> Result<T, ExecutionError>,
    ) -> Result<T, ExecutionError> {
        let saved = self.gas.enter_sub_budget(amount)?;
        let result = body(self);
        self.gas.leave_sub_budget(saved);
        result
    }

    /// Brings an object into the heap of the transaction, deserializing it from store if it
    /// was not accessed before.
    pub fn load(&mut self, object: StorageReference) -> Result<(), ExecutionError> {
        if self.heap.contains(&object) {
            return Ok(());
        }

        let state = self
            .store
            .get_state_uncommitted(&object)
            .ok_or(ExecutionError::UnknownObject(object))?;
        self.gas.charge_cpu(gas::CPU_COST_OF_DESERIALIZATION)?;
        self.gas
            .charge_ram(gas::ram_cost_of_object(state.fields.len()))?;
        self.heap.insert_loaded(object, state);
        Ok(())
    }

    pub fn class_of(&mut self, object: StorageReference) -> Result<ClassTag, ExecutionError> {
        self.load(object)?;
        self.heap
            .get(&object)
            .map(|o| o.tag.clone())
            .ok_or(ExecutionError::UnknownObject(object))
    }

    /// The current value of a field. Fields never assigned hold the default value of their type.
    pub fn get_field(
        &mut self,
        object: StorageReference,
        field: &FieldSignature,
    ) -> Result<StorageValue, ExecutionError> {
        self.load(object)?;
        let object = self
            .heap
            .get(&object)
            .ok_or(ExecutionError::UnknownObject(object))?;
        Ok(object
            .fields
            .get(field)
            .cloned()
            .unwrap_or_else(|| default_value(&field.field_type)))
    }

    pub fn set_field(
        &mut self,
        object: StorageReference,
        field: FieldSignature,
        value: StorageValue,
    ) -> Result<(), ExecutionError> {
        self.load(object)?;
        let target = self
            .heap
            .get_mut(&object)
            .ok_or(ExecutionError::UnknownObject(object))?;
        target.fields.insert(field, value);
        Ok(())
    }

    /// Creates a new object of a class of the classpath. Objects of storage classes can be
    /// persisted; all others only live as long as the transaction.
    pub fn new_object(&mut self, class_name: &str) -> Result<StorageReference, ExecutionError> {
        let kind = match self.class_loader.capabilities(class_name) {
            Some(capabilities) if capabilities.is_storage => ObjectKind::Storage,
            Some(_) => ObjectKind::Plain,
            None => {
                return Err(ExecutionError::IllegalArgument(format!(
                    "unknown class {class_name}"
                )))
            }
        };
        self.new_object_of_kind(class_name, kind)
    }

    /// Creates an object that is explicitly not persistable, such as an element of an
    /// enumeration with instance fields.
    pub fn new_object_of_kind(
        &mut self,
        class_name: &str,
        kind: ObjectKind,
    ) -> Result<StorageReference, ExecutionError> {
        let tag = self.class_loader.class_tag(class_name).ok_or_else(|| {
            ExecutionError::IllegalArgument(format!("unknown class {class_name}"))
        })?;
        self.gas.charge_ram(gas::ram_cost_of_object(0))?;
        Ok(self.heap.allocate(tag, kind))
    }

    /// Records an event. The event becomes part of the response and of its updates.
    pub fn emit_event(&mut self, event: StorageReference) -> Result<(), ExecutionError> {
        let tag = self.class_of(event)?;
        let is_event = self
            .class_loader
            .capabilities(&tag.class_name)
            .map_or(false, |capabilities| capabilities.is_event);
        if !is_event {
            return Err(ExecutionError::IllegalArgument(format!(
                "{} is not an event",
                tag.class_name
            )));
        }
        self.events.push(event);
        Ok(())
    }

    pub fn events(&self) -> &[StorageReference] {
        &self.events
    }

    /// The response of a previous transaction, as seen at the uncommitted tip.
    pub fn response_of(
        &mut self,
        reference: &TransactionReference,
    ) -> Result<Option<TransactionResponse>, ExecutionError> {
        self.gas.charge_cpu(gas::CPU_COST_FOR_GETTING_RESPONSE)?;
        Ok(self.store.get_response_uncommitted(reference))
    }

    /* ↓↓↓ Coin bookkeeping used by the engine ↓↓↓ */

    pub(crate) fn big_integer(
        &mut self,
        object: StorageReference,
        field: &FieldSignature,
    ) -> Result<i128, ExecutionError> {
        match self.get_field(object, field)? {
            StorageValue::Null => Ok(0),
            StorageValue::BigInteger(value) => Ok(value),
            other => Err(ExecutionError::Deserialization(format!(
                "field {field} of {object} should hold a big integer, found {other}"
            ))),
        }
    }

    pub(crate) fn balance(&mut self, object: StorageReference) -> Result<i128, ExecutionError> {
        self.big_integer(object, &FieldSignature::balance())
    }

    pub(crate) fn red_balance(&mut self, object: StorageReference) -> Result<i128, ExecutionError> {
        self.big_integer(object, &FieldSignature::red_balance())
    }

    pub(crate) fn set_balance(
        &mut self,
        object: StorageReference,
        value: i128,
    ) -> Result<(), ExecutionError> {
        self.set_field(object, FieldSignature::balance(), StorageValue::BigInteger(value))
    }

    pub(crate) fn set_red_balance(
        &mut self,
        object: StorageReference,
        value: i128,
    ) -> Result<(), ExecutionError> {
        self.set_field(object, FieldSignature::red_balance(), StorageValue::BigInteger(value))
    }

    pub(crate) fn nonce(&mut self, object: StorageReference) -> Result<i128, ExecutionError> {
        self.big_integer(object, &FieldSignature::nonce())
    }

    pub(crate) fn increase_nonce(&mut self, object: StorageReference) -> Result<(), ExecutionError> {
        let nonce = self.nonce(object)?;
        let next = nonce.checked_add(1).ok_or_else(|| {
            ExecutionError::Arithmetic(format!("the nonce of {object} cannot be increased"))
        })?;
        self.set_field(object, FieldSignature::nonce(), StorageValue::BigInteger(next))
    }

    /// Drops everything the transaction did to the heap and its events, keeping the gas
    /// account. Used to rebuild the few updates a failed transaction still commits.
    pub(crate) fn reset_heap(&mut self) {
        self.heap = Heap::new(self.reference);
        self.events.clear();
    }
}

fn default_value(field_type: &StorageType) -> StorageValue {
    match field_type {
        StorageType::Boolean => StorageValue::Boolean(false),
        StorageType::Byte => StorageValue::Byte(0),
        StorageType::Char => StorageValue::Char(0),
        StorageType::Short => StorageValue::Short(0),
        StorageType::Int => StorageValue::Int(0),
        StorageType::Long => StorageValue::Long(0),
        StorageType::Class(_) => StorageValue::Null,
    }
}
