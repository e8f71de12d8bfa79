/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The in-memory objects of a single transaction.
//!
//! Each object loaded from store keeps two copies of its fields:
//! - `original` (the values read from the uncommitted tip of the store)
//! - `fields` (the current values, as modified by the execution)
//!
//! Objects created during the transaction have no original values and are not yet in store.
//! At the end of the transaction, the difference between the two copies, for the objects
//! reachable from the roots of the transaction, becomes its set of updates.

use std::collections::BTreeMap;

use crate::types::{ClassTag, FieldSignature, ObjectState, StorageReference, StorageValue, TransactionReference};

/// How an in-memory object relates to the storage type discipline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    /// A storage object, that can be persisted.
    Storage,
    /// An element of an enumeration with instance fields. Never persistable.
    EnumWithFields,
    /// Any other object that is neither a storage object nor a scalar.
    Plain,
}

#[derive(Clone, Debug)]
pub(crate) struct HeapObject {
    pub tag: ClassTag,
    pub kind: ObjectKind,
    /// True if the object was loaded from store, false if created by this transaction.
    pub in_storage: bool,
    pub fields: BTreeMap<FieldSignature, StorageValue>,
    pub original: BTreeMap<FieldSignature, StorageValue>,
}

impl HeapObject {
    /// Fields whose value differs from the one read from store. For a new object, all fields.
    pub fn modified_fields(&self) -> impl Iterator<Item = (&FieldSignature, &StorageValue)> {
        self.fields
            .iter()
            .filter(move |(field, value)| self.original.get(*field) != Some(*value))
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Heap {
    transaction: TransactionReference,
    next_progressive: u64,
    objects: BTreeMap<StorageReference, HeapObject>,
}

impl Heap {
    pub fn new(transaction: TransactionReference) -> Self {
        Self {
            transaction,
            next_progressive: 0,
            objects: BTreeMap::new(),
        }
    }

    pub fn get(&self, reference: &StorageReference) -> Option<&HeapObject> {
        self.objects.get(reference)
    }

    pub fn get_mut(&mut self, reference: &StorageReference) -> Option<&mut HeapObject> {
        self.objects.get_mut(reference)
    }

    pub fn contains(&self, reference: &StorageReference) -> bool {
        self.objects.contains_key(reference)
    }

    /// Adds an object read from store.
    pub fn insert_loaded(&mut self, reference: StorageReference, state: ObjectState) {
        self.objects.insert(
            reference,
            HeapObject {
                tag: state.class_tag,
                kind: ObjectKind::Storage,
                in_storage: true,
                original: state.fields.clone(),
                fields: state.fields,
            },
        );
    }

    /// Allocates a new object, with a reference rooted at the current transaction.
    pub fn allocate(&mut self, tag: ClassTag, kind: ObjectKind) -> StorageReference {
        let reference = StorageReference::new(self.transaction, self.next_progressive);
        self.next_progressive += 1;
        self.objects.insert(
            reference,
            HeapObject {
                tag,
                kind,
                in_storage: false,
                fields: BTreeMap::new(),
                original: BTreeMap::new(),
            },
        );
        reference
    }
}
