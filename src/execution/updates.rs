/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Extraction of the updates produced by a transaction.
//!
//! The traversal is breadth-first from the roots of the transaction (caller, payer,
//! receiver, storage actuals, storage result, events). Every in-memory object reached
//! contributes its class tag if it is new, and its modified fields. Fields referring to other
//! in-memory storage objects enqueue them, so that mutations reachable only indirectly are
//! captured as well. Objects never loaded into memory cannot have changed and are not walked.

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::{
    error::ExecutionError,
    types::{StorageReference, StorageValue, Update},
};

use super::heap::{Heap, ObjectKind};

pub(crate) struct UpdateExtractor<'h> {
    heap: &'h Heap,
    seen: HashSet<StorageReference>,
    pending: VecDeque<StorageReference>,
    updates: BTreeSet<Update>,
}

impl<'h> UpdateExtractor<'h> {
    pub fn new(heap: &'h Heap) -> Self {
        Self {
            heap,
            seen: HashSet::new(),
            pending: VecDeque::new(),
            updates: BTreeSet::new(),
        }
    }

    /// The ordered updates of the objects reachable from `roots`.
    pub fn extract(
        mut self,
        roots: impl IntoIterator<Item = StorageReference>,
    ) -> Result<BTreeSet<Update>, ExecutionError> {
        for root in roots {
            self.enqueue(root)?;
        }

        while let Some(reference) = self.pending.pop_front() {
            self.add_updates_of(reference)?;
        }

        Ok(self.updates)
    }

    fn enqueue(&mut self, reference: StorageReference) -> Result<(), ExecutionError> {
        let Some(object) = self.heap.get(&reference) else {
            return Ok(());
        };

        match object.kind {
            ObjectKind::Storage => {
                if self.seen.insert(reference) {
                    self.pending.push_back(reference);
                }
                Ok(())
            }
            ObjectKind::EnumWithFields => Err(ExecutionError::Deserialization(format!(
                "an enum with instance fields cannot be kept in store: {}",
                object.tag.class_name
            ))),
            ObjectKind::Plain => Err(ExecutionError::Deserialization(format!(
                "an object of class {} cannot be kept in store since it is not a storage object",
                object.tag.class_name
            ))),
        }
    }

    fn add_updates_of(&mut self, reference: StorageReference) -> Result<(), ExecutionError> {
        let Some(object) = self.heap.get(&reference) else {
            return Ok(());
        };

        if !object.in_storage {
            self.updates.insert(Update::class_tag(reference, &object.tag));
        }

        let mut referenced = Vec::new();
        for (field, value) in object.modified_fields() {
            self.updates
                .insert(Update::field(reference, field.clone(), value.clone()));
        }
        // every reference held by the object is walked, modified or not, since the
        // referenced object may have changed on its own
        for value in object.fields.values() {
            if let StorageValue::Reference(other) = value {
                referenced.push(*other);
            }
        }

        for other in referenced {
            self.enqueue(other)?;
        }
        Ok(())
    }
}
