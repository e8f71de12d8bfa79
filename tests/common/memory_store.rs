use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use hotmoka_runtime::{
    types::{
        ClassTag, FieldSignature, ObjectState, StorageReference, StorageValue,
        TransactionReference, TransactionRequest, TransactionResponse, Update,
    },
    Store,
};
use parking_lot::RwLock;

#[derive(Clone, Default)]
struct Layer {
    requests: HashMap<TransactionReference, TransactionRequest>,
    responses: HashMap<TransactionReference, TransactionResponse>,
    errors: HashMap<TransactionReference, String>,
    objects: HashMap<StorageReference, ObjectState>,
    manifest: Option<StorageReference>,
}

/// A store with two layers: the committed one and the uncommitted tip, which is a copy of
/// the committed layer plus everything pushed since the last commit.
#[derive(Default)]
pub struct MemoryStore {
    committed: RwLock<Layer>,
    tip: RwLock<Layer>,
    pushes: AtomicUsize,
}

impl MemoryStore {
    /// Makes the tip the new committed state.
    pub fn commit(&self) {
        *self.committed.write() = self.tip.read().clone();
    }

    /// Number of outcomes pushed so far, replacements included.
    pub fn pushes(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }

    pub fn error_of(&self, reference: &TransactionReference) -> Option<String> {
        self.tip.read().errors.get(reference).cloned()
    }

    pub fn field(&self, object: &StorageReference, field: &FieldSignature) -> Option<StorageValue> {
        self.tip
            .read()
            .objects
            .get(object)
            .and_then(|state| state.fields.get(field).cloned())
    }

    pub fn committed_field(
        &self,
        object: &StorageReference,
        field: &FieldSignature,
    ) -> Option<StorageValue> {
        self.committed
            .read()
            .objects
            .get(object)
            .and_then(|state| state.fields.get(field).cloned())
    }

    fn apply(layer: &mut Layer, updates: &[Update]) {
        for update in updates {
            match update {
                Update::ClassTag {
                    object,
                    class_name,
                    jar,
                } => {
                    layer.objects.entry(*object).or_insert_with(|| ObjectState {
                        class_tag: ClassTag {
                            class_name: class_name.clone(),
                            jar: *jar,
                        },
                        fields: Default::default(),
                    });
                }
                Update::Field {
                    object,
                    field,
                    value,
                } => {
                    if let Some(state) = layer.objects.get_mut(object) {
                        state.fields.insert(field.clone(), value.clone());
                    }
                }
            }
        }
    }
}

impl Store for MemoryStore {
    fn get_request(&self, reference: &TransactionReference) -> Option<TransactionRequest> {
        self.tip.read().requests.get(reference).cloned()
    }

    fn get_response(&self, reference: &TransactionReference) -> Option<TransactionResponse> {
        self.committed.read().responses.get(reference).cloned()
    }

    fn get_response_uncommitted(
        &self,
        reference: &TransactionReference,
    ) -> Option<TransactionResponse> {
        self.tip.read().responses.get(reference).cloned()
    }

    fn get_manifest_uncommitted(&self) -> Option<StorageReference> {
        self.tip.read().manifest
    }

    fn get_state_uncommitted(&self, object: &StorageReference) -> Option<ObjectState> {
        self.tip.read().objects.get(object).cloned()
    }

    fn push(
        &self,
        reference: &TransactionReference,
        request: &TransactionRequest,
        outcome: Result<&TransactionResponse, &str>,
    ) {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        let mut tip = self.tip.write();
        tip.requests.insert(*reference, request.clone());

        match outcome {
            Ok(response) => {
                // a replacement does not apply its updates a second time
                let replaced = tip.responses.insert(*reference, response.clone()).is_some();
                if replaced {
                    return;
                }
                Self::apply(&mut tip, response.updates());
                if let (TransactionResponse::Initialization, TransactionRequest::Initialization(request)) =
                    (response, request)
                {
                    tip.manifest = Some(request.manifest);
                }
            }
            Err(reason) => {
                tip.errors.insert(*reference, reason.to_string());
            }
        }
    }
}
