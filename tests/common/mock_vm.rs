use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use borsh::BorshDeserialize;
use hotmoka_runtime::{
    types::{FieldSignature, InstrumentedJar, MethodSignature, StorageReference, StorageValue},
    ClassDescriptor, ExecutionContext, ExecutionError, Invocation, Throwable, VerificationError,
    VerificationRules, Verifier, Vm,
};

pub type Handler = Arc<
    dyn Fn(
            &mut ExecutionContext<'_>,
            Option<StorageReference>,
            &[StorageValue],
        ) -> Result<Option<StorageValue>, ExecutionError>
        + Send
        + Sync,
>;

/// Name under which constructors are registered.
pub const CONSTRUCTOR: &str = "<init>";

/// A virtual machine whose jars are borsh-encoded lists of [ClassDescriptor] and whose code
/// is a table of closures, keyed by defining class and method name.
#[derive(Clone, Default)]
pub struct ScriptedVm {
    handlers: HashMap<(String, String), Handler>,
}

impl ScriptedVm {
    pub fn on(
        mut self,
        class_name: &str,
        method_name: &str,
        handler: impl Fn(
                &mut ExecutionContext<'_>,
                Option<StorageReference>,
                &[StorageValue],
            ) -> Result<Option<StorageValue>, ExecutionError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.handlers.insert(
            (class_name.to_string(), method_name.to_string()),
            Arc::new(handler),
        );
        self
    }

    /// Registers a getter that returns the field named after the getter itself.
    pub fn on_getter(self, getter: MethodSignature) -> Self {
        let field = field_of_getter(&getter);
        self.on(
            &getter.defining_class,
            &getter.name,
            move |ctx, receiver, _| {
                let receiver = receiver.ok_or_else(|| {
                    ExecutionError::IllegalArgument("a getter needs a receiver".to_string())
                })?;
                ctx.get_field(receiver, &field).map(Some)
            },
        )
    }
}

/// The field backing a getter of the governance contracts.
pub fn field_of_getter(getter: &MethodSignature) -> FieldSignature {
    let field_type = getter
        .returns
        .clone()
        .expect("getters return a value");
    FieldSignature::new(&getter.defining_class, &getter.name, field_type)
}

impl Vm for ScriptedVm {
    fn classes_of(&self, instrumented_jar: &[u8]) -> anyhow::Result<Vec<ClassDescriptor>> {
        Ok(Vec::<ClassDescriptor>::try_from_slice(instrumented_jar)?)
    }

    fn invoke(
        &self,
        ctx: &mut ExecutionContext<'_>,
        invocation: &Invocation,
    ) -> Result<Option<StorageValue>, ExecutionError> {
        let (key, receiver, actuals) = match invocation {
            Invocation::Constructor {
                constructor,
                actuals,
            } => (
                (constructor.defining_class.clone(), CONSTRUCTOR.to_string()),
                None,
                actuals,
            ),
            Invocation::Method {
                method,
                receiver,
                actuals,
            } => (
                (method.defining_class.clone(), method.name.clone()),
                *receiver,
                actuals,
            ),
        };

        if let Some(receiver) = receiver {
            ctx.load(receiver)?;
        }
        let handler = self.handlers.get(&key).cloned().ok_or_else(|| {
            ExecutionError::Thrown(Throwable::unchecked(
                "java.lang.NoSuchMethodError",
                &format!("{}.{}", key.0, key.1),
            ))
        })?;
        handler(ctx, receiver, actuals)
    }
}

/// A verifier that refuses classes by name:
/// - classes whose name contains `Illegal` are refused unless verification is skipped;
/// - classes whose name starts with `Legacy` are refused from verification version 1 on.
///
/// Instrumentation leaves the bytes untouched.
#[derive(Default)]
pub struct ToyVerifier {
    calls: AtomicUsize,
}

impl ToyVerifier {
    /// Number of jars verified so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Verifier for ToyVerifier {
    fn verify_and_instrument(
        &self,
        jar: &[u8],
        _dependencies: &[&InstrumentedJar],
        rules: VerificationRules,
    ) -> Result<InstrumentedJar, Vec<VerificationError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let classes = Vec::<ClassDescriptor>::try_from_slice(jar)
            .map_err(|e| vec![VerificationError::new(&format!("corrupted jar: {e}"))])?;
        if rules.skips_verification {
            return Ok(InstrumentedJar::new(jar.to_vec()));
        }

        let errors: Vec<VerificationError> = classes
            .iter()
            .filter_map(|class| {
                if class.name.contains("Illegal") {
                    Some(VerificationError::in_class(&class.name, "illegal class"))
                } else if class.name.starts_with("Legacy") && rules.verification_version >= 1 {
                    Some(VerificationError::in_class(
                        &class.name,
                        "forbidden since verification version 1",
                    ))
                } else {
                    None
                }
            })
            .collect();

        if errors.is_empty() {
            Ok(InstrumentedJar::new(jar.to_vec()))
        } else {
            Err(errors)
        }
    }
}
