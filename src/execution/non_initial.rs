/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Builder of the response of a non-initial request.
//!
//! [NonInitialBuilder::new] resolves the classpath of the request and runs the admission
//! checks; a rejection is returned before anything is charged. [NonInitialBuilder::build]
//! then executes the request:
//! 1. Pre-Charge: the nonce of the caller is increased, the base cost, the loading of the
//!    classpath and the storage of the request are charged, and the payer pays for all the gas.
//! 2. Body: the call or the installation of a jar, on its own thread.
//! 3. Charge: the response is priced, unused gas is refunded and the validators are paid.
//!
//! An error in any step yields a `Failed` response, which keeps only the nonce and coin
//! updates. Internal failures are never turned into responses.

use std::sync::Arc;

use crate::{
    class_loader::EngineClassLoader,
    context::ExecutionContext,
    error::{ExecutionError, InternalFailure, NodeError, Throwable},
    gas::{self, GasAccount},
    types::{
        ExceptionResponse, FailedResponse, FieldSignature, InstrumentedJar, NonInitialPayload,
        NonInitialTransactionRequest, Outcome, StorageReference, StorageValue,
        SuccessfulResponse, TransactionReference, TransactionRequest, TransactionResponse, Update,
    },
    verifier::VerificationRules,
    vm::Invocation,
};

use super::{
    admission::{self, Admitted},
    isolation,
    node::{NodeView, Snapshot},
    phase,
    updates::UpdateExtractor,
};

pub(crate) struct NonInitialBuilder<'n, 'a> {
    node: &'n NodeView<'a>,
    snapshot: &'n Snapshot,
    reference: TransactionReference,
    request: &'n NonInitialTransactionRequest,
    class_loader: Arc<EngineClassLoader>,
    /// Jars the installed jar depends on, for a jar store request.
    dependencies: Vec<(TransactionReference, InstrumentedJar)>,
    admitted: Admitted,
    view: bool,
}

/// How the body of a transaction ended, short of failing.
enum Completion {
    Normal(Outcome),
    /// A checked exception declared by the called method.
    Exception(Throwable),
}

impl<'n, 'a> NonInitialBuilder<'n, 'a> {
    pub fn new(
        node: &'n NodeView<'a>,
        snapshot: &'n Snapshot,
        reference: TransactionReference,
        request: &'n NonInitialTransactionRequest,
        view: bool,
    ) -> Result<Self, NodeError> {
        let class_loader = node.class_loader(request.classpath, snapshot)?;
        let dependencies = match &request.payload {
            NonInitialPayload::JarStore { jar, dependencies } => {
                node.jars_of(dependencies, 1, jar.len() as u64, snapshot)?
            }
            _ => Vec::new(),
        };

        let admitted =
            admission::admit(node, snapshot, reference, request, &class_loader, view)?;
        tracing::debug!(
            %reference,
            caller = %request.caller,
            payer = %admitted.payer,
            gas_limit = request.gas_limit,
            view,
            "request admitted"
        );

        Ok(Self {
            node,
            snapshot,
            reference,
            request,
            class_loader,
            dependencies,
            admitted,
            view,
        })
    }

    pub fn build(self) -> Result<TransactionResponse, NodeError> {
        let mut ctx = ExecutionContext::new(
            self.reference,
            self.request.caller,
            self.node.store,
            &self.class_loader,
            GasAccount::new(self.request.gas_limit),
        );

        match self.execute(&mut ctx) {
            Ok(response) => Ok(response),
            Err(ExecutionError::Internal(failure)) => Err(failure.into()),
            Err(error) => self.failed(ctx, error),
        }
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<TransactionResponse, ExecutionError> {
        let green_taken = self.pre_charge(ctx)?;

        let completion = match isolation::run_isolated(self.node.config.execution_stack_size, || {
            self.run_body(ctx)
        })? {
            Ok(outcome) => Completion::Normal(outcome),
            Err(ExecutionError::Thrown(throwable))
                if throwable.checked && self.admitted.throws_exceptions =>
            {
                Completion::Exception(throwable)
            }
            Err(error) => return Err(error),
        };

        if self.admitted.checks_side_effects {
            self.check_no_side_effects(ctx, &completion)?;
        }

        // the response pays for its own storage: it is priced once, then rebuilt with the
        // final gas tally and balances
        let response = self.response(ctx, &completion)?;
        ctx.charge_storage(gas::storage_cost_of_bytes(response.size()))?;

        let consumed = ctx.gas.consumed().total();
        let refund = phase::cost_of(ctx.remaining_gas(), self.request.gas_price);
        phase::refund_payer(ctx, self.admitted.payer, refund, green_taken)?;
        phase::pay_validators(
            ctx,
            self.snapshot.validators,
            phase::cost_of(consumed, self.request.gas_price),
            self.snapshot.inflation,
        )?;

        self.response(ctx, &completion)
    }

    /// Consumes the nonce, charges the fixed costs of the request and debits the payer for
    /// all its gas. Returns the amount taken from the green balance of the payer.
    fn pre_charge(&self, ctx: &mut ExecutionContext<'_>) -> Result<i128, ExecutionError> {
        let caller = self.request.caller;
        ctx.load(caller)?;
        ctx.load(self.admitted.payer)?;
        if let Some(validators) = self.snapshot.validators {
            ctx.load(validators)?;
        }

        if !self.view {
            ctx.increase_nonce(caller)?;
        }

        ctx.charge_cpu(gas::CPU_BASE_TRANSACTION_COST)?;
        for length in self.class_loader.lengths_of_jars() {
            ctx.charge_cpu(gas::cpu_cost_for_loading_jar(length))?;
            ctx.charge_ram(gas::ram_cost_for_loading_jar(length))?;
        }
        let request_size = TransactionRequest::NonInitial(self.request.clone()).size();
        ctx.charge_storage(gas::storage_cost_of_bytes(request_size))?;

        let cost = phase::cost_of(self.request.gas_limit, self.request.gas_price);
        phase::debit_payer(ctx, self.admitted.payer, cost)
    }

    fn run_body(&self, ctx: &mut ExecutionContext<'_>) -> Result<Outcome, ExecutionError> {
        for actual in self.request.storage_actuals() {
            ctx.load(actual)?;
        }

        let vm = self.node.vm;
        match &self.request.payload {
            NonInitialPayload::JarStore { jar, dependencies } => {
                self.install_jar(ctx, jar, dependencies)
            }
            NonInitialPayload::ConstructorCall {
                constructor,
                actuals,
            } => {
                let invocation = Invocation::Constructor {
                    constructor: constructor.clone(),
                    actuals: actuals.clone(),
                };
                match vm.invoke(ctx, &invocation)? {
                    Some(StorageValue::Reference(object)) => Ok(Outcome::NewObject(object)),
                    other => Err(InternalFailure::new(format!(
                        "the constructor of {} returned {other:?} instead of a new object",
                        constructor.defining_class
                    ))
                    .into()),
                }
            }
            NonInitialPayload::InstanceMethodCall {
                method,
                receiver,
                actuals,
            } => {
                ctx.load(*receiver)?;
                let invocation = Invocation::Method {
                    method: method.clone(),
                    receiver: Some(*receiver),
                    actuals: actuals.clone(),
                };
                vm.invoke(ctx, &invocation).map(Outcome::Value)
            }
            NonInitialPayload::StaticMethodCall { method, actuals } => {
                let invocation = Invocation::Method {
                    method: method.clone(),
                    receiver: None,
                    actuals: actuals.clone(),
                };
                vm.invoke(ctx, &invocation).map(Outcome::Value)
            }
        }
    }

    fn install_jar(
        &self,
        ctx: &mut ExecutionContext<'_>,
        jar: &[u8],
        dependencies: &[TransactionReference],
    ) -> Result<Outcome, ExecutionError> {
        ctx.charge_cpu(gas::cpu_cost_for_installing_jar(jar.len()))?;
        ctx.charge_ram(gas::ram_cost_for_installing_jar(jar.len()))?;
        for (_, dependency) in &self.dependencies {
            ctx.charge_cpu(gas::cpu_cost_for_loading_jar(dependency.len()))?;
            ctx.charge_ram(gas::ram_cost_for_loading_jar(dependency.len()))?;
        }

        let consensus = &self.snapshot.consensus;
        let rules = VerificationRules {
            verification_version: consensus.verification_version,
            is_initial: false,
            skips_verification: consensus.skips_verification,
        };
        let jars: Vec<&InstrumentedJar> = self.dependencies.iter().map(|(_, jar)| jar).collect();
        let instrumented_jar = self
            .node
            .verifier
            .verify_and_instrument(jar, &jars, rules)
            .map_err(|errors| {
                ExecutionError::Verification(
                    errors
                        .first()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "verification failed".to_string()),
                )
            })?;

        Ok(Outcome::JarStore {
            instrumented_jar,
            dependencies: dependencies.to_vec(),
            verification_version: consensus.verification_version,
        })
    }

    /// A view may only have modified the nonce and balances of its caller and the balance
    /// of the validators.
    fn check_no_side_effects(
        &self,
        ctx: &ExecutionContext<'_>,
        completion: &Completion,
    ) -> Result<(), ExecutionError> {
        let caller = self.request.caller;
        let allowed = |update: &Update| match update {
            Update::Field { object, field, .. } if *object == caller => {
                *field == FieldSignature::balance()
                    || *field == FieldSignature::red_balance()
                    || *field == FieldSignature::nonce()
            }
            Update::Field { object, field, .. } => {
                Some(*object) == self.snapshot.validators
                    && *field == FieldSignature::balance()
            }
            Update::ClassTag { .. } => false,
        };

        let updates = self.updates(ctx, completion)?;
        if updates.iter().all(allowed) {
            Ok(())
        } else {
            Err(ExecutionError::SideEffectsInViewMethod)
        }
    }

    fn roots(&self, ctx: &ExecutionContext<'_>, completion: &Completion) -> Vec<StorageReference> {
        let mut roots = vec![self.request.caller, self.admitted.payer];
        roots.extend(self.snapshot.validators);
        roots.extend(self.request.receiver());
        roots.extend(self.request.storage_actuals());
        match completion {
            Completion::Normal(Outcome::NewObject(object)) => roots.push(*object),
            Completion::Normal(Outcome::Value(Some(StorageValue::Reference(object)))) => {
                roots.push(*object)
            }
            _ => {}
        }
        roots.extend_from_slice(ctx.events());
        roots
    }

    fn updates(
        &self,
        ctx: &ExecutionContext<'_>,
        completion: &Completion,
    ) -> Result<Vec<Update>, ExecutionError> {
        let roots = self.roots(ctx, completion);
        Ok(UpdateExtractor::new(&ctx.heap)
            .extract(roots)?
            .into_iter()
            .collect())
    }

    fn response(
        &self,
        ctx: &ExecutionContext<'_>,
        completion: &Completion,
    ) -> Result<TransactionResponse, ExecutionError> {
        let updates = self.updates(ctx, completion)?;
        let events = ctx.events().to_vec();
        let gas = ctx.gas.consumed();

        Ok(match completion {
            Completion::Normal(outcome) => TransactionResponse::Success(SuccessfulResponse {
                outcome: outcome.clone(),
                updates,
                events,
                gas,
            }),
            Completion::Exception(throwable) => {
                TransactionResponse::Exception(ExceptionResponse {
                    cause: ExecutionError::Thrown(throwable.clone())
                        .cause(self.max_error_length()),
                    updates,
                    events,
                    gas,
                })
            }
        })
    }

    /// The response of a transaction that failed after admission. Everything it did is
    /// discarded, except for the consumption of the nonce and the payment of all its gas.
    fn failed(
        &self,
        mut ctx: ExecutionContext<'_>,
        error: ExecutionError,
    ) -> Result<TransactionResponse, NodeError> {
        let consumed = ctx.gas.consumed();
        let gas_for_penalty = self.request.gas_limit.saturating_sub(consumed.total());
        tracing::debug!(
            reference = %self.reference,
            %error,
            gas_for_penalty,
            "transaction failed"
        );

        ctx.reset_heap();
        ctx.gas = GasAccount::unbounded();
        let updates = self.failure_updates(&mut ctx).map_err(|e| {
            InternalFailure::new(format!(
                "cannot record the failure of transaction {}: {e}",
                self.reference
            ))
        })?;

        Ok(TransactionResponse::Failed(FailedResponse {
            cause: error.cause(self.max_error_length()),
            updates,
            gas: consumed,
            gas_for_penalty,
        }))
    }

    fn failure_updates(&self, ctx: &mut ExecutionContext<'_>) -> Result<Vec<Update>, ExecutionError> {
        let caller = self.request.caller;
        if !self.view {
            ctx.increase_nonce(caller)?;
        }

        let cost = phase::cost_of(self.request.gas_limit, self.request.gas_price);
        phase::debit_payer(ctx, self.admitted.payer, cost)?;
        phase::pay_validators(ctx, self.snapshot.validators, cost, self.snapshot.inflation)?;

        let mut roots = vec![caller, self.admitted.payer];
        roots.extend(self.snapshot.validators);
        Ok(UpdateExtractor::new(&ctx.heap)
            .extract(roots)?
            .into_iter()
            .collect())
    }

    fn max_error_length(&self) -> usize {
        self.snapshot.consensus.max_error_length as usize
    }
}
