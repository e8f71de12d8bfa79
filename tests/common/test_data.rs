use std::sync::Arc;

use borsh::BorshSerialize;
use ed25519_dalek::{Signer, SigningKey};
use hotmoka_runtime::{
    constants::{self, *},
    types::{
        Cause, ConstructorSignature, FieldSignature, GameteCreationRequest, InitializationRequest,
        JarStoreInitialRequest, MethodSignature, NonInitialPayload, NonInitialTransactionRequest,
        StorageReference, StorageType, StorageValue, TransactionReference, TransactionRequest,
        TransactionResponse,
    },
    ClassDescriptor, ExecutionContext, ExecutionError, MethodDescriptor, NodeError, Runtime,
    RuntimeConfig, Throwable, Verifier,
};

use super::{field_of_getter, MemoryStore, ScriptedVm, ToyVerifier, CONSTRUCTOR};

pub const CHAIN_ID: &str = "test-chain";
pub const GAS_PRICE: u64 = 1;
pub const GAS_LIMIT: u64 = 100_000;
pub const SETUP_GAS_LIMIT: u64 = 1_000_000;
pub const GAMETE_AMOUNT: i128 = 1_000_000_000_000;
pub const MAX_ERROR_LENGTH: i32 = 300;

pub const COUNTER: &str = "io.hotmoka.tests.Counter";
pub const NOTE: &str = "io.hotmoka.tests.Note";
pub const FORGER: &str = "io.hotmoka.tests.Forger";
pub const MY_EXCEPTION: &str = "io.hotmoka.tests.MyException";

pub struct TestData {}

impl TestData {
    pub fn big_integer() -> StorageType {
        StorageType::class(BIG_INTEGER)
    }

    pub fn string() -> StorageType {
        StorageType::class(STRING)
    }

    pub fn count_field() -> FieldSignature {
        FieldSignature::new(COUNTER, "count", StorageType::Int)
    }

    /// `ExternallyOwnedAccount(BigInteger green, BigInteger red, String publicKey)`
    pub fn account_constructor() -> ConstructorSignature {
        ConstructorSignature::new(
            EXTERNALLY_OWNED_ACCOUNT,
            vec![Self::big_integer(), Self::big_integer(), Self::string()],
        )
    }

    pub fn manifest_constructor() -> ConstructorSignature {
        ConstructorSignature::new(MANIFEST, vec![])
    }

    /// `Counter(BigInteger balance)`
    pub fn counter_constructor() -> ConstructorSignature {
        ConstructorSignature::new(COUNTER, vec![Self::big_integer()])
    }

    pub fn note_constructor() -> ConstructorSignature {
        ConstructorSignature::new(NOTE, vec![])
    }

    pub fn increment() -> MethodSignature {
        MethodSignature::new(COUNTER, "increment", vec![], None)
    }

    /// A view method.
    pub fn get() -> MethodSignature {
        MethodSignature::getter(COUNTER, "get", StorageType::Int)
    }

    /// Declared view, but increments the counter.
    pub fn sneaky_get() -> MethodSignature {
        MethodSignature::getter(COUNTER, "sneakyGet", StorageType::Int)
    }

    /// Increments the counter, then throws an unchecked exception.
    pub fn fail() -> MethodSignature {
        MethodSignature::new(COUNTER, "fail", vec![], None)
    }

    /// Increments the counter, then throws a checked exception it declares.
    pub fn fail_checked() -> MethodSignature {
        MethodSignature::new(COUNTER, "failChecked", vec![], None)
    }

    /// Increments the counter, then throws a checked exception it does not declare.
    pub fn fail_checked_undeclared() -> MethodSignature {
        MethodSignature::new(COUNTER, "failCheckedUndeclared", vec![], None)
    }

    /// Consumes CPU until it runs out of gas.
    pub fn burn() -> MethodSignature {
        MethodSignature::new(COUNTER, "burn", vec![], None)
    }

    /// Increments the counter, at the expense of the counter itself.
    pub fn pay_with_receiver() -> MethodSignature {
        MethodSignature::new(COUNTER, "payWithReceiver", vec![], None)
    }

    /// Static, returns 0.
    pub fn zero() -> MethodSignature {
        MethodSignature::getter(COUNTER, "zero", StorageType::Int)
    }

    /// Sets the green balance of the caller to the largest balance there is.
    pub fn windfall() -> MethodSignature {
        MethodSignature::new(COUNTER, "windfall", vec![], None)
    }

    /// A view telling if the transaction that created the counter succeeded.
    pub fn is_deployed() -> MethodSignature {
        MethodSignature::getter(COUNTER, "isDeployed", StorageType::Boolean)
    }

    /// Self-charged method of a storage class that is not a contract.
    pub fn touch() -> MethodSignature {
        MethodSignature::new(NOTE, "touch", vec![], None)
    }

    pub fn set_gas_price() -> MethodSignature {
        MethodSignature::new(GAS_STATION, "setGasPrice", vec![Self::big_integer()], None)
    }

    pub fn set_current_inflation() -> MethodSignature {
        MethodSignature::new(VALIDATORS, "setCurrentInflation", vec![StorageType::Long], None)
    }

    pub fn increase_verification_version() -> MethodSignature {
        MethodSignature::new(VERSIONS, "increaseVerificationVersion", vec![], None)
    }

    /// Static method that emits a gas price update created by its caller.
    pub fn forge_gas_price_update() -> MethodSignature {
        MethodSignature::new(FORGER, "forgeGasPriceUpdate", vec![], None)
    }

    /// The base jar: the classes of the base library, of governance and of the tests.
    pub fn base_jar() -> Vec<u8> {
        let classes = vec![
            ClassDescriptor::new(STORAGE, None),
            ClassDescriptor::new(CONTRACT, Some(STORAGE)),
            ClassDescriptor::new(ACCOUNT_ED25519, None),
            ClassDescriptor::new(EXTERNALLY_OWNED_ACCOUNT, Some(CONTRACT)),
            ClassDescriptor::new(GAMETE, Some(EXTERNALLY_OWNED_ACCOUNT)),
            ClassDescriptor::new(EVENT, Some(STORAGE)),
            ClassDescriptor::new(MANIFEST, Some(EXTERNALLY_OWNED_ACCOUNT)),
            ClassDescriptor::new(VALIDATORS, Some(CONTRACT)),
            ClassDescriptor::new(GAS_STATION, Some(CONTRACT)),
            ClassDescriptor::new(VERSIONS, Some(CONTRACT)),
            ClassDescriptor::new(CONSENSUS_UPDATE_EVENT, Some(EVENT)),
            ClassDescriptor::new(GAS_PRICE_UPDATE_EVENT, Some(EVENT)),
            ClassDescriptor::new(INFLATION_UPDATE_EVENT, Some(EVENT)),
            ClassDescriptor::new(COUNTER, Some(CONTRACT))
                .with_method(MethodDescriptor::new(Self::increment()))
                .with_method(MethodDescriptor::new(Self::get()).view())
                .with_method(MethodDescriptor::new(Self::sneaky_get()).view())
                .with_method(MethodDescriptor::new(Self::fail()))
                .with_method(MethodDescriptor::new(Self::fail_checked()).throws_exceptions())
                .with_method(MethodDescriptor::new(Self::fail_checked_undeclared()))
                .with_method(MethodDescriptor::new(Self::burn()))
                .with_method(MethodDescriptor::new(Self::pay_with_receiver()).self_charged())
                .with_method(MethodDescriptor::new(Self::zero()).view())
                .with_method(MethodDescriptor::new(Self::windfall()))
                .with_method(MethodDescriptor::new(Self::is_deployed()).view()),
            ClassDescriptor::new(NOTE, Some(STORAGE))
                .with_method(MethodDescriptor::new(Self::touch()).self_charged()),
            ClassDescriptor::new(FORGER, None),
        ];
        Self::jar_of(classes)
    }

    /// A jar that passes verification at version 0 only.
    pub fn legacy_jar() -> Vec<u8> {
        Self::jar_of(vec![ClassDescriptor::new("LegacyWidget", Some(STORAGE))])
    }

    /// A jar that never passes verification.
    pub fn illegal_jar() -> Vec<u8> {
        Self::jar_of(vec![ClassDescriptor::new("IllegalWidget", Some(STORAGE))])
    }

    pub fn plain_jar(class_name: &str) -> Vec<u8> {
        Self::jar_of(vec![ClassDescriptor::new(class_name, Some(STORAGE))])
    }

    pub fn jar_of(classes: Vec<ClassDescriptor>) -> Vec<u8> {
        classes.try_to_vec().expect("classes serialize")
    }

    pub fn signing_key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    pub fn public_key_of(key: &SigningKey) -> String {
        base64url::encode(key.verifying_key().as_bytes())
    }

    pub fn sign(mut request: NonInitialTransactionRequest, key: &SigningKey) -> NonInitialTransactionRequest {
        request.signature = None;
        let signature = key.sign(&request.bytes_to_sign());
        request.signature = Some(signature.to_bytes().to_vec());
        request
    }

    /// The code of every class of the base jar.
    pub fn vm() -> ScriptedVm {
        let vm = ScriptedVm::default()
            .on(MANIFEST, CONSTRUCTOR, |ctx, _, _| create_manifest(ctx))
            .on(EXTERNALLY_OWNED_ACCOUNT, CONSTRUCTOR, |ctx, _, actuals| {
                let [StorageValue::BigInteger(green), StorageValue::BigInteger(red), StorageValue::String(public_key)] =
                    actuals
                else {
                    return Err(illegal_arguments());
                };
                let account = ctx.new_object(EXTERNALLY_OWNED_ACCOUNT)?;
                set_balances(ctx, account, *green, *red)?;
                ctx.set_field(account, FieldSignature::nonce(), StorageValue::BigInteger(0))?;
                ctx.set_field(
                    account,
                    FieldSignature::public_key(),
                    StorageValue::String(public_key.clone()),
                )?;

                let caller = ctx.caller();
                let balance = big_integer(ctx, caller, &FieldSignature::balance())?;
                ctx.set_field(
                    caller,
                    FieldSignature::balance(),
                    StorageValue::BigInteger(balance - green - red),
                )?;
                Ok(Some(StorageValue::Reference(account)))
            })
            .on(COUNTER, CONSTRUCTOR, |ctx, _, actuals| {
                let [StorageValue::BigInteger(balance)] = actuals else {
                    return Err(illegal_arguments());
                };
                let counter = ctx.new_object(COUNTER)?;
                set_balances(ctx, counter, *balance, 0)?;
                ctx.set_field(counter, Self::count_field(), StorageValue::Int(0))?;
                Ok(Some(StorageValue::Reference(counter)))
            })
            .on(COUNTER, "increment", |ctx, receiver, _| {
                increment(ctx, receiver)?;
                Ok(None)
            })
            .on(COUNTER, "get", |ctx, receiver, _| {
                let counter = receiver.ok_or_else(illegal_arguments)?;
                ctx.get_field(counter, &Self::count_field()).map(Some)
            })
            .on(COUNTER, "sneakyGet", |ctx, receiver, _| {
                increment(ctx, receiver).map(|count| Some(StorageValue::Int(count)))
            })
            .on(COUNTER, "fail", |ctx, receiver, _| {
                increment(ctx, receiver)?;
                Err(ExecutionError::Thrown(Throwable::unchecked(
                    "java.lang.IllegalStateException",
                    "the counter refuses to count",
                )))
            })
            .on(COUNTER, "failChecked", |ctx, receiver, _| {
                increment(ctx, receiver)?;
                Err(ExecutionError::Thrown(Throwable::checked(MY_EXCEPTION, "declared")))
            })
            .on(COUNTER, "failCheckedUndeclared", |ctx, receiver, _| {
                increment(ctx, receiver)?;
                Err(ExecutionError::Thrown(Throwable::checked(MY_EXCEPTION, "undeclared")))
            })
            .on(COUNTER, "burn", |ctx, _, _| loop {
                ctx.charge_cpu(1_000)?;
            })
            .on(COUNTER, "payWithReceiver", |ctx, receiver, _| {
                increment(ctx, receiver)?;
                Ok(None)
            })
            .on(COUNTER, "zero", |_, _, _| Ok(Some(StorageValue::Int(0))))
            .on(COUNTER, "windfall", |ctx, _, _| {
                let caller = ctx.caller();
                ctx.set_field(
                    caller,
                    FieldSignature::balance(),
                    StorageValue::BigInteger(i128::MAX),
                )?;
                Ok(None)
            })
            .on(COUNTER, "isDeployed", |ctx, receiver, _| {
                let counter = receiver.ok_or_else(illegal_arguments)?;
                let response = ctx.response_of(&counter.transaction)?;
                Ok(Some(StorageValue::Boolean(matches!(
                    response,
                    Some(TransactionResponse::Success(_))
                ))))
            })
            .on(NOTE, CONSTRUCTOR, |ctx, _, _| {
                ctx.new_object(NOTE).map(|note| Some(StorageValue::Reference(note)))
            })
            .on(NOTE, "touch", |_, _, _| Ok(None))
            .on(GAS_STATION, "setGasPrice", |ctx, receiver, actuals| {
                let (Some(gas_station), [price @ StorageValue::BigInteger(_)]) = (receiver, actuals)
                else {
                    return Err(illegal_arguments());
                };
                ctx.set_field(
                    gas_station,
                    field_of_getter(&constants::get_gas_price()),
                    price.clone(),
                )?;
                emit(ctx, GAS_PRICE_UPDATE_EVENT, gas_station)?;
                Ok(None)
            })
            .on(VALIDATORS, "setCurrentInflation", |ctx, receiver, actuals| {
                let (Some(validators), [inflation @ StorageValue::Long(_)]) = (receiver, actuals)
                else {
                    return Err(illegal_arguments());
                };
                ctx.set_field(
                    validators,
                    field_of_getter(&constants::get_current_inflation()),
                    inflation.clone(),
                )?;
                emit(ctx, INFLATION_UPDATE_EVENT, validators)?;
                Ok(None)
            })
            .on(VERSIONS, "increaseVerificationVersion", |ctx, receiver, _| {
                let versions = receiver.ok_or_else(illegal_arguments)?;
                let field = field_of_getter(&constants::get_verification_version());
                let version = ctx.get_field(versions, &field)?.as_int().unwrap_or(0);
                ctx.set_field(versions, field, StorageValue::Int(version + 1))?;
                emit(ctx, CONSENSUS_UPDATE_EVENT, versions)?;
                Ok(None)
            })
            .on(FORGER, "forgeGasPriceUpdate", |ctx, _, _| {
                let caller = ctx.caller();
                emit(ctx, GAS_PRICE_UPDATE_EVENT, caller)?;
                Ok(None)
            });

        governance_values(None)
            .into_iter()
            .fold(vm, |vm, (getter, _)| vm.on_getter(getter))
    }
}

/// The getters of the governance contracts, with the values the manifest constructor gives
/// them. References to the singletons are only known once they are created.
fn governance_values(
    singletons: Option<(StorageReference, StorageReference, StorageReference)>,
) -> Vec<(MethodSignature, StorageValue)> {
    let reference = |select: fn((StorageReference, StorageReference, StorageReference)) -> StorageReference| {
        singletons.map_or(StorageValue::Null, |s| StorageValue::Reference(select(s)))
    };
    vec![
        (constants::get_chain_id(), StorageValue::String(CHAIN_ID.to_string())),
        (constants::get_max_error_length(), StorageValue::Int(MAX_ERROR_LENGTH)),
        (constants::get_max_dependencies(), StorageValue::Int(20)),
        (constants::get_max_cumulative_size_of_dependencies(), StorageValue::Long(10_000_000)),
        (constants::allows_self_charged(), StorageValue::Boolean(true)),
        (constants::allows_unsigned_faucet(), StorageValue::Boolean(false)),
        (constants::skips_verification(), StorageValue::Boolean(false)),
        (constants::get_signature(), StorageValue::String("ed25519".to_string())),
        (constants::get_validators(), reference(|s| s.0)),
        (constants::get_gas_station(), reference(|s| s.1)),
        (constants::get_versions(), reference(|s| s.2)),
        (constants::get_max_gas_per_transaction(), StorageValue::BigInteger(1_000_000_000)),
        (constants::get_initial_gas_price(), StorageValue::BigInteger(GAS_PRICE as i128)),
        (constants::get_target_gas_at_reward(), StorageValue::BigInteger(1_000_000)),
        (constants::get_oblivion(), StorageValue::Long(250_000)),
        (constants::ignores_gas_price(), StorageValue::Boolean(false)),
        (constants::get_gas_price(), StorageValue::BigInteger(GAS_PRICE as i128)),
        (constants::get_initial_inflation(), StorageValue::Long(0)),
        (constants::get_current_inflation(), StorageValue::Long(0)),
        (constants::get_verification_version(), StorageValue::Int(0)),
    ]
}

fn create_manifest(ctx: &mut ExecutionContext<'_>) -> Result<Option<StorageValue>, ExecutionError> {
    let manifest = ctx.new_object(MANIFEST)?;
    let validators = ctx.new_object(VALIDATORS)?;
    let gas_station = ctx.new_object(GAS_STATION)?;
    let versions = ctx.new_object(VERSIONS)?;
    for contract in [manifest, validators, gas_station, versions] {
        set_balances(ctx, contract, 0, 0)?;
    }
    ctx.set_field(manifest, FieldSignature::nonce(), StorageValue::BigInteger(0))?;

    for (getter, value) in governance_values(Some((validators, gas_station, versions))) {
        let holder = match getter.defining_class.as_str() {
            VALIDATORS => validators,
            GAS_STATION => gas_station,
            VERSIONS => versions,
            _ => manifest,
        };
        ctx.set_field(holder, field_of_getter(&getter), value)?;
    }
    Ok(Some(StorageValue::Reference(manifest)))
}

fn illegal_arguments() -> ExecutionError {
    ExecutionError::IllegalArgument("unexpected arguments".to_string())
}

fn big_integer(
    ctx: &mut ExecutionContext<'_>,
    object: StorageReference,
    field: &FieldSignature,
) -> Result<i128, ExecutionError> {
    Ok(ctx.get_field(object, field)?.as_big_integer().unwrap_or(0))
}

fn set_balances(
    ctx: &mut ExecutionContext<'_>,
    contract: StorageReference,
    green: i128,
    red: i128,
) -> Result<(), ExecutionError> {
    ctx.set_field(contract, FieldSignature::balance(), StorageValue::BigInteger(green))?;
    ctx.set_field(contract, FieldSignature::red_balance(), StorageValue::BigInteger(red))
}

fn increment(
    ctx: &mut ExecutionContext<'_>,
    receiver: Option<StorageReference>,
) -> Result<i32, ExecutionError> {
    let counter = receiver.ok_or_else(illegal_arguments)?;
    let count = ctx
        .get_field(counter, &TestData::count_field())?
        .as_int()
        .unwrap_or(0);
    ctx.set_field(counter, TestData::count_field(), StorageValue::Int(count + 1))?;
    Ok(count + 1)
}

fn emit(
    ctx: &mut ExecutionContext<'_>,
    class_name: &str,
    creator: StorageReference,
) -> Result<(), ExecutionError> {
    let event = ctx.new_object(class_name)?;
    ctx.set_field(event, FieldSignature::event_creator(), StorageValue::Reference(creator))?;
    ctx.emit_event(event)
}

/// An account together with the key that signs its requests.
#[derive(Clone)]
pub struct Account {
    pub reference: StorageReference,
    pub key: SigningKey,
}

/// A runtime on a [MemoryStore], bootstrapped with the base jar, a gamete and a manifest.
pub struct TestNode {
    pub runtime: Runtime<MemoryStore>,
    pub verifier: Arc<ToyVerifier>,
    pub base: TransactionReference,
    pub gamete: Account,
    pub manifest: StorageReference,
}

impl TestNode {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        init_tracing();
        let (runtime, verifier) = Self::runtime(config);

        let base = TransactionRequest::JarStoreInitial(JarStoreInitialRequest {
            jar: TestData::base_jar(),
            dependencies: vec![],
        });
        runtime.process(&base).expect("the base jar is installed");
        let base = base.reference();

        let key = TestData::signing_key(1);
        let gamete = runtime
            .process(&TransactionRequest::GameteCreation(GameteCreationRequest {
                classpath: base,
                initial_amount: GAMETE_AMOUNT,
                red_initial_amount: 0,
                public_key: TestData::public_key_of(&key),
            }))
            .expect("the gamete is created");
        let TransactionResponse::GameteCreation(gamete) = gamete else {
            panic!("unexpected response to the creation of the gamete");
        };
        let gamete = Account {
            reference: gamete.gamete,
            key,
        };

        let manifest = NonInitialTransactionRequest {
            caller: gamete.reference,
            gas_limit: SETUP_GAS_LIMIT,
            gas_price: GAS_PRICE,
            classpath: base,
            nonce: 0,
            chain_id: CHAIN_ID.to_string(),
            payload: NonInitialPayload::ConstructorCall {
                constructor: TestData::manifest_constructor(),
                actuals: vec![],
            },
            signature: None,
        };
        let manifest = runtime
            .process(&TestData::sign(manifest, &gamete.key).into())
            .expect("the manifest is created")
            .new_object()
            .expect("the constructor of the manifest succeeds");

        runtime
            .process(&TransactionRequest::Initialization(InitializationRequest {
                classpath: base,
                manifest,
            }))
            .expect("the node is initialized");
        runtime.store().commit();

        Self {
            runtime,
            verifier,
            base,
            gamete,
            manifest,
        }
    }

    /// A runtime on an empty store.
    pub fn runtime(config: RuntimeConfig) -> (Runtime<MemoryStore>, Arc<ToyVerifier>) {
        let verifier = Arc::new(ToyVerifier::default());
        let runtime = Runtime::new(
            MemoryStore::default(),
            Arc::new(TestData::vm()),
            verifier.clone() as Arc<dyn Verifier>,
        )
        .set_config(config);
        (runtime, verifier)
    }

    pub fn store(&self) -> &MemoryStore {
        self.runtime.store()
    }

    pub fn field(&self, object: StorageReference, field: &FieldSignature) -> Option<StorageValue> {
        self.store().field(&object, field)
    }

    pub fn balance_of(&self, object: StorageReference) -> i128 {
        self.field(object, &FieldSignature::balance())
            .and_then(|value| value.as_big_integer())
            .unwrap_or(0)
    }

    pub fn red_balance_of(&self, object: StorageReference) -> i128 {
        self.field(object, &FieldSignature::red_balance())
            .and_then(|value| value.as_big_integer())
            .unwrap_or(0)
    }

    pub fn nonce_of(&self, account: StorageReference) -> u64 {
        self.field(account, &FieldSignature::nonce())
            .and_then(|value| value.as_big_integer())
            .map_or(0, |nonce| nonce as u64)
    }

    pub fn count_of(&self, counter: StorageReference) -> i32 {
        self.field(counter, &TestData::count_field())
            .and_then(|value| value.as_int())
            .unwrap_or(0)
    }

    pub fn validators(&self) -> StorageReference {
        self.runtime
            .get_validators()
            .expect("the validators can be queried")
            .expect("the node has validators")
    }

    pub fn gas_station(&self) -> StorageReference {
        self.runtime
            .get_gas_station()
            .expect("the gas station can be queried")
            .expect("the node has a gas station")
    }

    pub fn versions(&self) -> StorageReference {
        self.runtime
            .get_versions()
            .expect("the versions can be queried")
            .expect("the node has versions")
    }

    /// A signed request of the account, with its current nonce and the default gas budget.
    pub fn request(&self, caller: &Account, payload: NonInitialPayload) -> NonInitialTransactionRequest {
        let request = NonInitialTransactionRequest {
            caller: caller.reference,
            gas_limit: GAS_LIMIT,
            gas_price: GAS_PRICE,
            classpath: self.base,
            nonce: self.nonce_of(caller.reference),
            chain_id: CHAIN_ID.to_string(),
            payload,
            signature: None,
        };
        TestData::sign(request, &caller.key)
    }

    pub fn call(
        &self,
        caller: &Account,
        receiver: StorageReference,
        method: MethodSignature,
        actuals: Vec<StorageValue>,
    ) -> NonInitialTransactionRequest {
        self.request(
            caller,
            NonInitialPayload::InstanceMethodCall {
                method,
                receiver,
                actuals,
            },
        )
    }

    pub fn process(
        &self,
        request: &NonInitialTransactionRequest,
    ) -> Result<TransactionResponse, NodeError> {
        self.runtime.process(&request.clone().into())
    }

    /// Creates an account funded by the gamete.
    pub fn create_account(&self, seed: u8, green: i128, red: i128) -> Account {
        let key = TestData::signing_key(seed);
        let request = self.request(
            &self.gamete,
            NonInitialPayload::ConstructorCall {
                constructor: TestData::account_constructor(),
                actuals: vec![
                    StorageValue::BigInteger(green),
                    StorageValue::BigInteger(red),
                    StorageValue::String(TestData::public_key_of(&key)),
                ],
            },
        );
        let reference = self
            .process(&request)
            .expect("the account request is admitted")
            .new_object()
            .expect("the account is created");
        Account { reference, key }
    }

    pub fn create_counter(&self, creator: &Account, balance: i128) -> StorageReference {
        let request = self.request(
            creator,
            NonInitialPayload::ConstructorCall {
                constructor: TestData::counter_constructor(),
                actuals: vec![StorageValue::BigInteger(balance)],
            },
        );
        self.process(&request)
            .expect("the counter request is admitted")
            .new_object()
            .expect("the counter is created")
    }

    /// Installs a jar on top of the base jar.
    pub fn install_jar(
        &self,
        installer: &Account,
        jar: Vec<u8>,
        dependencies: Vec<TransactionReference>,
    ) -> (TransactionReference, TransactionResponse) {
        let request = self.request(installer, NonInitialPayload::JarStore { jar, dependencies });
        let reference = TransactionRequest::from(request.clone()).reference();
        let response = self
            .process(&request)
            .expect("the jar store request is admitted");
        (reference, response)
    }
}

/// Logs of the engine go to the output of the test that produced them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// The reason of a rejection, panicking if the request was not rejected.
pub fn rejection_of(result: Result<TransactionResponse, NodeError>) -> String {
    match result {
        Err(error) => error
            .rejection()
            .unwrap_or_else(|| panic!("expected a rejection, got {error}"))
            .to_string(),
        Ok(response) => panic!("expected a rejection, got {response:?}"),
    }
}

/// The cause of a failed or exceptional response.
pub fn cause_of(response: &TransactionResponse) -> Cause {
    match response {
        TransactionResponse::Failed(failed) => failed.cause.clone(),
        TransactionResponse::Exception(exception) => exception.cause.clone(),
        other => panic!("expected a failure, got {other:?}"),
    }
}
