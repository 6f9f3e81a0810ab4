//! Formula function definitions and registry
//!
//! Every function and operator is a [`Function`]: a signature describing its
//! arity and flags, one argument checker per position, a typing callback run
//! once all arguments pass their checkers, and a codegen callback producing
//! the backend expression.

use crate::ast::Expression;
use crate::config::FormulaConfig;
use crate::error::{Error, Result};
use crate::types::context::DispatchContext;
use crate::types::data_type::{ExpressionType, InvalidKind, TypeTag, ValidType};
use crate::types::expression::QueryExpression;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

// Operators
mod add;
mod comparison;
mod divide;
mod equal;
mod minus;
mod multiply;
mod not_equal;

// Boolean functions
mod and;
mod if_function;
mod not;
mod or;

// Text functions
mod concat;
mod contains;
mod length;
mod lower;
mod replace;
mod totext;
mod trim;
mod upper;

// Number functions
mod abs;
mod ceil;
mod floor;
mod greatest;
mod least;
mod round;
mod sqrt;
mod tonumber;

// Null handling
pub(crate) mod coalesce;
pub(crate) mod error_to_null;
mod isblank;
mod when_empty;

// Date functions
mod date_diff;
mod datetime_format;
mod extract;
mod now;
mod today;
mod todate;

// Row functions
mod row_id;

// Aggregate functions
pub(crate) mod array_agg;
mod avg;
mod count;
mod filter;
mod join;
mod max;
mod min;
mod sum;

/// Metadata about a function's signature
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    /// Function name (lowercase)
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>,
    /// Collapses many values into one per host row
    pub is_aggregate: bool,
    /// Transparently removed when the field it guards is referenced elsewhere
    pub is_wrapper: bool,
    /// Infix symbol for operators
    pub operator: Option<&'static str>,
    /// Nullable arguments are replaced by a non-null substitute before typing
    pub coerce_nullable_args: bool,
    /// The value changes with time and must be refreshed periodically
    pub needs_periodic_update: bool,
}

impl FunctionSignature {
    pub const fn new(name: &'static str, min_args: usize, max_args: Option<usize>) -> Self {
        Self {
            name,
            min_args,
            max_args,
            is_aggregate: false,
            is_wrapper: false,
            operator: None,
            coerce_nullable_args: false,
            needs_periodic_update: false,
        }
    }

    pub const fn exact(name: &'static str, args: usize) -> Self {
        Self::new(name, args, Some(args))
    }

    pub const fn aggregate(mut self) -> Self {
        self.is_aggregate = true;
        self
    }

    pub const fn wrapper(mut self) -> Self {
        self.is_wrapper = true;
        self
    }

    pub const fn operator(mut self, symbol: &'static str) -> Self {
        self.operator = Some(symbol);
        self
    }

    pub const fn coerce_nullable_args(mut self) -> Self {
        self.coerce_nullable_args = true;
        self
    }

    pub const fn periodic(mut self) -> Self {
        self.needs_periodic_update = true;
        self
    }

    pub fn accepts_arg_count(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.is_none_or(|max| count <= max)
    }

    /// "operator +" or "function concat", as used in error messages
    pub fn description(&self) -> String {
        match self.operator {
            Some(op) => format!("operator {}", op),
            None => format!("function {}", self.name),
        }
    }

    fn arity_requirement(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => format!("exactly {}", plural_args(max)),
            Some(max) => format!("between {} and {}", self.min_args, plural_args(max)),
            None => format!("at least {}", plural_args(self.min_args)),
        }
    }
}

fn plural_args(count: usize) -> String {
    if count == 1 {
        "1 argument".to_string()
    } else {
        format!("{} arguments", count)
    }
}

/// Decides which types an argument position accepts
#[derive(Clone, Copy)]
pub enum ArgChecker {
    /// Any valid type
    Any,
    Only(&'static [TypeTag]),
    /// Acceptable tags computed from the types of every argument of the call
    DependsOn(fn(usize, &[&ValidType]) -> Vec<TypeTag>),
}

impl ArgChecker {
    pub fn acceptable(&self, index: usize, arg_types: &[&ValidType]) -> Vec<TypeTag> {
        match self {
            ArgChecker::Any => TypeTag::ALL.to_vec(),
            ArgChecker::Only(tags) => tags.to_vec(),
            ArgChecker::DependsOn(checker) => checker(index, arg_types),
        }
    }
}

/// Trait for formula functions
pub trait Function: Send + Sync {
    /// Get the function's signature
    fn signature(&self) -> &FunctionSignature;

    /// Checker for the argument at `index`
    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Any
    }

    /// Type a call whose arguments all passed their checkers. May return a
    /// different node shape than the call itself.
    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression>;

    /// Lower a typed call, given its already compiled arguments
    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        node: &Expression,
        context: &DispatchContext<'_>,
    ) -> Result<QueryExpression>;
}

/// Shared handle to a registered function. Two handles are equal when they
/// name the same function, ignoring case.
#[derive(Clone)]
pub struct FunctionRef(Arc<dyn Function>);

impl FunctionRef {
    pub fn new(function: Box<dyn Function>) -> Self {
        Self(Arc::from(function))
    }

    pub fn name(&self) -> &'static str {
        self.0.signature().name
    }
}

impl Deref for FunctionRef {
    type Target = dyn Function;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl PartialEq for FunctionRef {
    fn eq(&self, other: &Self) -> bool {
        self.name().eq_ignore_ascii_case(other.name())
    }
}

impl Eq for FunctionRef {}

impl Hash for FunctionRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().to_lowercase().hash(state);
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionRef({})", self.name())
    }
}

/// A call being typed: its arguments are typed and valid
pub struct TypingCall<'a> {
    registry: &'a FunctionRegistry,
    config: &'a FormulaConfig,
    function: FunctionRef,
    args: Vec<Expression>,
    arg_types: Vec<ValidType>,
}

impl<'a> TypingCall<'a> {
    pub fn args(&self) -> &[Expression] {
        &self.args
    }

    pub fn arg_type(&self, index: usize) -> &ValidType {
        &self.arg_types[index]
    }

    pub fn arg_types(&self) -> &[ValidType] {
        &self.arg_types
    }

    pub fn any_nullable(&self) -> bool {
        self.arg_types.iter().any(|t| t.nullable)
    }

    /// Largest decimal places among the numeric arguments
    pub fn max_decimal_places(&self) -> u32 {
        self.arg_types
            .iter()
            .filter_map(ValidType::decimal_places)
            .max()
            .unwrap_or(0)
    }

    pub fn config(&self) -> &'a FormulaConfig {
        self.config
    }

    pub fn registry(&self) -> &'a FunctionRegistry {
        self.registry
    }

    pub fn into_args(self) -> Vec<Expression> {
        self.args
    }

    pub fn with_valid_type(self, valid: ValidType) -> Result<Expression> {
        Expression::call(self.function, self.args).with_valid_type(valid)
    }

    pub fn with_invalid_type(self, kind: InvalidKind, error: impl Into<String>) -> Result<Expression> {
        Expression::call(self.function, self.args).with_invalid_type(kind, error)
    }

    /// Type a call to another function in place of this one
    pub fn type_as(&self, name: &str, args: Vec<Expression>) -> Result<Expression> {
        let function = self.registry.require(name)?;
        type_call(self.registry, self.config, function, args)
    }
}

/// Type a call whose arguments are already typed.
///
/// Invalid arguments win first (leftmost), then arity, then each checker in
/// argument order. Only a call passing all of them reaches the function's
/// own typing callback.
pub fn type_call(
    registry: &FunctionRegistry,
    config: &FormulaConfig,
    function: FunctionRef,
    args: Vec<Expression>,
) -> Result<Expression> {
    let signature = function.signature().clone();

    let first_invalid = args
        .iter()
        .find_map(|arg| match arg.expression_type() {
            Some(invalid @ ExpressionType::Invalid(_)) => Some(Ok(invalid.clone())),
            Some(ExpressionType::Valid(_)) => None,
            None => Some(Err(Error::Untyped(arg.to_string()))),
        })
        .transpose()?;
    if let Some(invalid) = first_invalid {
        return Expression::call(function, args).with_type(invalid);
    }

    if !signature.accepts_arg_count(args.len()) {
        let given = if args.len() == 1 {
            "1 argument was".to_string()
        } else {
            format!("{} arguments were", args.len())
        };
        let message = format!(
            "{} given to the {}, it must instead be given {}",
            given,
            signature.description(),
            signature.arity_requirement()
        );
        return Expression::call(function, args)
            .with_invalid_type(InvalidKind::ArgumentArityMismatch, message);
    }

    if signature.is_aggregate && !args.first().is_some_and(Expression::many) {
        let message = format!(
            "the {} can only be used on lookups or link fields",
            signature.description()
        );
        return Expression::call(function, args).with_invalid_type(InvalidKind::Other, message);
    }

    let arg_types: Vec<ValidType> = args
        .iter()
        .filter_map(|arg| arg.valid_type().cloned())
        .collect();
    let type_refs: Vec<&ValidType> = arg_types.iter().collect();
    let mismatch = arg_types.iter().enumerate().find_map(|(index, actual)| {
        let acceptable = function.arg_checker(index).acceptable(index, &type_refs);
        (!acceptable.contains(&actual.tag()))
            .then(|| mismatch_message(&signature, index, actual.tag(), &acceptable))
    });
    if let Some(message) = mismatch {
        return Expression::call(function, args)
            .with_invalid_type(InvalidKind::ArgumentTypeMismatch, message);
    }

    let args = if signature.coerce_nullable_args {
        args.into_iter()
            .map(|arg| match arg.valid_type().cloned() {
                Some(valid) if valid.nullable => valid.try_coerce_to_not_null(arg, registry, config),
                _ => Ok(arg),
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        args
    };
    let arg_types: Vec<ValidType> = args
        .iter()
        .filter_map(|arg| arg.valid_type().cloned())
        .collect();
    let refresh = arg_types.iter().any(|t| t.requires_refresh_after_insert);

    let typed = function.clone().type_function(TypingCall {
        registry,
        config,
        function,
        args,
        arg_types,
    })?;

    // Values only known after insert taint everything computed from them
    match typed.valid_type() {
        Some(valid) if refresh && !valid.requires_refresh_after_insert => {
            let valid = valid.clone().with_requires_refresh_after_insert(true);
            Ok(typed.retyped(valid.into()))
        }
        _ => Ok(typed),
    }
}

fn mismatch_message(
    signature: &FunctionSignature,
    index: usize,
    actual: TypeTag,
    acceptable: &[TypeTag],
) -> String {
    let prefix = format!(
        "argument number {} given to {} was of type {}",
        index + 1,
        signature.description(),
        actual
    );
    match acceptable {
        [] => format!("{} but there are no possible types usable here", prefix),
        [only] => format!(
            "{} but the only usable type for this argument is {}",
            prefix, only
        ),
        many => {
            let names: Vec<&str> = many.iter().map(TypeTag::as_str).collect();
            format!(
                "{} but the only usable types for this argument are {}",
                prefix,
                names.join(", ")
            )
        }
    }
}

/// Valid type of argument `index` of a typed call node
pub(crate) fn typed_arg(node: &Expression, index: usize) -> Result<&ValidType> {
    node.args()
        .get(index)
        .and_then(Expression::valid_type)
        .ok_or_else(|| Error::Untyped(format!("argument {} of {}", index, node)))
}

/// Unpack exactly `N` compiled arguments
pub(crate) fn exact_args<const N: usize>(
    name: &str,
    args: Vec<QueryExpression>,
) -> Result<[QueryExpression; N]> {
    let given = args.len();
    args.try_into().map_err(|_| {
        Error::ExecutionError(format!("{} expects {} arguments, got {}", name, N, given))
    })
}

/// Checker accepting only the tag of argument `I`
pub(crate) fn same_tag_as<const I: usize>(_index: usize, arg_types: &[&ValidType]) -> Vec<TypeTag> {
    arg_types
        .get(I)
        .map(|valid| vec![valid.tag()])
        .unwrap_or_default()
}

/// Lower a two argument call into a binary backend node
pub(crate) fn binary(
    name: &str,
    args: Vec<QueryExpression>,
    op: fn(Box<QueryExpression>, Box<QueryExpression>) -> QueryExpression,
) -> Result<QueryExpression> {
    let [lhs, rhs] = exact_args::<2>(name, args)?;
    Ok(op(Box::new(lhs), Box::new(rhs)))
}

/// Registry builder collecting functions before the registry is frozen
#[derive(Default)]
pub struct FunctionRegistryBuilder {
    functions: HashMap<String, FunctionRef>,
    duplicates: Vec<String>,
}

impl FunctionRegistryBuilder {
    /// An empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder holding every builtin function
    pub fn with_builtins() -> Self {
        let mut builder = Self::new();

        // Operators
        add::register(&mut builder);
        minus::register(&mut builder);
        multiply::register(&mut builder);
        divide::register(&mut builder);
        equal::register(&mut builder);
        not_equal::register(&mut builder);
        comparison::register(&mut builder);

        // Boolean functions
        and::register(&mut builder);
        or::register(&mut builder);
        not::register(&mut builder);
        if_function::register(&mut builder);

        // Text functions
        concat::register(&mut builder);
        upper::register(&mut builder);
        lower::register(&mut builder);
        length::register(&mut builder);
        trim::register(&mut builder);
        replace::register(&mut builder);
        contains::register(&mut builder);
        totext::register(&mut builder);

        // Number functions
        tonumber::register(&mut builder);
        abs::register(&mut builder);
        round::register(&mut builder);
        ceil::register(&mut builder);
        floor::register(&mut builder);
        sqrt::register(&mut builder);
        greatest::register(&mut builder);
        least::register(&mut builder);

        // Null handling
        isblank::register(&mut builder);
        when_empty::register(&mut builder);
        coalesce::register(&mut builder);
        error_to_null::register(&mut builder);

        // Date functions
        now::register(&mut builder);
        today::register(&mut builder);
        todate::register(&mut builder);
        datetime_format::register(&mut builder);
        extract::register(&mut builder);
        date_diff::register(&mut builder);

        // Row functions
        row_id::register(&mut builder);

        // Aggregate functions
        sum::register(&mut builder);
        min::register(&mut builder);
        max::register(&mut builder);
        avg::register(&mut builder);
        count::register(&mut builder);
        join::register(&mut builder);
        array_agg::register(&mut builder);
        filter::register(&mut builder);

        builder
    }

    /// Register a function
    pub fn register(&mut self, function: Box<dyn Function>) {
        let function = FunctionRef::new(function);
        let key = function.name().to_lowercase();
        if self.functions.contains_key(&key) {
            self.duplicates.push(key);
        } else {
            self.functions.insert(key, function);
        }
    }

    /// Freeze into a registry, failing on the first duplicated name
    pub fn build(self) -> Result<FunctionRegistry> {
        let (registry, duplicates) = self.freeze();
        match duplicates.into_iter().next() {
            Some(duplicate) => Err(Error::DuplicateFunction(duplicate)),
            None => Ok(registry),
        }
    }

    /// Freeze keeping the first registration of each name, returning the
    /// names that were registered more than once
    fn freeze(self) -> (FunctionRegistry, Vec<String>) {
        (
            FunctionRegistry {
                functions: self.functions,
            },
            self.duplicates,
        )
    }
}

static REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// Immutable catalogue of functions, keyed by lowercase name
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionRef>,
}

impl FunctionRegistry {
    /// Builder preloaded with the builtin functions, for adding plugins
    pub fn builder() -> FunctionRegistryBuilder {
        FunctionRegistryBuilder::with_builtins()
    }

    /// Registry of the builtin functions
    pub fn builtin() -> Result<Self> {
        FunctionRegistryBuilder::with_builtins().build()
    }

    /// The process-wide registry. Holds the builtins unless another
    /// registry was installed before first use.
    pub fn global() -> &'static FunctionRegistry {
        REGISTRY.get_or_init(|| Self::freeze_builtins(FunctionRegistryBuilder::with_builtins()))
    }

    /// Freeze the builtins for the global registry. A duplicated name keeps
    /// its first registration and is logged, since `global()` cannot fail.
    fn freeze_builtins(builder: FunctionRegistryBuilder) -> Self {
        let (registry, duplicates) = builder.freeze();
        for duplicate in &duplicates {
            tracing::error!(function = %duplicate, "builtin function registered twice, keeping the first");
        }
        tracing::debug!(functions = registry.len(), "function registry frozen");
        registry
    }

    /// Install the process-wide registry. Fails once the registry is in use.
    pub fn install(registry: FunctionRegistry) -> Result<&'static FunctionRegistry> {
        let count = registry.len();
        REGISTRY.set(registry).map_err(|_| {
            tracing::warn!("function registry already installed, ignoring new registry");
            Error::RegistryAlreadyInstalled
        })?;
        tracing::debug!(functions = count, "function registry installed");
        Ok(Self::global())
    }

    /// Look up a function by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&FunctionRef> {
        self.functions.get(&name.to_lowercase())
    }

    pub fn require(&self, name: &str) -> Result<FunctionRef> {
        self.get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))
    }

    /// Build an untyped call node to the named function
    pub fn call(&self, name: &str, args: Vec<Expression>) -> Result<Expression> {
        Ok(Expression::call(self.require(name)?, args))
    }

    /// Names of all registered functions, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Look up a function in the process-wide registry
pub fn get_function(name: &str) -> Option<&'static FunctionRef> {
    FunctionRegistry::global().get(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shout;

    impl Function for Shout {
        fn signature(&self) -> &FunctionSignature {
            static SIGNATURE: FunctionSignature = FunctionSignature::exact("SHOUT", 1);
            &SIGNATURE
        }

        fn arg_checker(&self, _index: usize) -> ArgChecker {
            ArgChecker::Only(&[TypeTag::Text])
        }

        fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
            let nullable = call.any_nullable();
            call.with_valid_type(ValidType::text().with_nullable(nullable))
        }

        fn to_query(
            &self,
            args: Vec<QueryExpression>,
            _node: &Expression,
            _context: &DispatchContext<'_>,
        ) -> Result<QueryExpression> {
            Ok(QueryExpression::Function(
                crate::types::expression::ScalarFunction::Upper,
                args,
            ))
        }
    }

    #[test]
    fn test_builtins_have_unique_names() {
        let registry = FunctionRegistry::builtin().unwrap();
        assert_eq!(registry.len(), FunctionRegistry::global().len());
        assert!(registry.get("concat").is_some());
        assert!(registry.get("CONCAT").is_some());
        assert!(registry.get("does_not_exist").is_none());
    }

    #[test]
    fn test_global_freeze_keeps_first_duplicate() {
        let mut builder = FunctionRegistryBuilder::with_builtins();
        builder.register(Box::new(Shout));
        builder.register(Box::new(Shout));
        let builtins = FunctionRegistry::builtin().unwrap().len();

        let registry = FunctionRegistry::freeze_builtins(builder);
        assert_eq!(registry.len(), builtins + 1);
        assert!(registry.get("shout").is_some());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut builder = FunctionRegistry::builder();
        builder.register(Box::new(Shout));
        builder.register(Box::new(Shout));
        assert_eq!(
            builder.build().err(),
            Some(Error::DuplicateFunction("shout".into()))
        );
    }

    #[test]
    fn test_plugin_lookup_is_case_insensitive() {
        let mut builder = FunctionRegistry::builder();
        builder.register(Box::new(Shout));
        let registry = builder.build().unwrap();
        let by_lower = registry.get("shout").unwrap();
        let by_upper = registry.get("Shout").unwrap();
        assert_eq!(by_lower, by_upper);

        let mut map = HashMap::new();
        map.insert(by_lower.clone(), 1);
        assert_eq!(map.get(by_upper), Some(&1));
    }

    #[test]
    fn test_arity_messages() {
        assert_eq!(
            FunctionSignature::exact("upper", 1).arity_requirement(),
            "exactly 1 argument"
        );
        assert_eq!(
            FunctionSignature::new("round", 1, Some(2)).arity_requirement(),
            "between 1 and 2 arguments"
        );
        assert_eq!(
            FunctionSignature::new("concat", 1, None).arity_requirement(),
            "at least 1 argument"
        );
    }

    #[test]
    fn test_mismatch_phrasing() {
        let sig = FunctionSignature::exact("add", 2).operator("+");
        assert_eq!(
            mismatch_message(&sig, 1, TypeTag::Boolean, &[TypeTag::Number]),
            "argument number 2 given to operator + was of type boolean but the only usable type for this argument is number"
        );
        assert_eq!(
            mismatch_message(&sig, 0, TypeTag::Array, &[TypeTag::Text, TypeTag::Date]),
            "argument number 1 given to operator + was of type array but the only usable types for this argument are text, date"
        );
        assert_eq!(
            mismatch_message(&sig, 1, TypeTag::Text, &[]),
            "argument number 2 given to operator + was of type text but there are no possible types usable here"
        );
    }
}
