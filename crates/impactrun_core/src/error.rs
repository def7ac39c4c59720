use std::fmt;

/// Errors raised while compiling a formula string
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaError {
    Syntax {
        expression: String,
        position: usize,
        message: String,
    },
    UnknownVariable {
        name: String,
    },
    UnknownFunction {
        name: String,
    },
    Arity {
        function: &'static str,
        expected: &'static str,
        found: usize,
    },
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaError::Syntax {
                expression,
                position,
                message,
            } => write!(
                f,
                "syntax error in formula {expression:?} at offset {position}: {message}"
            ),
            FormulaError::UnknownVariable { name } => write!(f, "unknown variable {name:?}"),
            FormulaError::UnknownFunction { name } => write!(f, "unknown function {name:?}"),
            FormulaError::Arity {
                function,
                expected,
                found,
            } => write!(
                f,
                "function {function} expects {expected} argument(s), got {found}"
            ),
        }
    }
}

impl std::error::Error for FormulaError {}

/// Which formula slot of a node an error refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormulaTarget {
    Amount,
    Indicator(String),
}

impl fmt::Display for FormulaTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaTarget::Amount => write!(f, "amount"),
            FormulaTarget::Indicator(name) => write!(f, "indicator {name}"),
        }
    }
}

/// Errors detected while building a model from its definition.
/// These are never deferred to evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionError {
    DuplicateParameter(String),
    UnknownParameter {
        names: Vec<String>,
    },
    InvalidParameter {
        name: String,
        reason: String,
    },
    Formula {
        node_path: Vec<String>,
        target: FormulaTarget,
        source: FormulaError,
    },
    /// Parameter value expressions that depend on each other
    DependencyCycle(Vec<String>),
    EmptyTree,
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionError::DuplicateParameter(name) => {
                write!(f, "parameter {name:?} is already registered")
            }
            DefinitionError::UnknownParameter { names } => {
                write!(f, "unknown parameter(s): {}", names.join(", "))
            }
            DefinitionError::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter {name:?}: {reason}")
            }
            DefinitionError::Formula {
                node_path,
                target,
                source,
            } => write!(f, "node {} ({target}): {source}", node_path.join("/")),
            DefinitionError::DependencyCycle(names) => write!(
                f,
                "the expressions for the parameters {} are inter-dependent",
                names.join(", ")
            ),
            DefinitionError::EmptyTree => write!(f, "impact model has no root node"),
        }
    }
}

impl std::error::Error for DefinitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DefinitionError::Formula { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors binding concrete values to parameters and variables
#[derive(Debug, Clone, PartialEq)]
pub enum BindingError {
    MissingBinding(String),
    UnknownParameter(String),
    UnknownVariant {
        parameter: String,
        variant: String,
    },
    KindMismatch {
        parameter: String,
        expected: &'static str,
    },
    OutOfBounds {
        parameter: String,
        value: f64,
        min: f64,
        max: f64,
    },
    EmptyValueList(String),
    MismatchedListLengths,
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::MissingBinding(name) => write!(f, "no value bound for {name:?}"),
            BindingError::UnknownParameter(name) => write!(f, "unknown parameter {name:?}"),
            BindingError::UnknownVariant { parameter, variant } => {
                write!(f, "invalid value {variant:?} for the parameter {parameter:?}")
            }
            BindingError::KindMismatch {
                parameter,
                expected,
            } => write!(f, "parameter {parameter:?} expects a {expected} value"),
            BindingError::OutOfBounds {
                parameter,
                value,
                min,
                max,
            } => write!(
                f,
                "value {value} for the parameter {parameter:?} is outside [{min}, {max}]"
            ),
            BindingError::EmptyValueList(name) => {
                write!(f, "the value for the parameter {name:?} can't be an empty list")
            }
            BindingError::MismatchedListLengths => {
                write!(f, "list values must have matching sizes")
            }
        }
    }
}

impl std::error::Error for BindingError {}

/// Numeric failures while reducing a bound formula
#[derive(Debug, Clone, PartialEq)]
pub enum NumericError {
    DivisionByZero,
    Domain {
        function: &'static str,
        argument: f64,
    },
    NonFinite {
        operation: &'static str,
    },
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericError::DivisionByZero => write!(f, "division by zero"),
            NumericError::Domain { function, argument } => {
                write!(f, "{function} is undefined for argument {argument}")
            }
            NumericError::NonFinite { operation } => {
                write!(f, "{operation} produced a non-finite value")
            }
        }
    }
}

impl std::error::Error for NumericError {}

/// Failure of `bind` on a single compiled formula
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    Binding(BindingError),
    Numeric(NumericError),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Binding(e) => write!(f, "{e}"),
            EvalError::Numeric(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvalError::Binding(e) => Some(e),
            EvalError::Numeric(e) => Some(e),
        }
    }
}

impl From<BindingError> for EvalError {
    fn from(err: BindingError) -> Self {
        EvalError::Binding(err)
    }
}

impl From<NumericError> for EvalError {
    fn from(err: NumericError) -> Self {
        EvalError::Numeric(err)
    }
}

/// A formula failure located inside the impact tree
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEvaluationError {
    /// Node names from the root down to the failing node
    pub path: Vec<String>,
    pub target: FormulaTarget,
    pub source: EvalError,
}

impl fmt::Display for TreeEvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "evaluation failed at node {} ({}): {}",
            self.path.join("/"),
            self.target,
            self.source
        )
    }
}

impl std::error::Error for TreeEvaluationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Errors from a single `evaluate` call
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// The assignment could not be turned into variable bindings
    Binding(BindingError),
    /// A node formula failed; no partial result is produced
    Tree(TreeEvaluationError),
    /// A parameter value expression failed to compile
    Definition(DefinitionError),
    /// A parameter value expression failed to evaluate
    Parameter { name: String, source: EvalError },
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationError::Binding(e) => write!(f, "{e}"),
            EvaluationError::Tree(e) => write!(f, "{e}"),
            EvaluationError::Definition(e) => write!(f, "{e}"),
            EvaluationError::Parameter { name, source } => {
                write!(f, "value of parameter {name:?} could not be computed: {source}")
            }
        }
    }
}

impl std::error::Error for EvaluationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvaluationError::Binding(e) => Some(e),
            EvaluationError::Tree(e) => Some(e),
            EvaluationError::Definition(e) => Some(e),
            EvaluationError::Parameter { source, .. } => Some(source),
        }
    }
}

impl From<BindingError> for EvaluationError {
    fn from(err: BindingError) -> Self {
        EvaluationError::Binding(err)
    }
}

impl From<TreeEvaluationError> for EvaluationError {
    fn from(err: TreeEvaluationError) -> Self {
        EvaluationError::Tree(err)
    }
}

impl From<DefinitionError> for EvaluationError {
    fn from(err: DefinitionError) -> Self {
        EvaluationError::Definition(err)
    }
}

/// Errors related to sampling parameter distributions.
/// Raised before any evaluation of the batch takes place.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingError {
    InvalidWeight {
        parameter: String,
        reason: &'static str,
    },
    InvalidBounds {
        parameter: String,
        min: f64,
        max: f64,
    },
    OutOfBounds {
        parameter: String,
        value: f64,
        min: f64,
        max: f64,
    },
    InvalidDistributionParameters {
        parameter: String,
        distribution: &'static str,
        reason: &'static str,
    },
    /// Batch was cancelled by user request
    Cancelled,
    /// Configuration error
    Config(String),
}

impl fmt::Display for SamplingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingError::InvalidWeight { parameter, reason } => {
                write!(f, "invalid weights for parameter {parameter:?}: {reason}")
            }
            SamplingError::InvalidBounds {
                parameter,
                min,
                max,
            } => write!(
                f,
                "invalid bounds for parameter {parameter:?}: min {min} is greater than max {max}"
            ),
            SamplingError::OutOfBounds {
                parameter,
                value,
                min,
                max,
            } => write!(
                f,
                "sampled value {value} for parameter {parameter:?} is outside [{min}, {max}]"
            ),
            SamplingError::InvalidDistributionParameters {
                parameter,
                distribution,
                reason,
            } => write!(
                f,
                "invalid {distribution} distribution for parameter {parameter:?}: {reason}"
            ),
            SamplingError::Cancelled => write!(f, "batch cancelled"),
            SamplingError::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for SamplingError {}

/// Errors combining LCA score tables
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreError {
    /// A factor table does not cover exactly the scored indicators
    FactorMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },
    /// Two score sets hold a different number of values per indicator
    LengthMismatch {
        indicator: String,
        left: usize,
        right: usize,
    },
    /// A factor is not finite, or is zero where it divides
    InvalidFactor { indicator: String, value: f64 },
}

impl fmt::Display for ScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreError::FactorMismatch { missing, extra } => write!(
                f,
                "factor table does not match the model indicators (missing: [{}], extra: [{}])",
                missing.join(", "),
                extra.join(", ")
            ),
            ScoreError::LengthMismatch {
                indicator,
                left,
                right,
            } => write!(
                f,
                "indicator {indicator} has {left} values on one side and {right} on the other"
            ),
            ScoreError::InvalidFactor { indicator, value } => {
                write!(f, "invalid factor {value} for indicator {indicator}")
            }
        }
    }
}

impl std::error::Error for ScoreError {}
