mod assignment;
mod ids;
mod methods;
mod parameters;
mod registry;
mod results;
mod sampler;
mod scores;
mod tree;

pub use assignment::{
    Assignment, OverrideValue, ParamValue, ParameterOverrides, ParameterPoint, PointValue, Value,
};
pub(crate) use assignment::resolve_point;
pub use ids::{IndicatorId, NodeId, ParamId, VarId};
pub use methods::{EfVersion, ImpactMethod, display_name};
pub use parameters::{EnumParameter, FloatDistribution, FloatParameter, Parameter, ParameterKind};
pub use registry::{ParamSlots, ParameterRegistry, VarSlot, VariableTable, indicator_name};
pub use results::{BatchResult, EvaluationResult, NodeReport, NodeResult, SampleFailure};
pub use sampler::{Sampler, Truncation};
pub use scores::LcaScores;
pub use tree::{ImpactNode, ImpactTree};
