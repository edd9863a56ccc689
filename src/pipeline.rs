//! Derive → interpret → group, for one config or a batch.

use crate::blueprint::{CylinderSegment, GroupingPolicy, SegmentGroups};
use crate::cancel::CancellationToken;
use crate::config::LSystemConfig;
use crate::error::Result;
use crate::sink::{Scene, SceneSink};
use crate::turtle::TurtleOp;
use rayon::prelude::*;

/// The result of one run.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeModel {
    /// Symbol count of the derived L-String.
    pub symbol_count: usize,
    /// Segments in emission order.
    pub segments: Vec<CylinderSegment>,
    pub grouping: GroupingPolicy,
    /// Base material name from the config, if any.
    pub material: Option<String>,
}

impl TreeModel {
    /// Groups the segments under the model's grouping policy.
    pub fn groups(&self) -> SegmentGroups {
        SegmentGroups::from_segments(&self.segments, self.grouping)
    }
}

pub fn generate(config: &LSystemConfig) -> Result<TreeModel> {
    generate_cancellable(config, &CancellationToken::new())
}

/// Runs one config, checking `cancel` between derivation steps and interpreter runs.
pub fn generate_cancellable(
    config: &LSystemConfig,
    cancel: &CancellationToken,
) -> Result<TreeModel> {
    config.validate()?;
    let mut interpreter = config.interpreter()?;
    let grammar = config.grammar()?;
    // Grammar variables without a turtle meaning (the `X` of most plants) are
    // recognized no-ops, not unknown symbols.
    for (symbol, _) in grammar.rules() {
        if interpreter.commands().get(symbol).is_none() {
            interpreter.set_op(symbol, TurtleOp::Ignore);
        }
    }
    // Every symbol with a turtle meaning is a legal terminal of the grammar.
    let grammar = grammar.with_terminals(interpreter.commands().symbols());

    if config.has_jitter() && config.grouping == GroupingPolicy::Exact {
        tracing::warn!(
            randomness = config.randomness,
            "jitter with exact length grouping: near-equal lengths will not share a group"
        );
    }

    tracing::info!(
        iterations = config.iterations,
        axiom = %config.axiom,
        "deriving"
    );
    let lstring = grammar.derive_cancellable(&config.axiom, config.iterations, cancel)?;
    let symbol_count = lstring.chars().count();

    let mut turtle = interpreter.turtle();
    let segments = interpreter.interpret_cancellable(&lstring, &mut turtle, cancel)?;

    let model = TreeModel {
        symbol_count,
        segments,
        grouping: config.grouping,
        material: config.material.clone(),
    };
    tracing::info!(
        symbols = symbol_count,
        segments = model.segments.len(),
        lengths = model.groups().len(),
        "tree generated"
    );
    Ok(model)
}

/// Runs independent configs in parallel. Results keep the input order.
pub fn generate_batch(configs: &[LSystemConfig]) -> Vec<Result<TreeModel>> {
    configs.par_iter().map(generate).collect()
}

/// Hands `model` to `sink`, grouped under the model's policy.
pub fn emit(model: &TreeModel, sink: &mut dyn SceneSink) -> Result<()> {
    let groups = model.groups();
    sink.consume(&Scene {
        segments: &model.segments,
        groups: &groups,
        material: model.material.as_deref(),
    })
}
