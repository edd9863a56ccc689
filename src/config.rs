//! The JSON configuration record for one tree.
//!
//! ```json
//! {
//!     "unit": 0.5,
//!     "angle": 0.4363,
//!     "axiom": "F",
//!     "iterations": 4,
//!     "rules": { "F": "F[+F]F[-F]F" },
//!     "radius": 0.1
//! }
//! ```

use crate::blueprint::GroupingPolicy;
use crate::error::{Error, Result};
use crate::grammar::{Grammar, SymbolPolicy};
use crate::interpreter::{
    DEFAULT_MATERIAL_THRESHOLD, Interpreter, InterpreterConfig, RadiusMode,
};
use crate::turtle::DEFAULT_MAX_STACK_DEPTH;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LSystemConfig {
    /// Forward step distance.
    pub unit: f32,
    /// Turn angle in radians.
    pub angle: f32,
    pub axiom: String,
    pub iterations: u32,
    /// Production rules. Every key must be exactly one character.
    pub rules: IndexMap<String, String>,

    #[serde(default)]
    pub radius: Option<f32>,
    #[serde(default)]
    pub proportion: Option<f32>,
    /// Base material name, passed through to the scene sink.
    #[serde(default)]
    pub material: Option<String>,
    /// Standard deviation of the per-step Gaussian jitter.
    #[serde(default)]
    pub randomness: Option<f32>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub material_threshold: Option<f32>,
    /// Reject unknown symbols in both derivation and interpretation.
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub grouping: GroupingPolicy,
    /// Upper bound on the symbol count of any generation.
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub max_stack_depth: Option<usize>,
}

impl LSystemConfig {
    /// A minimal config: no rules, unit step, fixed default radius.
    pub fn new(axiom: impl Into<String>, iterations: u32) -> Self {
        Self {
            unit: 1.0,
            angle: 25.0f32.to_radians(),
            axiom: axiom.into(),
            iterations,
            rules: IndexMap::new(),
            radius: None,
            proportion: None,
            material: None,
            randomness: None,
            seed: None,
            material_threshold: None,
            strict: false,
            grouping: GroupingPolicy::Exact,
            max_length: None,
            max_stack_depth: None,
        }
    }

    pub fn with_rule(mut self, symbol: char, replacement: impl Into<String>) -> Self {
        self.rules.insert(symbol.to_string(), replacement.into());
        self
    }

    /// Parses and validates a JSON config. Malformed input is [`Error::InvalidConfig`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let config: Self =
            serde_json::from_reader(reader).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn symbol_policy(&self) -> SymbolPolicy {
        if self.strict {
            SymbolPolicy::Strict
        } else {
            SymbolPolicy::Passthrough
        }
    }

    /// Checks every field, including radius/proportion exclusivity.
    pub fn validate(&self) -> Result<()> {
        self.parsed_rules()?;
        RadiusMode::resolve(self.radius, self.proportion)?;
        self.grouping.validate()?;
        if self.max_stack_depth == Some(0) {
            return Err(Error::InvalidConfig("max_stack_depth must be at least 1".into()));
        }
        // Remaining numeric checks live in the interpreter constructor.
        Interpreter::new(self.interpreter_config()).map(|_| ())
    }

    fn parsed_rules(&self) -> Result<Vec<(char, &str)>> {
        self.rules
            .iter()
            .map(|(key, replacement)| {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(symbol), None) => Ok((symbol, replacement.as_str())),
                    _ => Err(Error::InvalidConfig(format!(
                        "rule key '{key}' must be a single symbol"
                    ))),
                }
            })
            .collect()
    }

    /// Builds the grammar. Terminal declarations for strict mode are added by the pipeline.
    pub fn grammar(&self) -> Result<Grammar> {
        Ok(Grammar::new(self.symbol_policy())
            .with_rules(self.parsed_rules()?)
            .with_max_len(self.max_length))
    }

    pub fn interpreter_config(&self) -> InterpreterConfig {
        InterpreterConfig {
            unit: self.unit,
            angle: self.angle,
            radius: self.radius,
            proportion: self.proportion,
            material_threshold: self.material_threshold.unwrap_or(DEFAULT_MATERIAL_THRESHOLD),
            randomness: self.randomness,
            seed: self.seed,
            symbol_policy: self.symbol_policy(),
            max_stack_depth: self.max_stack_depth.unwrap_or(DEFAULT_MAX_STACK_DEPTH),
        }
    }

    pub fn interpreter(&self) -> Result<Interpreter> {
        Interpreter::new(self.interpreter_config())
    }

    /// True when jitter is active.
    pub fn has_jitter(&self) -> bool {
        self.randomness.is_some_and(|sigma| sigma > 0.0)
    }
}
