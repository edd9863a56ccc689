//! Interpreter that reduces an L-System command string to [`CylinderSegment`]s.
//!
//! The entry point is [`Interpreter`]. Configure it with an
//! [`InterpreterConfig`], optionally adjust the symbol mapping via
//! [`Interpreter::set_op`] or [`Interpreter::with_commands`], then call
//! [`Interpreter::interpret`] with a derived string and a [`Turtle`].

use crate::blueprint::{CylinderSegment, Material};
use crate::cancel::CancellationToken;
use crate::error::{Error, Result, Stage};
use crate::grammar::SymbolPolicy;
use crate::turtle::{DEFAULT_MAX_STACK_DEPTH, Turtle, TurtleOp};
use glam::Vec3;
use indexmap::IndexMap;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

/// Radius used when neither a radius nor a proportion is configured.
pub const DEFAULT_RADIUS: f32 = 0.2;

/// Segments strictly longer than this are tagged [`Material::Branch`].
pub const DEFAULT_MATERIAL_THRESHOLD: f32 = 1.0;

/// Seed used for jitter when none is configured.
pub const DEFAULT_SEED: u64 = 0;

/// Configuration for interpretation.
#[derive(Clone, Debug)]
pub struct InterpreterConfig {
    /// Distance of one forward step.
    pub unit: f32,
    /// Turn angle in radians for Yaw/Pitch/Roll.
    pub angle: f32,
    /// Fixed radius for every segment. Mutually exclusive with `proportion`.
    pub radius: Option<f32>,
    /// Radius as a multiple of segment length. Mutually exclusive with `radius`.
    pub proportion: Option<f32>,
    /// Compared against the summed (unit-scaled) run length.
    pub material_threshold: f32,
    /// Standard deviation of the Gaussian perturbation added to every forward step.
    pub randomness: Option<f32>,
    pub seed: Option<u64>,
    /// What to do with symbols that have no registered op.
    pub symbol_policy: SymbolPolicy,
    /// Maximum push depth.
    pub max_stack_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            unit: 1.0,
            angle: 25.0f32.to_radians(),
            radius: None,
            proportion: None,
            material_threshold: DEFAULT_MATERIAL_THRESHOLD,
            randomness: None,
            seed: None,
            symbol_policy: SymbolPolicy::Passthrough,
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
        }
    }
}

/// Resolved radius policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RadiusMode {
    Fixed(f32),
    /// `radius = k * length`.
    Proportional(f32),
}

impl RadiusMode {
    pub fn resolve(radius: Option<f32>, proportion: Option<f32>) -> Result<Self> {
        let mode = match (radius, proportion) {
            (Some(radius), Some(proportion)) => {
                return Err(Error::ConflictingRadiusMode { radius, proportion });
            }
            (Some(r), None) => Self::Fixed(r),
            (None, Some(k)) => Self::Proportional(k),
            (None, None) => Self::Fixed(DEFAULT_RADIUS),
        };
        let (name, value) = match mode {
            Self::Fixed(r) => ("radius", r),
            Self::Proportional(k) => ("proportion", k),
        };
        if !(value.is_finite() && value > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "{name} must be positive, got {value}"
            )));
        }
        Ok(mode)
    }

    pub fn radius_for(self, length: f32) -> f32 {
        match self {
            Self::Fixed(r) => r,
            Self::Proportional(k) => k * length,
        }
    }
}

/// Symbol-to-operation map.
///
/// ASCII symbols live in a flat table indexed by code point; anything else
/// falls back to a map.
#[derive(Clone, Debug)]
pub struct CommandTable {
    ascii: [Option<TurtleOp>; 128],
    extended: IndexMap<char, TurtleOp>,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self {
            ascii: [None; 128],
            extended: IndexMap::new(),
        }
    }
}

impl CommandTable {
    /// An empty table: every symbol is unrecognized.
    pub fn new() -> Self {
        Self::default()
    }

    /// The conventional turtle alphabet.
    ///
    /// | Symbol | Op |
    /// |---|---|
    /// | `F`, `G` | draw forward |
    /// | `f` | move forward without drawing |
    /// | `+` / `-` | yaw by +angle / -angle |
    /// | `^` / `v` | pitch by +angle / -angle |
    /// | `>` / `<` | roll by +angle / -angle |
    /// | `\|` | turn around |
    /// | `[` / `]` | push / pop |
    pub fn standard() -> Self {
        let mappings = [
            ('F', TurtleOp::Forward),
            ('G', TurtleOp::Forward),
            ('f', TurtleOp::Move),
            ('+', TurtleOp::Yaw(1.0)),
            ('-', TurtleOp::Yaw(-1.0)),
            ('^', TurtleOp::Pitch(1.0)),
            ('v', TurtleOp::Pitch(-1.0)),
            ('>', TurtleOp::Roll(1.0)),
            ('<', TurtleOp::Roll(-1.0)),
            ('|', TurtleOp::TurnAround),
            ('[', TurtleOp::Push),
            (']', TurtleOp::Pop),
        ];

        let mut table = Self::new();
        for (symbol, op) in mappings {
            table.set_op(symbol, op);
        }
        table
    }

    pub fn set_op(&mut self, symbol: char, op: TurtleOp) {
        match self.ascii.get_mut(symbol as usize) {
            Some(slot) => *slot = Some(op),
            None => {
                self.extended.insert(symbol, op);
            }
        }
    }

    pub fn get(&self, symbol: char) -> Option<TurtleOp> {
        match self.ascii.get(symbol as usize) {
            Some(slot) => *slot,
            None => self.extended.get(&symbol).copied(),
        }
    }

    /// Every symbol with a registered op.
    pub fn symbols(&self) -> impl Iterator<Item = char> + '_ {
        let ascii = self
            .ascii
            .iter()
            .enumerate()
            .filter(|(_, op)| op.is_some())
            .filter_map(|(i, _)| char::from_u32(i as u32));
        ascii.chain(self.extended.keys().copied())
    }
}

/// Interprets a command string to build cylinder segments.
#[derive(Clone, Debug)]
pub struct Interpreter {
    commands: CommandTable,
    config: InterpreterConfig,
    radius_mode: RadiusMode,
}

/// A straight run of forward steps in progress.
struct Run {
    start: Vec3,
    length: f32,
}

impl Interpreter {
    /// Creates an interpreter with the standard command table.
    ///
    /// Fails with [`Error::ConflictingRadiusMode`] if both `radius` and
    /// `proportion` are set, and with [`Error::InvalidConfig`] for
    /// non-positive or non-finite unit, radius or proportion, or a negative
    /// randomness.
    pub fn new(config: InterpreterConfig) -> Result<Self> {
        let radius_mode = RadiusMode::resolve(config.radius, config.proportion)?;
        if !(config.unit.is_finite() && config.unit > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "unit must be positive, got {}",
                config.unit
            )));
        }
        if !config.angle.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "angle must be finite, got {}",
                config.angle
            )));
        }
        if let Some(sigma) = config.randomness
            && !(sigma.is_finite() && sigma >= 0.0)
        {
            return Err(Error::InvalidConfig(format!(
                "randomness must be non-negative, got {sigma}"
            )));
        }
        if !config.material_threshold.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "material_threshold must be finite, got {}",
                config.material_threshold
            )));
        }
        Ok(Self {
            commands: CommandTable::standard(),
            config,
            radius_mode,
        })
    }

    /// Replaces the entire symbol table (builder pattern).
    pub fn with_commands(mut self, commands: CommandTable) -> Self {
        self.commands = commands;
        self
    }

    /// Assigns a single [`TurtleOp`] to a symbol.
    pub fn set_op(&mut self, symbol: char, op: TurtleOp) {
        self.commands.set_op(symbol, op);
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn radius_mode(&self) -> RadiusMode {
        self.radius_mode
    }

    /// A fresh turtle in the default pose with the configured stack depth.
    pub fn turtle(&self) -> Turtle {
        Turtle::new(self.config.max_stack_depth)
    }

    /// Interprets `commands` with a fresh turtle.
    pub fn interpret_str(&self, commands: &str) -> Result<Vec<CylinderSegment>> {
        self.interpret(commands, &mut self.turtle())
    }

    /// Walks `commands` left to right, driving `turtle`, and returns the emitted segments.
    ///
    /// # Coalescing
    ///
    /// Consecutive forward tokens form a run. Each moves the turtle one step
    /// and adds the step to the run length, but only one segment is emitted
    /// per run, spanning the turtle's position at run start to its position
    /// at run end. A run ends at any other token (including one skipped as
    /// unrecognized) or at the end of input, and is dropped if its
    /// accumulated length is not positive.
    ///
    /// # Jitter
    ///
    /// With `randomness` set, every forward step is `unit + N(0, randomness)`.
    /// The generator is re-seeded on each call, so a fixed seed reproduces the
    /// same segments.
    pub fn interpret(&self, commands: &str, turtle: &mut Turtle) -> Result<Vec<CylinderSegment>> {
        self.interpret_cancellable(commands, turtle, &CancellationToken::new())
    }

    /// Like [`interpret`](Self::interpret), checking `cancel` at every run boundary.
    pub fn interpret_cancellable(
        &self,
        commands: &str,
        turtle: &mut Turtle,
        cancel: &CancellationToken,
    ) -> Result<Vec<CylinderSegment>> {
        let mut segments = Vec::new();
        let mut jitter = self.jitter()?;
        let mut run: Option<Run> = None;
        let mut skipped = 0usize;

        for (index, symbol) in commands.chars().enumerate() {
            let op = self.commands.get(symbol);
            if op.is_none() && self.config.symbol_policy == SymbolPolicy::Strict {
                return Err(Error::UnknownSymbol {
                    symbol,
                    index,
                    stage: Stage::Interpretation,
                });
            }

            if op == Some(TurtleOp::Forward) {
                let step = self.step(jitter.as_mut());
                let current = run.get_or_insert(Run {
                    start: turtle.position(),
                    length: 0.0,
                });
                turtle.move_forward(step);
                current.length += step;
                continue;
            }

            // Any non-forward token, recognized or not, ends the run.
            if let Some(done) = run.take() {
                self.emit(done, turtle, &mut segments);
                cancel.check(Stage::Interpretation)?;
            }

            let Some(op) = op else {
                skipped += 1;
                continue;
            };

            let step = if op == TurtleOp::Move {
                self.step(jitter.as_mut())
            } else {
                self.config.unit
            };
            op.apply(turtle, step, self.config.angle)
                .map_err(|e| e.at_token(index))?;
        }

        if let Some(done) = run.take() {
            self.emit(done, turtle, &mut segments);
        }

        if skipped > 0 {
            tracing::debug!(skipped, "skipped unrecognized symbols");
        }
        tracing::debug!(segments = segments.len(), "interpretation finished");
        Ok(segments)
    }

    fn jitter(&self) -> Result<Option<Jitter>> {
        self.config
            .randomness
            .filter(|sigma| *sigma > 0.0)
            .map(|sigma| Jitter::new(sigma, self.config.seed.unwrap_or(DEFAULT_SEED)))
            .transpose()
    }

    fn step(&self, jitter: Option<&mut Jitter>) -> f32 {
        match jitter {
            Some(j) => self.config.unit + j.sample(),
            None => self.config.unit,
        }
    }

    fn emit(&self, run: Run, turtle: &Turtle, segments: &mut Vec<CylinderSegment>) {
        if run.length <= 0.0 {
            return;
        }
        let segment = CylinderSegment {
            from: run.start,
            to: turtle.position(),
            radius: self.radius_mode.radius_for(run.length),
            material: Material::classify(run.length, self.config.material_threshold),
            length: run.length,
        };
        tracing::trace!(length = segment.length, "segment");
        segments.push(segment);
    }
}

/// Seeded Gaussian step perturbation.
struct Jitter {
    rng: StdRng,
    normal: Normal<f32>,
}

impl Jitter {
    fn new(sigma: f32, seed: u64) -> Result<Self> {
        let normal = Normal::new(0.0, sigma)
            .map_err(|e| Error::InvalidConfig(format!("randomness {sigma}: {e}")))?;
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            normal,
        })
    }

    fn sample(&mut self) -> f32 {
        self.normal.sample(&mut self.rng)
    }
}
