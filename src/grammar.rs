//! Context-free, parallel string rewriting (L-System derivation).
//!
//! Every symbol of a generation is rewritten simultaneously: a symbol's
//! replacement never depends on its neighbours, and the output of step `i`
//! is the complete input of step `i + 1`.

use crate::cancel::CancellationToken;
use crate::error::{Error, Result, Stage};
use indexmap::{IndexMap, IndexSet};

/// How symbols without a production rule (or turtle meaning) are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SymbolPolicy {
    /// Unmapped symbols are terminals: they pass through unchanged.
    #[default]
    Passthrough,
    /// Unmapped, undeclared symbols fail with [`Error::UnknownSymbol`].
    Strict,
}

/// A set of production rules plus the policy for everything else.
#[derive(Clone, Debug, Default)]
pub struct Grammar {
    rules: IndexMap<char, String>,
    terminals: IndexSet<char>,
    policy: SymbolPolicy,
    max_len: Option<usize>,
}

impl Grammar {
    /// Creates a grammar with no rules.
    pub fn new(policy: SymbolPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Adds (or replaces) the production for `symbol` (builder pattern).
    pub fn with_rule(mut self, symbol: char, replacement: impl Into<String>) -> Self {
        self.set_rule(symbol, replacement);
        self
    }

    pub fn with_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = (char, S)>,
        S: Into<String>,
    {
        for (symbol, replacement) in rules {
            self.set_rule(symbol, replacement);
        }
        self
    }

    /// Declares symbols that are legal without a rule under [`SymbolPolicy::Strict`].
    ///
    /// Typically the command tokens of the interpreter (`+`, `[`, ...).
    pub fn with_terminals(mut self, symbols: impl IntoIterator<Item = char>) -> Self {
        self.terminals.extend(symbols);
        self
    }

    /// Caps the symbol count of any generation. Exceeding it fails the derivation.
    pub fn with_max_len(mut self, limit: Option<usize>) -> Self {
        self.max_len = limit;
        self
    }

    pub fn set_rule(&mut self, symbol: char, replacement: impl Into<String>) {
        self.rules.insert(symbol, replacement.into());
    }

    pub fn rule(&self, symbol: char) -> Option<&str> {
        self.rules.get(&symbol).map(String::as_str)
    }

    pub fn rules(&self) -> impl Iterator<Item = (char, &str)> {
        self.rules.iter().map(|(c, r)| (*c, r.as_str()))
    }

    pub fn policy(&self) -> SymbolPolicy {
        self.policy
    }

    /// Returns true if `symbol` has a rule or was declared terminal.
    pub fn is_known(&self, symbol: char) -> bool {
        self.rules.contains_key(&symbol) || self.terminals.contains(&symbol)
    }

    fn check(&self, symbol: char, index: usize, step: u32) -> Result<()> {
        if self.policy == SymbolPolicy::Strict && !self.is_known(symbol) {
            return Err(Error::UnknownSymbol {
                symbol,
                index,
                stage: Stage::Derivation { step },
            });
        }
        Ok(())
    }

    /// Applies one derivation step to `input`.
    ///
    /// `step` is only used to label errors. The output is sized exactly in a
    /// first pass, which also enforces the length cap before anything is
    /// allocated, so no reallocation happens while writing.
    pub fn rewrite(&self, input: &str, step: u32) -> Result<String> {
        self.rewrite_counted(input, step).map(|(out, _)| out)
    }

    /// Like [`rewrite`](Self::rewrite), also returning the output symbol count.
    fn rewrite_counted(&self, input: &str, step: u32) -> Result<(String, usize)> {
        let mut capacity = 0;
        let mut symbols = 0;
        for (index, symbol) in input.chars().enumerate() {
            self.check(symbol, index, step)?;
            match self.rules.get(&symbol) {
                Some(replacement) => {
                    capacity += replacement.len();
                    symbols += replacement.chars().count();
                }
                None => {
                    capacity += symbol.len_utf8();
                    symbols += 1;
                }
            }
        }
        self.check_len(step, symbols)?;

        let mut out = String::with_capacity(capacity);
        for symbol in input.chars() {
            match self.rules.get(&symbol) {
                Some(replacement) => out.push_str(replacement),
                None => out.push(symbol),
            }
        }
        Ok((out, symbols))
    }

    /// Symbol count of the generation following `input`, without rewriting it.
    pub fn next_len(&self, input: &str) -> usize {
        input
            .chars()
            .map(|c| self.rules.get(&c).map_or(1, |r| r.chars().count()))
            .sum()
    }

    /// Derives the L-String after `steps` rewriting steps.
    ///
    /// With `steps == 0` the axiom itself is returned (still validated under
    /// [`SymbolPolicy::Strict`]).
    pub fn derive(&self, axiom: &str, steps: u32) -> Result<String> {
        self.derive_cancellable(axiom, steps, &CancellationToken::new())
    }

    /// Like [`derive`](Self::derive), checking `cancel` before every step.
    pub fn derive_cancellable(
        &self,
        axiom: &str,
        steps: u32,
        cancel: &CancellationToken,
    ) -> Result<String> {
        for (index, symbol) in axiom.chars().enumerate() {
            self.check(symbol, index, 0)?;
        }

        let mut current = axiom.to_owned();
        for step in 1..=steps {
            cancel.check(Stage::Derivation { step })?;
            let (next, len) = self.rewrite_counted(&current, step)?;
            current = next;
            tracing::debug!(step, symbols = len, "derivation step");
        }
        Ok(current)
    }

    fn check_len(&self, step: u32, len: usize) -> Result<()> {
        match self.max_len {
            Some(limit) if len > limit => Err(Error::LengthLimitExceeded { step, len, limit }),
            _ => Ok(()),
        }
    }

    /// Unbounded iterator over successive generations of `axiom`.
    ///
    /// The first item is generation 1. After an error the iterator is fused.
    pub fn generations<'a>(&'a self, axiom: &str) -> Derivation<'a> {
        Derivation {
            grammar: self,
            current: Some(axiom.to_owned()),
            step: 0,
        }
    }
}

/// Iterator returned by [`Grammar::generations`].
pub struct Derivation<'a> {
    grammar: &'a Grammar,
    current: Option<String>,
    step: u32,
}

impl Iterator for Derivation<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;
        self.step += 1;
        let next = self.grammar.rewrite(&current, self.step);
        if let Ok(next) = &next {
            self.current = Some(next.clone());
        }
        Some(next)
    }
}
