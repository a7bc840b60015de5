//! Numeric symbols and the per-system symbol registry.
//!
//! Symbols are append-only: once registered they live as long as the owning
//! [`System`](crate::System). Their current numeric values are kept in a
//! shared [`ValueTable`] so compiled evaluators can read them later without
//! borrowing the registry.

use crate::error::{EntityKind, Error, Result};
use parking_lot::{RwLock, RwLockReadGuard};
use rustc_hash::FxHashMap;
use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

static NEXT_SYSTEM_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`System`](crate::System); symbols remember which one owns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemId(u64);

impl SystemId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SYSTEM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Time,
    Parameter,
    Input,
    JointUnknown,
    Coordinate,
    Velocity,
    Acceleration,
    AuxCoordinate,
    AuxVelocity,
    AuxAcceleration,
}

impl SymbolKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Time => "time",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Input => "input",
            SymbolKind::JointUnknown => "joint_unknown",
            SymbolKind::Coordinate => "coordinate",
            SymbolKind::Velocity => "velocity",
            SymbolKind::Acceleration => "acceleration",
            SymbolKind::AuxCoordinate => "aux_coordinate",
            SymbolKind::AuxVelocity => "aux_velocity",
            SymbolKind::AuxAcceleration => "aux_acceleration",
        }
    }

    /// The (position, velocity, acceleration) kinds created together.
    pub(crate) const fn coordinate_triple(aux: bool) -> [SymbolKind; 3] {
        if aux {
            [
                SymbolKind::AuxCoordinate,
                SymbolKind::AuxVelocity,
                SymbolKind::AuxAcceleration,
            ]
        } else {
            [
                SymbolKind::Coordinate,
                SymbolKind::Velocity,
                SymbolKind::Acceleration,
            ]
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct SymbolData {
    owner: SystemId,
    index: usize,
    name: String,
    kind: SymbolKind,
}

/// Handle to a registered numeric symbol.
///
/// Cheap to clone. Two handles are equal when they refer to the same slot of
/// the same registry.
#[derive(Clone)]
pub struct Symbol(Arc<SymbolData>);

impl Symbol {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> SymbolKind {
        self.0.kind
    }

    pub fn owner(&self) -> SystemId {
        self.0.owner
    }

    /// Position of the symbol in its registry (and in the value table).
    pub fn index(&self) -> usize {
        self.0.index
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.0.owner == other.0.owner && self.0.index == other.0.index
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.owner.hash(state);
        self.0.index.hash(state);
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.0.owner, self.0.index).cmp(&(other.0.owner, other.0.index))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({}: {})", self.0.name, self.0.kind)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Current numeric values of every symbol of a registry, indexed by
/// [`Symbol::index`].
#[derive(Debug, Clone, Default)]
pub struct ValueTable(Arc<RwLock<Vec<f64>>>);

impl ValueTable {
    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.read().get(index).copied()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<f64>> {
        self.0.read()
    }

    pub fn snapshot(&self) -> Vec<f64> {
        self.0.read().clone()
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn set(&self, index: usize, value: f64) {
        if let Some(slot) = self.0.write().get_mut(index) {
            *slot = value;
        }
    }

    fn push(&self, value: f64) {
        self.0.write().push(value);
    }
}

/// Optional derivative names and initial values for a new coordinate.
///
/// Converts from `()`, `q0`, `(q0, dq0)`, `(q0, dq0, ddq0)`,
/// `(vel_name, acc_name)` and `(vel_name, acc_name, q0, dq0, ddq0)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateSpec {
    pub velocity: Option<String>,
    pub acceleration: Option<String>,
    pub values: [f64; 3],
}

impl From<()> for CoordinateSpec {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<f64> for CoordinateSpec {
    fn from(q0: f64) -> Self {
        Self {
            values: [q0, 0.0, 0.0],
            ..Self::default()
        }
    }
}

impl From<(f64, f64)> for CoordinateSpec {
    fn from((q0, dq0): (f64, f64)) -> Self {
        Self {
            values: [q0, dq0, 0.0],
            ..Self::default()
        }
    }
}

impl From<(f64, f64, f64)> for CoordinateSpec {
    fn from((q0, dq0, ddq0): (f64, f64, f64)) -> Self {
        Self {
            values: [q0, dq0, ddq0],
            ..Self::default()
        }
    }
}

impl From<(&str, &str)> for CoordinateSpec {
    fn from((velocity, acceleration): (&str, &str)) -> Self {
        Self {
            velocity: Some(velocity.to_string()),
            acceleration: Some(acceleration.to_string()),
            values: [0.0; 3],
        }
    }
}

impl From<(&str, &str, f64, f64, f64)> for CoordinateSpec {
    fn from((velocity, acceleration, q0, dq0, ddq0): (&str, &str, f64, f64, f64)) -> Self {
        Self {
            velocity: Some(velocity.to_string()),
            acceleration: Some(acceleration.to_string()),
            values: [q0, dq0, ddq0],
        }
    }
}

/// Returns true if `name` matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn check_identifier(name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(Error::InvalidName {
            name: name.to_string(),
        })
    }
}

#[derive(Debug)]
pub struct SymbolRegistry {
    owner: SystemId,
    symbols: Vec<Symbol>,
    by_name: FxHashMap<String, usize>,
    // time derivative of each symbol, by index
    derivatives: Vec<Option<usize>>,
    tex_names: Vec<Option<String>>,
    values: ValueTable,
    autogen_latex_names: bool,
}

impl SymbolRegistry {
    pub fn new(owner: SystemId) -> Self {
        Self {
            owner,
            symbols: Vec::new(),
            by_name: FxHashMap::default(),
            derivatives: Vec::new(),
            tex_names: Vec::new(),
            values: ValueTable::default(),
            autogen_latex_names: true,
        }
    }

    pub fn owner(&self) -> SystemId {
        self.owner
    }

    pub fn values(&self) -> &ValueTable {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn check_free(&self, name: &str) -> Result<()> {
        check_identifier(name)?;
        if self.by_name.contains_key(name) {
            return Err(Error::duplicate(EntityKind::Symbol, name));
        }
        Ok(())
    }

    pub(crate) fn push(&mut self, name: &str, kind: SymbolKind, value: f64) -> Symbol {
        let index = self.symbols.len();
        let symbol = Symbol(Arc::new(SymbolData {
            owner: self.owner,
            index,
            name: name.to_string(),
            kind,
        }));
        self.symbols.push(symbol.clone());
        self.by_name.insert(name.to_string(), index);
        self.derivatives.push(None);
        self.tex_names.push(None);
        self.values.push(value);
        tracing::trace!(name, kind = kind.as_str(), value, "registered symbol");
        symbol
    }

    pub fn new_symbol(&mut self, name: &str, kind: SymbolKind, value: f64) -> Result<Symbol> {
        self.check_free(name)?;
        Ok(self.push(name, kind, value))
    }

    /// Registers a (position, velocity, acceleration) triple atomically.
    pub fn new_coordinate(
        &mut self,
        name: &str,
        aux: bool,
        spec: CoordinateSpec,
    ) -> Result<[Symbol; 3]> {
        let velocity = spec.velocity.unwrap_or_else(|| format!("d{name}"));
        let acceleration = spec.acceleration.unwrap_or_else(|| format!("dd{name}"));
        let names = [name, velocity.as_str(), acceleration.as_str()];

        for (i, n) in names.iter().enumerate() {
            self.check_free(n)?;
            if names[..i].contains(n) {
                return Err(Error::duplicate(EntityKind::Symbol, *n));
            }
        }

        let kinds = SymbolKind::coordinate_triple(aux);
        let [q, dq, ddq] = [0, 1, 2].map(|i| self.push(names[i], kinds[i], spec.values[i]));
        self.derivatives[q.index()] = Some(dq.index());
        self.derivatives[dq.index()] = Some(ddq.index());
        Ok([q, dq, ddq])
    }

    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name).map(|&i| &self.symbols[i])
    }

    pub fn get(&self, name: &str) -> Result<Symbol> {
        self.find(name)
            .cloned()
            .ok_or_else(|| Error::lookup(EntityKind::Symbol, name))
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        symbol.owner() == self.owner && symbol.index() < self.symbols.len()
    }

    pub(crate) fn check_owned(&self, symbol: &Symbol) -> Result<()> {
        if self.contains(symbol) {
            Ok(())
        } else {
            Err(Error::ForeignSymbol {
                name: symbol.name().to_string(),
            })
        }
    }

    pub fn value(&self, symbol: &Symbol) -> Result<f64> {
        self.check_owned(symbol)?;
        self.values
            .get(symbol.index())
            .ok_or_else(|| Error::Evaluation(format!("symbol '{symbol}' has no value")))
    }

    pub fn set_value(&self, symbol: &Symbol, value: f64) -> Result<()> {
        self.check_owned(symbol)?;
        self.values.set(symbol.index(), value);
        Ok(())
    }

    /// The symbol declared as the time derivative of `symbol`, if any.
    pub fn derivative_of(&self, symbol: &Symbol) -> Option<&Symbol> {
        if !self.contains(symbol) {
            return None;
        }
        self.derivatives[symbol.index()].map(|i| &self.symbols[i])
    }

    /// Symbols in insertion order, optionally restricted to one kind.
    pub fn list(&self, kind: Option<SymbolKind>) -> impl Iterator<Item = &Symbol> + '_ {
        self.symbols
            .iter()
            .filter(move |s| kind.is_none_or(|k| s.kind() == k))
    }

    pub fn set_tex_name(&mut self, symbol: &Symbol, tex: impl Into<String>) -> Result<()> {
        self.check_owned(symbol)?;
        self.tex_names[symbol.index()] = Some(tex.into());
        Ok(())
    }

    pub fn tex_name(&self, symbol: &Symbol) -> Result<String> {
        self.check_owned(symbol)?;
        if let Some(tex) = &self.tex_names[symbol.index()] {
            return Ok(tex.clone());
        }
        if self.autogen_latex_names {
            Ok(latex_name(symbol.name(), symbol.kind()))
        } else {
            Ok(symbol.name().to_string())
        }
    }

    pub fn autogen_latex_names(&self) -> bool {
        self.autogen_latex_names
    }

    pub fn set_autogen_latex_names(&mut self, enabled: bool) {
        self.autogen_latex_names = enabled;
    }
}

const GREEK: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
    "lambda", "mu", "nu", "xi", "pi", "rho", "sigma", "tau", "upsilon", "phi", "chi", "psi",
    "omega", "Gamma", "Delta", "Theta", "Lambda", "Xi", "Pi", "Sigma", "Upsilon", "Phi", "Psi",
    "Omega",
];

/// LaTeX rendering of a symbol name: greek stems become commands, trailing
/// digits become a subscript, and derivative kinds named `d<q>`/`dd<q>` get
/// a dot accent.
pub fn latex_name(name: &str, kind: SymbolKind) -> String {
    let (accent, rest) = match kind {
        SymbolKind::Velocity | SymbolKind::AuxVelocity if name.len() > 1 => {
            match name.strip_prefix('d') {
                Some(rest) => (Some("dot"), rest),
                None => (None, name),
            }
        }
        SymbolKind::Acceleration | SymbolKind::AuxAcceleration if name.len() > 2 => {
            match name.strip_prefix("dd") {
                Some(rest) => (Some("ddot"), rest),
                None => (None, name),
            }
        }
        _ => (None, name),
    };

    let split = rest.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (stem, digits) = rest.split_at(split);
    let stem = if GREEK.contains(&stem) {
        format!("\\{stem}")
    } else {
        stem.to_string()
    };
    let stem = match accent {
        Some(accent) => format!("\\{accent}{{{stem}}}"),
        None => stem,
    };
    if digits.is_empty() || stem.is_empty() {
        format!("{stem}{digits}")
    } else {
        format!("{stem}_{{{digits}}}")
    }
}
