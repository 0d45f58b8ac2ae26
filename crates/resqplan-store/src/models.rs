use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Magnitude at and above which a stored bound is read back as infinite.
///
/// JSON cannot carry infinities, so infinite bounds are written with the
/// solver's own infinity convention.
pub const SOLVER_INFINITY: f64 = 1e100;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VarKind {
    #[default]
    Continuous,
    Integer,
    Binary,
}

impl VarKind {
    /// Single-letter solver code used on the wire.
    pub fn code(self) -> &'static str {
        match self {
            Self::Continuous => "C",
            Self::Integer => "I",
            Self::Binary => "B",
        }
    }
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Continuous => "continuous",
            Self::Integer => "integer",
            Self::Binary => "binary",
        };
        f.write_str(s)
    }
}

impl FromStr for VarKind {
    type Err = VarKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "C" | "c" | "continuous" => Ok(Self::Continuous),
            "I" | "i" | "integer" => Ok(Self::Integer),
            "B" | "b" | "binary" => Ok(Self::Binary),
            other => Err(VarKindParseError(other.to_owned())),
        }
    }
}

impl Serialize for VarKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for VarKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Error returned when parsing an invalid [`VarKind`] string.
#[derive(Debug, Clone)]
pub struct VarKindParseError(pub String);

impl fmt::Display for VarKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid variable type: {:?}", self.0)
    }
}

impl std::error::Error for VarKindParseError {}

// ---------------------------------------------------------------------------

/// Relation between a constraint's left-hand side and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintSense {
    LessEqual,
    Equal,
    GreaterEqual,
}

impl ConstraintSense {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::LessEqual => "<=",
            Self::Equal => "=",
            Self::GreaterEqual => ">=",
        }
    }
}

impl fmt::Display for ConstraintSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for ConstraintSense {
    type Err = ConstraintSenseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" | "<=" | "≤" => Ok(Self::LessEqual),
            "=" | "==" => Ok(Self::Equal),
            ">" | ">=" | "≥" => Ok(Self::GreaterEqual),
            other => Err(ConstraintSenseParseError(other.to_owned())),
        }
    }
}

impl Serialize for ConstraintSense {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for ConstraintSense {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Error returned when parsing an invalid [`ConstraintSense`] string.
#[derive(Debug, Clone)]
pub struct ConstraintSenseParseError(pub String);

impl fmt::Display for ConstraintSenseParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid constraint sense: {:?}", self.0)
    }
}

impl std::error::Error for ConstraintSenseParseError {}

// ---------------------------------------------------------------------------

/// Optimization direction of the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ObjectiveSense {
    #[default]
    Minimize,
    Maximize,
}

impl fmt::Display for ObjectiveSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Minimize => "minimize",
            Self::Maximize => "maximize",
        };
        f.write_str(s)
    }
}

impl FromStr for ObjectiveSense {
    type Err = ObjectiveSenseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "minimize" | "min" | "1" => Ok(Self::Minimize),
            "maximize" | "max" | "-1" => Ok(Self::Maximize),
            other => Err(ObjectiveSenseParseError(other.to_owned())),
        }
    }
}

impl Serialize for ObjectiveSense {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectiveSense {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // The solver itself encodes the sense as 1 (minimize) / -1 (maximize).
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Code(1) => Ok(Self::Minimize),
            Raw::Code(-1) => Ok(Self::Maximize),
            Raw::Code(other) => Err(serde::de::Error::custom(format!(
                "invalid objective sense code: {other}"
            ))),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Error returned when parsing an invalid [`ObjectiveSense`] string.
#[derive(Debug, Clone)]
pub struct ObjectiveSenseParseError(pub String);

impl fmt::Display for ObjectiveSenseParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid objective sense: {:?}", self.0)
    }
}

impl std::error::Error for ObjectiveSenseParseError {}

// ---------------------------------------------------------------------------
// Bound encoding
// ---------------------------------------------------------------------------

fn serialize_bound<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_infinite() {
        serializer.serialize_f64(SOLVER_INFINITY.copysign(*value))
    } else {
        serializer.serialize_f64(*value)
    }
}

fn read_bound(raw: Option<f64>, missing: f64) -> f64 {
    match raw {
        None => missing,
        Some(v) if v.abs() >= SOLVER_INFINITY => f64::INFINITY.copysign(v),
        Some(v) => v,
    }
}

fn deserialize_lower_bound<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(read_bound(
        Option::<f64>::deserialize(deserializer)?,
        f64::NEG_INFINITY,
    ))
}

fn deserialize_upper_bound<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(read_bound(
        Option::<f64>::deserialize(deserializer)?,
        f64::INFINITY,
    ))
}

fn default_lower_bound() -> f64 {
    0.0
}

fn default_upper_bound() -> f64 {
    f64::INFINITY
}

// ---------------------------------------------------------------------------
// ModelState wire format
// ---------------------------------------------------------------------------

/// One variable of a stored model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarEntry {
    pub name: String,
    #[serde(
        default = "default_lower_bound",
        serialize_with = "serialize_bound",
        deserialize_with = "deserialize_lower_bound"
    )]
    pub lb: f64,
    #[serde(
        default = "default_upper_bound",
        serialize_with = "serialize_bound",
        deserialize_with = "deserialize_upper_bound"
    )]
    pub ub: f64,
    #[serde(rename = "type", default)]
    pub kind: VarKind,
}

/// One constraint of a stored model, with its left-hand side in
/// sum-of-terms text form (`2*x + -1*y`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsEntry {
    pub expr: String,
    pub sense: ConstraintSense,
    pub rhs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Stored objective.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectiveEntry {
    #[serde(default, alias = "objective")]
    pub expr: String,
    #[serde(default)]
    pub sense: ObjectiveSense,
}

/// Flat, storage-safe snapshot of a linear optimization model.
///
/// `vars` keeps creation order; `cons` and `objective` reference variables by
/// name only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelState {
    #[serde(default)]
    pub vars: Vec<VarEntry>,
    #[serde(default)]
    pub cons: Vec<ConsEntry>,
    #[serde(default)]
    pub objective: ObjectiveEntry,
}

impl ModelState {
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.cons.is_empty() && self.objective.expr.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

fn default_active() -> bool {
    true
}

/// A natural-language constraint accepted into a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintRecord {
    pub text: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl ConstraintRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            active: true,
        }
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// A persisted project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    /// Free-text scheduling context the project was created from.
    #[serde(default)]
    pub context: String,
    /// Constraints the backend detected in the context text.
    #[serde(default)]
    pub detected_constraints: Vec<String>,
    #[serde(default)]
    pub manual_constraints: Vec<ConstraintRecord>,
    /// Context variables as returned by the translate endpoint.
    #[serde(default = "empty_object")]
    pub variables: serde_json::Value,
    #[serde(default)]
    pub gurobi_state: ModelState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl ProjectRecord {
    /// Build a fresh record for a newly created project.
    pub fn new(id: impl Into<String>, project: NewProject) -> Self {
        Self {
            id: id.into(),
            name: project.name,
            context: project.context,
            detected_constraints: Vec::new(),
            manual_constraints: Vec::new(),
            variables: empty_object(),
            gurobi_state: ModelState::default(),
            saved_at: None,
        }
    }

    /// Texts of the manual constraints currently switched on, in insertion
    /// order.
    pub fn active_constraint_texts(&self) -> Vec<String> {
        self.manual_constraints
            .iter()
            .filter(|c| c.active)
            .map(|c| c.text.clone())
            .collect()
    }
}

/// Input for creating a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub context: String,
}

/// Listing view of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub constraint_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl From<&ProjectRecord> for ProjectSummary {
    fn from(p: &ProjectRecord) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            constraint_count: p.manual_constraints.len(),
            saved_at: p.saved_at,
        }
    }
}

/// Order summaries most recently saved first, never-saved last, then by name.
pub fn sort_summaries(summaries: &mut [ProjectSummary]) {
    summaries.sort_by(|a, b| {
        b.saved_at
            .cmp(&a.saved_at)
            .then_with(|| a.name.cmp(&b.name))
    });
}
