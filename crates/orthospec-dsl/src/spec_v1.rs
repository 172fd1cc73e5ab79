//! Orthography specification documents: `spec_v1`
//!
//! A `spec_v1` document describes a bidirectional surface-string ↔
//! feature-vector transducer as a set of named pattern variables, an ordered
//! feature-key list, and the entry points used for parsing and generation.
//!
//! The document format is JSON:
//!
//! ```text
//! {
//!   "id": "ghc",
//!   "fst": {
//!     "Initial": { "union": ["p", "t", "ts"] },
//!     "Tone":    { "union": ["1:平", "2:上"] },
//!     "Syllable": { "concat": ["Initial", "*", "Tone"] }
//!   },
//!   "keys": ["声母", "声调"],
//!   "parse": "Syllable",
//!   "generate": "Syllable",
//!   "substitutions": [["1", "¹"], ["2", "²"]]
//! }
//! ```
//!
//! Pattern atoms are plain strings and are classified in this order:
//! - a declared variable name is a reference,
//! - the separator (`*` unless the document overrides it) is a separator marker,
//! - a string containing `:` is a paired literal `surface:features`,
//! - anything else is a plain literal (the empty string included).
//!
//! `{"ref": "Name"}` is an explicit reference; it is the only way to write a
//! reference to an undeclared name, which graph construction then rejects.
//!
//! Substitution tables are carried verbatim. They belong to the text
//! pre/post-processing stage and take no part in structural analysis.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub type Name = String;

/// Separator used when a document does not name one.
pub const DEFAULT_SEPARATOR: char = '*';

// ============================================================================
// AST
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrthographySpecV1 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Name>,
    pub separator: char,
    pub variables: Vec<PatternVariableV1>,
    pub keys: Vec<Name>,
    pub entry_points: Vec<EntryPointV1>,
    #[serde(default)]
    pub substitutions: Vec<SubstitutionV1>,
    /// Parse-direction substitutions (regex replacements), when they differ
    /// from the generation table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitutions_parse: Option<Vec<SubstitutionV1>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatternVariableV1 {
    pub name: Name,
    pub body: PatternExprV1,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntryRole {
    Parse,
    Generate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryPointV1 {
    pub role: EntryRole,
    pub variable: Name,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubstitutionV1 {
    pub easy: String,
    pub hard: String,
}

/// A fixed surface form.
///
/// Paired literals carry a different string on each side of the transducer:
/// the surface side is matched against orthographic text, the feature side is
/// what ends up in the linearized feature string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LiteralV1 {
    Plain { text: String },
    Paired { surface: String, features: String },
}

/// Pattern expression language.
///
/// Every analysis pass matches on all variants; there is no catch-all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatternExprV1 {
    Literal { text: LiteralV1 },
    /// Boundary between two positional feature values.
    Separator,
    /// Opaque pointer to another variable, resolved by name.
    Reference { name: Name },
    Concat { items: Vec<PatternExprV1> },
    Union { branches: Vec<PatternExprV1> },
}

impl LiteralV1 {
    pub fn surface(&self) -> &str {
        match self {
            LiteralV1::Plain { text } => text,
            LiteralV1::Paired { surface, .. } => surface,
        }
    }

    /// The side of the literal written into the feature string.
    pub fn features(&self) -> &str {
        match self {
            LiteralV1::Plain { text } => text,
            LiteralV1::Paired { features, .. } => features,
        }
    }
}

impl PatternExprV1 {
    pub fn literal(text: impl Into<String>) -> Self {
        PatternExprV1::Literal {
            text: LiteralV1::Plain { text: text.into() },
        }
    }

    pub fn paired(surface: impl Into<String>, features: impl Into<String>) -> Self {
        PatternExprV1::Literal {
            text: LiteralV1::Paired {
                surface: surface.into(),
                features: features.into(),
            },
        }
    }

    pub fn reference(name: impl Into<Name>) -> Self {
        PatternExprV1::Reference { name: name.into() }
    }

    pub fn concat(items: Vec<PatternExprV1>) -> Self {
        PatternExprV1::Concat { items }
    }

    pub fn union(branches: Vec<PatternExprV1>) -> Self {
        PatternExprV1::Union { branches }
    }

    /// Render with `separator` as the marker; `Display` uses the default `*`.
    pub fn display_with(&self, separator: char) -> ExprDisplay<'_> {
        ExprDisplay {
            expr: self,
            separator,
        }
    }

    /// Names referenced from this expression, in order of appearance, without
    /// following any reference. Duplicates are kept.
    pub fn references(&self) -> Vec<&str> {
        fn walk<'a>(expr: &'a PatternExprV1, out: &mut Vec<&'a str>) {
            match expr {
                PatternExprV1::Literal { .. } | PatternExprV1::Separator => {}
                PatternExprV1::Reference { name } => out.push(name),
                PatternExprV1::Concat { items } => items.iter().for_each(|e| walk(e, out)),
                PatternExprV1::Union { branches } => branches.iter().for_each(|e| walk(e, out)),
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }
}

impl OrthographySpecV1 {
    /// An empty specification over `keys`, using the default separator.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Name>,
    {
        Self {
            id: None,
            separator: DEFAULT_SEPARATOR,
            variables: vec![],
            keys: keys.into_iter().map(Into::into).collect(),
            entry_points: vec![],
            substitutions: vec![],
            substitutions_parse: None,
        }
    }

    pub fn with_variable(mut self, name: impl Into<Name>, body: PatternExprV1) -> Self {
        self.variables.push(PatternVariableV1 {
            name: name.into(),
            body,
        });
        self
    }

    pub fn with_entry(mut self, role: EntryRole, variable: impl Into<Name>) -> Self {
        self.entry_points.push(EntryPointV1 {
            role,
            variable: variable.into(),
        });
        self
    }

    pub fn entry(&self, role: EntryRole) -> Option<&EntryPointV1> {
        self.entry_points.iter().find(|e| e.role == role)
    }
}

impl fmt::Display for EntryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryRole::Parse => write!(f, "parse"),
            EntryRole::Generate => write!(f, "generate"),
        }
    }
}

impl fmt::Display for LiteralV1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralV1::Plain { text } => write!(f, "{text:?}"),
            LiteralV1::Paired { surface, features } => write!(f, "{surface:?}:{features:?}"),
        }
    }
}

impl fmt::Display for PatternExprV1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_with(DEFAULT_SEPARATOR))
    }
}

/// An expression rendered with a document's separator marker.
pub struct ExprDisplay<'a> {
    expr: &'a PatternExprV1,
    separator: char,
}

impl fmt::Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = self.separator;
        match self.expr {
            PatternExprV1::Literal { text } => write!(f, "{text}"),
            PatternExprV1::Separator => write!(f, "{sep}"),
            PatternExprV1::Reference { name } => write!(f, "{name}"),
            PatternExprV1::Concat { items } => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item.display_with(sep))?;
                }
                write!(f, ")")
            }
            PatternExprV1::Union { branches } => {
                write!(f, "{{")?;
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", branch.display_with(sep))?;
                }
                write!(f, "}}")
            }
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Error)]
pub enum SpecV1ParseError {
    #[error("invalid spec document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid pattern `{variable}`: {message}")]
    Expr { variable: Name, message: String },
    #[error("separator must be a single character, got `{value}`")]
    Separator { value: String },
    #[error("spec declares no entry points (expected `parse` and/or `generate`)")]
    NoEntryPoints,
}

#[derive(Debug, Deserialize)]
struct RawSpecDocumentV1 {
    #[serde(default)]
    id: Option<Name>,
    #[serde(default)]
    separator: Option<String>,
    #[serde(alias = "patterns")]
    fst: Map<String, Value>,
    keys: Vec<Name>,
    #[serde(default)]
    parse: Option<Name>,
    #[serde(default)]
    generate: Option<Name>,
    #[serde(default)]
    substitutions: Vec<(String, String)>,
    #[serde(default)]
    substitutions_parse: Option<Vec<(String, String)>>,
}

pub fn parse_spec_v1(text: &str) -> Result<OrthographySpecV1, SpecV1ParseError> {
    let raw: RawSpecDocumentV1 = serde_json::from_str(text)?;

    let separator = match raw.separator.as_deref() {
        None => DEFAULT_SEPARATOR,
        Some(value) => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(SpecV1ParseError::Separator {
                        value: value.to_string(),
                    })
                }
            }
        }
    };

    let names: HashSet<&str> = raw.fst.keys().map(String::as_str).collect();
    let atoms = AtomClassifier {
        names: &names,
        separator: separator.to_string(),
    };

    let variables = raw
        .fst
        .iter()
        .map(|(name, value)| {
            atoms
                .expr(value)
                .map(|body| PatternVariableV1 {
                    name: name.clone(),
                    body,
                })
                .map_err(|message| SpecV1ParseError::Expr {
                    variable: name.clone(),
                    message,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut entry_points = Vec::new();
    if let Some(variable) = raw.parse {
        entry_points.push(EntryPointV1 {
            role: EntryRole::Parse,
            variable,
        });
    }
    if let Some(variable) = raw.generate {
        entry_points.push(EntryPointV1 {
            role: EntryRole::Generate,
            variable,
        });
    }
    if entry_points.is_empty() {
        return Err(SpecV1ParseError::NoEntryPoints);
    }

    let into_table = |pairs: Vec<(String, String)>| {
        pairs
            .into_iter()
            .map(|(easy, hard)| SubstitutionV1 { easy, hard })
            .collect::<Vec<_>>()
    };

    Ok(OrthographySpecV1 {
        id: raw.id,
        separator,
        variables,
        keys: raw.keys,
        entry_points,
        substitutions: into_table(raw.substitutions),
        substitutions_parse: raw.substitutions_parse.map(into_table),
    })
}

struct AtomClassifier<'a> {
    names: &'a HashSet<&'a str>,
    separator: String,
}

impl AtomClassifier<'_> {
    fn expr(&self, value: &Value) -> Result<PatternExprV1, String> {
        match value {
            Value::String(s) => Ok(self.atom(s)),
            Value::Object(map) => self.compound(map),
            other => Err(format!(
                "expected a string or a `union`/`concat`/`ref` object, got `{other}`"
            )),
        }
    }

    fn atom(&self, s: &str) -> PatternExprV1 {
        if self.names.contains(s) {
            return PatternExprV1::reference(s);
        }
        if s == self.separator {
            return PatternExprV1::Separator;
        }
        match s.split_once(':') {
            Some((surface, features)) => PatternExprV1::paired(surface, features),
            None => PatternExprV1::literal(s),
        }
    }

    fn compound(&self, map: &Map<String, Value>) -> Result<PatternExprV1, String> {
        let mut entries = map.iter();
        let (Some((tag, inner)), None) = (entries.next(), entries.next()) else {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            return Err(format!(
                "pattern object must have exactly one of `union`, `concat`, `ref` (found {keys:?})"
            ));
        };

        match tag.as_str() {
            "union" => Ok(PatternExprV1::union(self.list(tag, inner)?)),
            "concat" => Ok(PatternExprV1::concat(self.list(tag, inner)?)),
            "ref" => match inner {
                Value::String(name) => Ok(PatternExprV1::reference(name.as_str())),
                other => Err(format!("`ref` expects a variable name, got `{other}`")),
            },
            other => Err(format!(
                "unknown pattern operator `{other}` (expected union|concat|ref)"
            )),
        }
    }

    fn list(&self, tag: &str, value: &Value) -> Result<Vec<PatternExprV1>, String> {
        let Value::Array(items) = value else {
            return Err(format!("`{tag}` expects an array, got `{value}`"));
        };
        items.iter().map(|item| self.expr(item)).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
