//! Orthospec pattern-expression documents
//!
//! This crate defines the `spec_v1` document format for orthography
//! specifications (named pattern variables, an ordered feature-key list, and
//! parse/generate entry points), its typed AST, and the checked
//! [`graph::PatternGraph`] that structural analysis runs over.
//!
//! Executing the patterns as a transducer is somebody else's job; this crate
//! only describes them.

pub mod digest;
pub mod graph;
pub mod spec_v1;

pub use graph::{GraphBuildError, PatternGraph};
pub use spec_v1::{
    parse_spec_v1, EntryPointV1, EntryRole, ExprDisplay, LiteralV1, OrthographySpecV1, PatternExprV1,
    PatternVariableV1, SpecV1ParseError,
};
