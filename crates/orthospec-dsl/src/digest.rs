//! Canonical specification digests (versioned).
//!
//! Callers that cache analysis results need a stable way to refer to the exact
//! specification a result was computed from. We use a simple, deterministic,
//! non-cryptographic digest:
//!
//! - algorithm: **FNV-1a 64-bit**
//! - input: a canonical walk over the specification (id, separator, keys,
//!   variables in declaration order, entry points)
//! - output: `"fnv1a64:<16 lowercase hex digits>"`
//!
//! Substitution tables are excluded: they do not influence structural analysis.
//! This digest is **not** a security primitive.

use crate::spec_v1::{LiteralV1, OrthographySpecV1, PatternExprV1};

/// Prefix used in serialized digests.
pub const SPEC_DIGEST_V1_PREFIX: &str = "fnv1a64:";

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001b3;

fn add(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
}

/// Compute a v1 digest (FNV-1a 64-bit) over arbitrary bytes.
pub fn fnv1a64_digest_bytes(bytes: &[u8]) -> String {
    let mut hash = FNV_OFFSET_BASIS;
    for b in bytes {
        hash ^= (*b) as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    format!("{SPEC_DIGEST_V1_PREFIX}{hash:016x}")
}

/// Compute the v1 digest of a specification's analyzable content.
pub fn spec_digest_v1(spec: &OrthographySpecV1) -> String {
    // Strings are length-prefixed so adjacent fields cannot run together.
    fn add_str(buf: &mut Vec<u8>, s: &str) {
        add(buf, &s.len().to_string());
        add(buf, ":");
        add(buf, s);
    }

    fn add_expr(buf: &mut Vec<u8>, expr: &PatternExprV1) {
        match expr {
            PatternExprV1::Literal {
                text: LiteralV1::Plain { text },
            } => {
                add(buf, "lit(");
                add_str(buf, text);
            }
            PatternExprV1::Literal {
                text: LiteralV1::Paired { surface, features },
            } => {
                add(buf, "pair(");
                add_str(buf, surface);
                add_str(buf, features);
            }
            PatternExprV1::Separator => add(buf, "sep("),
            PatternExprV1::Reference { name } => {
                add(buf, "ref(");
                add_str(buf, name);
            }
            PatternExprV1::Concat { items } => {
                add(buf, "concat(");
                items.iter().for_each(|e| add_expr(buf, e));
            }
            PatternExprV1::Union { branches } => {
                add(buf, "union(");
                branches.iter().for_each(|e| add_expr(buf, e));
            }
        }
        add(buf, ")");
    }

    let mut buf = Vec::new();

    add(&mut buf, "id=");
    add_str(&mut buf, spec.id.as_deref().unwrap_or(""));
    add(&mut buf, "|separator=");
    add_str(&mut buf, &spec.separator.to_string());
    add(&mut buf, "|keys=");
    for key in &spec.keys {
        add_str(&mut buf, key);
    }
    add(&mut buf, "|variables=");
    for var in &spec.variables {
        add_str(&mut buf, &var.name);
        add(&mut buf, "=");
        add_expr(&mut buf, &var.body);
        add(&mut buf, ";");
    }
    add(&mut buf, "|entries=");
    for entry in &spec.entry_points {
        add_str(&mut buf, &entry.role.to_string());
        add_str(&mut buf, &entry.variable);
    }

    fnv1a64_digest_bytes(&buf)
}
