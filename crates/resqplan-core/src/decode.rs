//! Solver key decoding.
//!
//! The solver names each decision variable with a key in one of two shapes:
//!
//! ```text
//! tuple:  ('1ºA', 'Matemáticas', 'Juan Pérez', 2, 3)     x(0, 1, 0)
//! token:  x_Maria_1_4                                    Maria_1_4
//! ```
//!
//! In both shapes the last two fields are the day and the slot and every
//! preceding field is an entity. [`decode`] is total: malformed keys come back
//! as [`DecodedKey::Unparsable`] and are never an error.

use std::sync::LazyLock;

use regex::Regex;

/// Separator used when several entities share one grid entry.
pub const LABEL_SEPARATOR: &str = " / ";

/// Largest day or slot index a key may carry. Keys above it are
/// [`DecodedKey::Unparsable`], which keeps the dense grid a sane size.
pub const MAX_INDEX: u32 = 9_999;

static TUPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_]*)?\(\s*(.+)\s*,\s*(\d+)\s*,\s*(\d+)\s*\)$")
        .expect("tuple key pattern is valid")
});

static TUPLE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_]*)?\(")
        .expect("tuple prefix pattern is valid")
});

/// One active (entities, day, slot) triple taken from a solver key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Assignment {
    /// Always at least one entity.
    pub entities: Vec<String>,
    pub day: u32,
    pub slot: u32,
}

impl Assignment {
    /// Display label: the single entity, or all entities joined by `" / "`.
    pub fn label(&self) -> String {
        self.entities.join(LABEL_SEPARATOR)
    }
}

/// Result of decoding a key, tagged by the grammar that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedKey {
    Tuple(Assignment),
    Token(Assignment),
    Unparsable,
}

impl DecodedKey {
    pub fn assignment(self) -> Option<Assignment> {
        match self {
            Self::Tuple(a) | Self::Token(a) => Some(a),
            Self::Unparsable => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        !matches!(self, Self::Unparsable)
    }
}

/// Decode one solver key.
pub fn decode(key: &str) -> DecodedKey {
    let key = key.trim();
    if TUPLE_PREFIX_RE.is_match(key) {
        decode_tuple(key)
    } else {
        decode_token(key)
    }
}

fn decode_tuple(key: &str) -> DecodedKey {
    let Some(caps) = TUPLE_RE.captures(key) else {
        return DecodedKey::Unparsable;
    };
    let Some((day, slot)) = parse_indices(&caps[2], &caps[3]) else {
        return DecodedKey::Unparsable;
    };

    let entities: Vec<String> = caps[1]
        .split(',')
        .map(|field| strip_quotes(field.trim()).trim().to_string())
        .collect();
    if entities.iter().any(String::is_empty) {
        return DecodedKey::Unparsable;
    }

    DecodedKey::Tuple(Assignment {
        entities,
        day,
        slot,
    })
}

fn decode_token(key: &str) -> DecodedKey {
    let body = key.strip_prefix("x_").unwrap_or(key);
    let mut tokens: Vec<&str> = body.split('_').collect();

    // Read from the end: slot first, then day.
    let (Some(slot), Some(day)) = (tokens.pop(), tokens.pop()) else {
        return DecodedKey::Unparsable;
    };
    let Some((day, slot)) = parse_indices(day, slot) else {
        return DecodedKey::Unparsable;
    };
    if tokens.is_empty() || tokens.iter().any(|t| t.is_empty()) {
        return DecodedKey::Unparsable;
    }

    DecodedKey::Token(Assignment {
        entities: tokens.into_iter().map(str::to_string).collect(),
        day,
        slot,
    })
}

fn parse_indices(day: &str, slot: &str) -> Option<(u32, u32)> {
    let day = day.parse::<u32>().ok().filter(|d| *d <= MAX_INDEX)?;
    let slot = slot.parse::<u32>().ok().filter(|s| *s <= MAX_INDEX)?;
    Some((day, slot))
}

/// Strip one leading and one trailing quote character (single or double).
fn strip_quotes(field: &str) -> &str {
    let field = field
        .strip_prefix('\'')
        .or_else(|| field.strip_prefix('"'))
        .unwrap_or(field);
    field
        .strip_suffix('\'')
        .or_else(|| field.strip_suffix('"'))
        .unwrap_or(field)
}
