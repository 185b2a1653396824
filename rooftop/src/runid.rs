//! Run identity codec.
//!
//! Every benchmark or use-case execution is identified by a single
//! filesystem-safe string built from its configuration dimensions, e.g.
//!
//! ```text
//! stream.size=134217728.n=01.t=04.log
//! ```
//!
//! The identifier doubles as the log file name, and the mere existence of
//! that file is the "already completed" marker checked before a run is
//! re-attempted. Encoding is canonical: integers are zero-padded to the
//! digit width of the largest value in their declared range so that
//! lexicographic and numeric ordering coincide, which lets the scanner list
//! runs chronologically with a plain sorted directory read and filter them
//! with substring matches.
//!
//! Decoding is deliberately permissive. Identifiers may grow extra qualifier
//! segments over time ("quick" markers, result variants) and renamed or
//! malformed segments must not break older consumers, so unknown segments
//! are preserved under their own key and broken ones are dropped silently.

use std::collections::HashMap;
use std::path::Path;

/// Segment delimiter of a run identifier.
pub const DELIMITER: char = '.';

/// Replacement for delimiter characters that appear inside a token value,
/// so that splitting on [`DELIMITER`] stays unambiguous.
const SUBSTITUTE: char = '-';

/// Extension segment that terminates every log identifier.
pub const LOG_EXT: &str = "log";

/// Formatting rule for one configuration dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Value rendered verbatim (after delimiter substitution).
    Str,
    /// Value left-padded with zeros to a fixed width, then substituted.
    /// Keeps numeric-looking strings lexicographically sortable.
    FixedWidth(usize),
    /// Integer zero-padded to the digit width of the declared maximum.
    Bounded(i64),
}

/// One `key=value` dimension of a run configuration. Order of tokens is
/// semantically significant: it is preserved verbatim by [`encode`].
#[derive(Debug, Clone)]
pub struct RunToken {
    key: String,
    value: String,
    kind: TokenKind,
}

impl RunToken {
    /// Free-form string dimension.
    pub fn str(key: &str, value: &str) -> Self {
        Self { key: key.to_string(), value: value.to_string(), kind: TokenKind::Str }
    }

    /// String dimension zero-padded to `width` characters.
    pub fn fixed(key: &str, value: &str, width: usize) -> Self {
        Self { key: key.to_string(), value: value.to_string(), kind: TokenKind::FixedWidth(width) }
    }

    /// Integer dimension bounded by `max`; rendered zero-padded to the
    /// digit width of `max` (`n=2` with `max=16` renders as `n=02`).
    pub fn bounded(key: &str, value: i64, max: i64) -> Self {
        Self { key: key.to_string(), value: value.to_string(), kind: TokenKind::Bounded(max) }
    }

    /// The rendered `key=value` segment, e.g. for naming the
    /// per-configuration directory of a run.
    #[must_use]
    pub fn pair(&self) -> String {
        format!("{}={}", self.key, self.render())
    }

    fn render(&self) -> String {
        match self.kind {
            TokenKind::Str => self.value.replace(DELIMITER, &SUBSTITUTE.to_string()),
            TokenKind::FixedWidth(width) => {
                format!("{:0>width$}", self.value).replace(DELIMITER, &SUBSTITUTE.to_string())
            }
            TokenKind::Bounded(max) => {
                let width = max.to_string().len();
                let value: i64 = self.value.parse().unwrap_or(0);
                format!("{value:0width$}")
            }
        }
    }
}

/// Render a run identifier: `root.key1=value1.key2=value2.ext`.
pub fn encode(root: &str, tokens: &[RunToken], ext: &str) -> String {
    let mut id = String::from(root);
    for token in tokens {
        id.push(DELIMITER);
        id.push_str(&token.key);
        id.push('=');
        id.push_str(&token.render());
    }
    if !ext.is_empty() {
        id.push(DELIMITER);
        id.push_str(ext);
    }
    id
}

/// Dimensions recovered from a run identifier.
///
/// Callers must treat absent keys as "unknown", not as a decode failure.
#[derive(Debug, Clone, Default)]
pub struct DecodedTokens {
    root: Option<String>,
    values: HashMap<String, String>,
}

impl DecodedTokens {
    /// First segment of the identifier.
    #[must_use]
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Raw value of a recognized key (`get("n")` on `...n=04...` is `"04"`).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value of a key parsed as an integer.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// The full `key=value` segment, as it appears in the identifier.
    /// Used to build per-configuration directory and log names.
    #[must_use]
    pub fn pair(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| format!("{key}={v}"))
    }
}

/// Split a run identifier (or a path ending in one) back into its
/// dimensions.
///
/// The first segment is the root; a trailing `log` segment is the extension
/// and is skipped. `n=` and `t=` prefixed segments map to those canonical
/// keys, any other `key=value` segment maps by its own key, and a bare
/// segment with no `=` is stored under itself. Segments with an empty key
/// are malformed and dropped; decoding itself never fails.
#[must_use]
pub fn decode(identifier: &str) -> DecodedTokens {
    let name = Path::new(identifier)
        .file_name()
        .map_or_else(|| identifier.to_string(), |n| n.to_string_lossy().into_owned());

    let mut decoded = DecodedTokens::default();
    for segment in name.split(DELIMITER) {
        if segment == LOG_EXT {
            continue;
        }
        if decoded.root.is_none() {
            decoded.root = Some(segment.to_string());
            continue;
        }
        match segment.split_once('=') {
            Some(("", _)) => {} // Malformed, drop
            Some((key, value)) => {
                decoded.values.insert(key.to_string(), value.to_string());
            }
            None => {
                decoded.values.insert(segment.to_string(), segment.to_string());
            }
        }
    }
    decoded
}
