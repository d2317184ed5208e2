//! Whitespace normalization applied to every winning conversion result.
//!
//! Converters produce text with wildly different whitespace habits (HTML
//! serializers emit blank-line runs, spreadsheet walkers leave trailing
//! spaces, transcripts arrive with CRLF endings). Normalizing once at the
//! dispatch boundary gives every caller the same guarantee regardless of
//! which handler won.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_LINE_ENDING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r|\n").unwrap());
static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Canonicalize whitespace: split on any line ending, right-trim each
/// line, rejoin with `\n`, then collapse runs of 3+ newlines to exactly 2.
///
/// Idempotent: normalizing already-normalized text is a no-op.
pub fn normalize(text: &str) -> String {
    let joined = RE_LINE_ENDING
        .split(text)
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    RE_BLANK_RUN.replace_all(&joined, "\n\n").into_owned()
}
