//! Reverses common indicator-obfuscation conventions used in advisory
//! prose (`hxxp://`, bracketed dots) so the IOC patterns can match the
//! canonical forms.

use once_cell::sync::Lazy;
use regex::Regex;

static HXXP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)hxxp(s?)://").expect("hxxp pattern is valid"));

/// Normalize obfuscated indicator syntax. Pure and total: any input maps
/// to some output, never an error.
///
/// The protocol scheme is rewritten first; the bracket-dot replacements
/// that follow touch only `[.]`/`(.)`/`{.}` substrings, so they cannot
/// corrupt an already-fixed scheme.
pub fn deobfuscate(text: &str) -> String {
    let text = HXXP_RE.replace_all(text, "http$1://");
    text.replace("[.]", ".")
        .replace("(.)", ".")
        .replace("{.}", ".")
}
