//! Typed indicator-of-compromise extraction.
//!
//! Ten fixed patterns (CVE ids, ATT&CK technique ids, IPv4/IPv6, file
//! hashes, emails, URLs, domains, filesystem paths, ports) are applied to
//! deobfuscated text. Each type's values are normalized, deduplicated,
//! and sorted, so extracting the same text twice yields byte-identical
//! output.
//!
//! Extraction is total: text without indicators produces empty lists,
//! never an error.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::deobfuscate::deobfuscate;

/// The per-type indicator lists for one document (or one query string).
///
/// Field names match the vector store's per-type array properties. Every
/// list is deduplicated and lexicographically sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub cves: Vec<String>,
    pub tids: Vec<String>,
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
    pub hashes: Vec<String>,
    pub emails: Vec<String>,
    pub urls: Vec<String>,
    pub domains: Vec<String>,
    pub paths: Vec<String>,
    pub ports: Vec<String>,
}

impl IndicatorSet {
    /// All values across all types, in field order. The flat `iocs` view
    /// stored alongside the per-type lists.
    pub fn flattened(&self) -> Vec<String> {
        [
            &self.cves,
            &self.tids,
            &self.ipv4,
            &self.ipv6,
            &self.hashes,
            &self.emails,
            &self.urls,
            &self.domains,
            &self.paths,
            &self.ports,
        ]
        .iter()
        .flat_map(|list| list.iter().cloned())
        .collect()
    }

    /// True when no pattern matched anything.
    pub fn is_empty(&self) -> bool {
        self.flattened().is_empty()
    }
}

static CVE_RE: Lazy<Regex> = Lazy::new(|| compiled(r"(?i)\bCVE-\d{4}-\d{4,7}\b"));
static TID_RE: Lazy<Regex> = Lazy::new(|| compiled(r"(?i)\bT\d{4}(?:\.\d{1,3})?\b"));
static IPV4_RE: Lazy<Regex> =
    Lazy::new(|| compiled(r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b"));
// Permissive, not RFC-exact: 2 to 8 colon-separated groups of up to 4 hex digits.
static IPV6_RE: Lazy<Regex> = Lazy::new(|| compiled(r"(?i)\b(?:[A-F0-9]{0,4}:){2,7}[A-F0-9]{0,4}\b"));
static HASH_RE: Lazy<Regex> =
    Lazy::new(|| compiled(r"(?i)\b[a-f0-9]{32}\b|\b[a-f0-9]{40}\b|\b[a-f0-9]{64}\b"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| compiled(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b"));
static URL_RE: Lazy<Regex> = Lazy::new(|| compiled(r"(?i)\bhttps?://[^\s<>\[\]]+\b"));
static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| compiled(r"\b(?:[a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}\b"));
static PATH_RE: Lazy<Regex> = Lazy::new(|| {
    compiled(r"(?:[A-Za-z]:\\(?:[^\\\r\n]+\\)*[^\\\r\n]+)|(?:/(?:[^/\s]+/)*[^/\s]+)")
});
static PORT_RE: Lazy<Regex> = Lazy::new(|| compiled(r"(?i)\bport\s?(\d{1,5})\b"));

fn compiled(pattern: &str) -> Regex {
    Regex::new(pattern).expect("indicator pattern is valid")
}

/// Extract all indicators from `text`.
///
/// Deobfuscates once, then applies each pattern independently. Case is
/// preserved for most types; IPv4/IPv6 values are lowercased; port values
/// are parsed as integers, bounds-checked to 1..=65535, and re-rendered
/// as decimal strings.
pub fn extract(text: &str) -> IndicatorSet {
    let text = deobfuscate(text);

    IndicatorSet {
        cves: matches_trimmed(&CVE_RE, &text),
        tids: matches_trimmed(&TID_RE, &text),
        ipv4: matches_lowercased(&IPV4_RE, &text),
        ipv6: matches_lowercased(&IPV6_RE, &text),
        hashes: matches_trimmed(&HASH_RE, &text),
        emails: matches_trimmed(&EMAIL_RE, &text),
        urls: matches_trimmed(&URL_RE, &text),
        domains: matches_trimmed(&DOMAIN_RE, &text),
        paths: matches_trimmed(&PATH_RE, &text),
        ports: matched_ports(&text),
    }
}

fn matches_trimmed(re: &Regex, text: &str) -> Vec<String> {
    let set: BTreeSet<String> = re
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .collect();
    set.into_iter().collect()
}

fn matches_lowercased(re: &Regex, text: &str) -> Vec<String> {
    let set: BTreeSet<String> = re
        .find_iter(text)
        .map(|m| m.as_str().trim().to_lowercase())
        .collect();
    set.into_iter().collect()
}

fn matched_ports(text: &str) -> Vec<String> {
    let set: BTreeSet<String> = PORT_RE
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .filter(|port| (1..=65535).contains(port))
        .map(|port| port.to_string())
        .collect();
    set.into_iter().collect()
}
