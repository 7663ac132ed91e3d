//! Frequency-percentile relevance filter.
//!
//! Collapses the raw nearest-neighbor hit set into the final evidence
//! map: hits are grouped by document, documents are ranked by how many
//! of their chunks matched, and only documents at or above a percentile
//! of the hit-count distribution survive. More matching chunks means a
//! more relevant document; distances are never consulted.

use anyhow::{bail, Result};

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{EvidenceMap, RawHit};

/// Documents must sit at or above this percentile of the per-document
/// hit-count distribution to be retained. Overridable through
/// `[retrieval] relevance_percentile`.
pub const DEFAULT_RELEVANCE_PERCENTILE: f64 = 0.90;

/// Reduce raw query hits to the evidence map.
///
/// Exact-duplicate `(doc_name, text)` rows collapse; a retained document
/// with several distinct matching chunks keeps them all, concatenated in
/// first-seen order into its single representative text.
///
/// Zero hits is a normal outcome and yields an empty map. A hit with an
/// empty `doc_name` or `text` fails the whole call: no partial evidence
/// map is ever returned.
pub fn filter_hits(hits: &[RawHit], percentile: f64) -> Result<EvidenceMap> {
    for hit in hits {
        if hit.doc_name.is_empty() || hit.text.is_empty() {
            bail!(
                "malformed hit record (doc_name: {:?}, text length: {})",
                hit.doc_name,
                hit.text.len()
            );
        }
    }

    if hits.is_empty() {
        return Ok(EvidenceMap::new());
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for hit in hits {
        *counts.entry(hit.doc_name.as_str()).or_insert(0) += 1;
    }

    let threshold = percentile_value(counts.values().map(|&c| c as f64).collect(), percentile);
    let retained: BTreeSet<&str> = counts
        .iter()
        .filter(|(_, &count)| count as f64 >= threshold)
        .map(|(&name, _)| name)
        .collect();

    let mut seen: BTreeSet<(&str, &str)> = BTreeSet::new();
    let mut evidence = EvidenceMap::new();
    for hit in hits {
        if !retained.contains(hit.doc_name.as_str()) {
            continue;
        }
        if !seen.insert((hit.doc_name.as_str(), hit.text.as_str())) {
            continue;
        }
        evidence
            .entry(hit.doc_name.clone())
            .and_modify(|text| {
                text.push_str("\n\n");
                text.push_str(&hit.text);
            })
            .or_insert_with(|| hit.text.clone());
    }

    Ok(evidence)
}

/// Linear-interpolated percentile of `values`, matching the numpy
/// `quantile` convention: rank `q * (n - 1)` interpolated between the
/// two nearest order statistics.
fn percentile_value(mut values: Vec<f64>, q: f64) -> f64 {
    debug_assert!(!values.is_empty());
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return values[lo];
    }
    let weight = rank - lo as f64;
    values[lo] * (1.0 - weight) + values[hi] * weight
}
