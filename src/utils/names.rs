//! Deterministic unique-name generation for named-object collections.

use std::collections::BTreeMap;

/// Make a list of names globally unique.
///
/// Every occurrence of a duplicated name receives a 1-based `_i` suffix in
/// order of appearance; names that were already unique are untouched. The
/// pass repeats until no duplicates remain, so a suffixed name colliding
/// with a pre-existing one (e.g. `x`, `x`, `x_1`) still resolves.
pub fn make_unique(names: &[String]) -> Vec<String> {
    let mut out = names.to_vec();
    loop {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for n in &out {
            *counts.entry(n.as_str()).or_insert(0) += 1;
        }
        if counts.values().all(|&c| c == 1) {
            return out;
        }
        let duplicated: Vec<String> = counts
            .iter()
            .filter(|(_, &c)| c > 1)
            .map(|(n, _)| n.to_string())
            .collect();
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        out = out
            .into_iter()
            .map(|n| {
                if duplicated.contains(&n) {
                    let i = seen.entry(n.clone()).or_insert(0);
                    *i += 1;
                    format!("{n}_{i}")
                } else {
                    n
                }
            })
            .collect();
    }
}
