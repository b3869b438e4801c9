//! Best-match resolution of free-form text to an existing category.
//!
//! Matching runs exact, then prefix, then substring, all case-insensitive, over
//! categories in a fixed order so that ties always land on the same category.
//! Nothing here ever creates a category.

use crate::models::Category;

fn sorted(categories: &[Category]) -> Vec<&Category> {
    let mut out: Vec<&Category> = categories.iter().collect();
    out.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    out
}

pub fn resolve<'a>(input: &str, categories: &'a [Category]) -> Option<&'a Category> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let ordered = sorted(categories);
    let lowered: Vec<String> = ordered.iter().map(|c| c.name.to_lowercase()).collect();

    let exact = lowered.iter().position(|name| *name == needle);
    let prefix = || lowered.iter().position(|name| name.starts_with(&needle));
    let substring = || lowered.iter().position(|name| name.contains(&needle));

    exact.or_else(prefix).or_else(substring).map(|i| ordered[i])
}

/// Names containing `input`, in resolution order, at most `limit` of them.
pub fn suggest<'a>(input: &str, categories: &'a [Category], limit: usize) -> Vec<&'a str> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return vec![];
    }
    sorted(categories)
        .into_iter()
        .filter(|c| c.name.to_lowercase().contains(&needle))
        .map(|c| c.name.as_str())
        .take(limit)
        .collect()
}
