// changelog.rs -- ChangeLog authorship aggregation

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::exception::ProvenanceError;

lazy_static! {
    static ref GENTOO_CONTACT: Regex =
        Regex::new(r"(?i)<[A-Za-z_0-9.+-]+@gentoo\.org>").unwrap();
}

/// A contributor handle pulled out of free text. `raw` is the matched
/// bracketed token, `handle` the same token with the angle brackets
/// stripped. Stripping is idempotent: normalizing a handle again yields
/// the same handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactIdentifier {
    pub raw: String,
    pub handle: String,
}

impl ContactIdentifier {
    pub fn from_match(raw: &str) -> Self {
        ContactIdentifier {
            raw: raw.to_string(),
            handle: normalize_handle(raw),
        }
    }

    /// Everything before the '@', which is what reports display.
    pub fn local_part(&self) -> &str {
        local_part(&self.handle)
    }
}

/// Strip the enclosing angle brackets, if any.
pub fn normalize_handle(raw: &str) -> String {
    raw.trim_start_matches('<').trim_end_matches('>').to_string()
}

pub fn local_part(handle: &str) -> &str {
    match handle.find('@') {
        Some(at) => &handle[..at],
        None => handle,
    }
}

/// Scans changelog text for contributor contact identifiers and produces
/// a ranked frequency summary. Identity is the whole address: the same
/// person signing under two organizational addresses stays two entries.
#[derive(Debug)]
pub struct ChangelogAggregator {
    pattern: Regex,
}

impl Default for ChangelogAggregator {
    fn default() -> Self {
        ChangelogAggregator {
            pattern: GENTOO_CONTACT.clone(),
        }
    }
}

impl ChangelogAggregator {
    /// Aggregator matching `<localpart@domain>` tokens for the given
    /// organization domain, case-insensitively.
    pub fn with_domain(domain: &str) -> Self {
        let pattern = format!(r"(?i)<[A-Za-z_0-9.+-]+@{}>", regex::escape(domain));
        ChangelogAggregator {
            pattern: Regex::new(&pattern).unwrap(),
        }
    }

    /// Count contact identifier occurrences in `text` and return
    /// (count, handle) pairs ordered by count descending, ties broken
    /// lexically by handle. No matches yields an empty vec.
    pub fn aggregate(&self, text: &str) -> Vec<(usize, String)> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for m in self.pattern.find_iter(text) {
            let id = ContactIdentifier::from_match(m.as_str());
            *counts.entry(id.handle).or_insert(0) += 1;
        }

        let mut ranked: Vec<(usize, String)> = counts.into_iter().map(|(k, v)| (v, k)).collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        ranked
    }

    /// Aggregate the ChangeLog at `path`. A missing file is a
    /// `NotFound` error; an empty or identifier-free file is an empty
    /// result. The path must be fully resolved by the caller; this
    /// never touches the working directory.
    pub fn aggregate_file(&self, path: &Path) -> Result<Vec<(usize, String)>, ProvenanceError> {
        if !path.exists() {
            return Err(ProvenanceError::not_found(format!(
                "ChangeLog: {}",
                path.display()
            )));
        }
        let text = fs::read_to_string(path)?;
        Ok(self.aggregate(&text))
    }
}

/// Render ranked pairs as the report summary: each entry's local part
/// prefixed with its count, joined with ", ". `[(2, "dev1@gentoo.org")]`
/// becomes `"2 dev1"`.
pub fn format_summary(ranked: &[(usize, String)]) -> String {
    ranked
        .iter()
        .map(|(count, handle)| format!("{} {}", count, local_part(handle)))
        .collect::<Vec<_>>()
        .join(", ")
}
