use std::collections::BTreeMap;
use std::ops::Range;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostEntry {
    pub hostname: String,
    /// Byte range of the first keyword occurrence, `None` for an empty keyword.
    pub match_range: Option<Range<usize>>,
}

/// Hosts containing `keyword` (trimmed, case-sensitive), keyed by hostname.
///
/// Empty hostnames are skipped and duplicates collapse into one entry.
pub fn filter(hosts: &[String], keyword: &str) -> BTreeMap<String, HostEntry> {
    let keyword = keyword.trim();
    let mut matches = BTreeMap::new();
    for host in hosts {
        if host.is_empty() {
            continue;
        }
        let Some(start) = host.find(keyword) else {
            continue;
        };
        let match_range = if keyword.is_empty() {
            None
        } else {
            Some(start..start + keyword.len())
        };
        matches.insert(
            host.clone(),
            HostEntry {
                hostname: host.clone(),
                match_range,
            },
        );
    }
    matches
}
