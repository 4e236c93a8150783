use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Cached node list of one environment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub items: Vec<NodeItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeItem {
    pub hostname: String,
    pub addr: String,
    pub labels: BTreeMap<String, String>,
}

impl Node {
    pub fn hostnames(&self) -> Vec<String> {
        self.items.iter().map(|item| item.hostname.clone()).collect()
    }

    /// Add the items of `fresh` whose hostname is not cached yet, keeping the
    /// cached items first.
    pub fn append(&mut self, fresh: Node) {
        let mut known: HashSet<String> = self.items.iter().map(|item| item.hostname.clone()).collect();
        for item in fresh.items {
            if known.insert(item.hostname.clone()) {
                self.items.push(item);
            }
        }
    }
}
