use crate::config;
use crate::model::Node;
use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

/// How a freshly fetched node list is folded into the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheUpdate {
    /// Drop the cached list and keep only the fresh one.
    Replace,
    /// Keep cached nodes and add the fresh ones not already there.
    Append,
}

/// Background write of the updated node cache.
pub type CacheWrite = JoinHandle<Result<()>>;

/// Hostnames from the cache of `env`, without asking the proxy.
pub fn cached_hosts(path: &Path, env: &str) -> Result<Vec<String>> {
    let node = config::load_nodes(path).with_context(|| {
        format!("Failed to load nodes of {env}, you might need -r to refresh the node cache")
    })?;
    Ok(node.hostnames())
}

/// Merge `fresh` into the cache at `path` and return the hostnames to pick
/// from. The write runs on the blocking pool; the caller joins it when done.
pub fn update(path: PathBuf, env: &str, mode: CacheUpdate, fresh: Node) -> Result<(Vec<String>, CacheWrite)> {
    update_with(path, env, mode, fresh, |path, node| config::save_nodes(path, node))
}

fn update_with<F>(
    path: PathBuf,
    env: &str,
    mode: CacheUpdate,
    fresh: Node,
    save: F,
) -> Result<(Vec<String>, CacheWrite)>
where
    F: FnOnce(&Path, &Node) -> Result<()> + Send + 'static,
{
    if fresh.items.is_empty() {
        return Err(anyhow!("There are no nodes on {env}"));
    }

    let node = if mode == CacheUpdate::Append && path.exists() {
        let mut cached = config::load_nodes(&path).context("Failed to append nodes")?;
        cached.append(fresh);
        cached
    } else {
        fresh
    };

    tracing::info!(env, nodes = node.items.len(), ?mode, "updating node cache");
    let hosts = node.hostnames();
    let handle = tokio::task::spawn_blocking(move || save(&path, &node));
    Ok((hosts, handle))
}

/// Wait for a background cache write and log how it went.
pub async fn finish(write: CacheWrite) {
    match write.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(error = %format!("{err:#}"), "node cache update failed"),
        Err(err) => tracing::warn!(error = %err, "node cache update task failed"),
    }
}
