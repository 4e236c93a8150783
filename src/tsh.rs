use crate::config::Proxy;
use crate::model::{Node, NodeItem};
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::Stdio;
use tokio::process::Command;

/// `tsh` invocations bound to one proxy.
pub struct Tsh<'a> {
    proxy: &'a Proxy,
}

impl<'a> Tsh<'a> {
    pub fn new(proxy: &'a Proxy) -> Self {
        Self { proxy }
    }

    pub fn base_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        args.push(format!("--proxy={}", proxy_host(&self.proxy.address)));
        if !self.proxy.user_name.is_empty() {
            args.push(format!("--user={}", self.proxy.user_name));
        }
        if !self.proxy.auth_connector.is_empty() {
            args.push(format!("--auth={}", self.proxy.auth_connector));
        }
        args
    }

    /// Interactive `tsh login`, needed before listing when 2FA is on.
    pub async fn login(&self) -> Result<()> {
        let mut cmd = Command::new("tsh");
        cmd.arg("login").args(self.base_args());
        inherit_stdio(&mut cmd);
        tracing::info!(env = %self.proxy.env, "tsh login");
        let status = cmd.status().await.context("Failed to launch tsh login")?;
        if !status.success() {
            return Err(anyhow!("tsh login exited with status {status}"));
        }
        Ok(())
    }

    pub async fn list_nodes(&self) -> Result<Node> {
        if self.proxy.two_fa {
            self.login().await?;
        }

        let mut cmd = Command::new("tsh");
        cmd.arg("ls").args(self.base_args()).arg("--format=json");
        cmd.stdin(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        tracing::info!(env = %self.proxy.env, "tsh ls");
        let output = cmd
            .output()
            .await
            .with_context(|| format!("tsh ls failed for {}", self.proxy.env))?;
        if !output.status.success() {
            return Err(anyhow!(
                "tsh ls failed for {}: exit status {}",
                self.proxy.env,
                output.status
            ));
        }
        parse_node_list(&String::from_utf8_lossy(&output.stdout))
    }

    pub async fn ssh(&self, user: &str, host: &str) -> Result<()> {
        let mut cmd = Command::new("tsh");
        cmd.arg("ssh").args(self.base_args()).arg(format!("{user}@{host}"));
        inherit_stdio(&mut cmd);
        tracing::info!(env = %self.proxy.env, %host, %user, "tsh ssh");
        let status = cmd.status().await.context("Failed to launch tsh ssh")?;
        if !status.success() {
            tracing::warn!(%status, "tsh ssh exited unsuccessfully");
            eprintln!("tsh ssh exited with status {status}");
        }
        Ok(())
    }
}

fn inherit_stdio(cmd: &mut Command) {
    cmd.stdin(Stdio::inherit());
    cmd.stdout(Stdio::inherit());
    cmd.stderr(Stdio::inherit());
}

/// `tsh --proxy` takes `host[:port]`, the config stores a URL.
fn proxy_host(address: &str) -> String {
    match url::Url::parse(address) {
        Ok(url) => match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            _ => address.to_string(),
        },
        Err(_) => address.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct TshNode {
    #[serde(default)]
    metadata: TshMetadata,
    #[serde(default)]
    spec: TshSpec,
}

#[derive(Debug, Default, Deserialize)]
struct TshMetadata {
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct TshSpec {
    #[serde(default)]
    hostname: String,
    #[serde(default)]
    addr: String,
}

pub fn parse_node_list(output: &str) -> Result<Node> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Node::default());
    }
    let nodes: Vec<TshNode> =
        serde_json::from_str(trimmed).context("Unable to parse tsh ls output")?;
    let items = nodes
        .into_iter()
        .filter(|node| !node.spec.hostname.is_empty())
        .map(|node| NodeItem {
            hostname: node.spec.hostname,
            addr: node.spec.addr,
            labels: node.metadata.labels,
        })
        .collect();
    Ok(Node { items })
}
