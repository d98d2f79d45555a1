//! Host registry: per-host network attributes kept in a secret store.
//!
//! Keys are laid out as `<prefix>/<host>/net/<scope>/<attribute>` for
//! attributes that differ between LAN and WAN access, and
//! `<prefix>/<host>/net/<attribute>` for the rest.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::Error;
use crate::models::Scope;

pub const IP_ADDRESS: &str = "ip-address";
pub const PORT_SSH: &str = "port-ssh";
pub const PORT_WAKEUP: &str = "port-wakeup";
pub const MAC_ADDRESS: &str = "mac-address";
pub const WAKEUP_DELAY: &str = "wakeup-delay";

/// Read-only key/value capability the registry needs from a store.
///
/// Lookups never fail: a store that cannot be reached reports the key as
/// absent.
#[allow(async_fn_in_trait)]
pub trait SecretStore {
    async fn exists(&self, key: &str) -> bool;
    async fn get(&self, key: &str) -> Option<String>;
}

/// Shells out to a `pass`-compatible program.
#[derive(Debug, Clone)]
pub struct PassStore {
    program: String,
}

impl PassStore {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl SecretStore for PassStore {
    async fn exists(&self, key: &str) -> bool {
        let status = Command::new(&self.program)
            .arg(key)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => status.success(),
            Err(e) => {
                warn!("Failed to run {} for '{}': {}", self.program, key, e);
                false
            }
        }
    }

    async fn get(&self, key: &str) -> Option<String> {
        let output = Command::new(&self.program)
            .arg(key)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to run {} for '{}': {}", self.program, key, e);
                None
            }
        }
    }
}

/// Flat in-memory store. Also backs the `hosts_file` registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
struct HostsFile {
    #[serde(default)]
    hosts: HashMap<String, HostEntry>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct HostEntry {
    mac_address: Option<String>,
    wakeup_delay: Option<u64>,
    local: Option<ScopedEntry>,
    global: Option<ScopedEntry>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct ScopedEntry {
    ip_address: Option<String>,
    port_ssh: Option<u16>,
    port_wakeup: Option<u16>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    #[cfg(test)]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Loads `[hosts.<name>]` tables and flattens them into registry keys.
    pub fn from_hosts_file(path: &Path, prefix: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read hosts file {}", path.display()))?;
        Self::from_hosts_toml(&content, prefix)
    }

    pub fn from_hosts_toml(content: &str, prefix: &str) -> Result<Self> {
        let file: HostsFile = toml::from_str(content).context("Failed to parse hosts file")?;

        let mut store = Self::new();
        for (name, entry) in file.hosts {
            // A registered host exists even when it has no attributes yet.
            store.insert(host_key(prefix, &name), "");

            if let Some(mac) = entry.mac_address {
                store.insert(attribute_key(prefix, &name, None, MAC_ADDRESS), mac);
            }
            if let Some(delay) = entry.wakeup_delay {
                store.insert(
                    attribute_key(prefix, &name, None, WAKEUP_DELAY),
                    delay.to_string(),
                );
            }
            for (scope, scoped) in [(Scope::Local, entry.local), (Scope::Global, entry.global)] {
                let Some(scoped) = scoped else { continue };
                if let Some(ip) = scoped.ip_address {
                    store.insert(attribute_key(prefix, &name, Some(scope), IP_ADDRESS), ip);
                }
                if let Some(port) = scoped.port_ssh {
                    store.insert(
                        attribute_key(prefix, &name, Some(scope), PORT_SSH),
                        port.to_string(),
                    );
                }
                if let Some(port) = scoped.port_wakeup {
                    store.insert(
                        attribute_key(prefix, &name, Some(scope), PORT_WAKEUP),
                        port.to_string(),
                    );
                }
            }
        }
        Ok(store)
    }
}

impl SecretStore for MemoryStore {
    async fn exists(&self, key: &str) -> bool {
        let dir = key.trim_end_matches('/');
        self.values
            .keys()
            .any(|k| k == dir || k.starts_with(&format!("{dir}/")))
    }

    async fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// `<prefix>/<host>/net/`
pub fn host_key(prefix: &str, host: &str) -> String {
    format!("{prefix}/{host}/net/")
}

pub fn attribute_key(prefix: &str, host: &str, scope: Option<Scope>, attribute: &str) -> String {
    match scope {
        Some(scope) => format!("{}{}/{}", host_key(prefix, host), scope.as_str(), attribute),
        None => format!("{}{}", host_key(prefix, host), attribute),
    }
}

/// Typed accessors over a [`SecretStore`]. One store call per lookup, no
/// caching.
#[derive(Debug, Clone)]
pub struct Registry<S> {
    store: S,
    prefix: String,
}

impl<S: SecretStore> Registry<S> {
    pub fn new(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub async fn host_known(&self, host: &str) -> bool {
        let key = host_key(&self.prefix, host);
        let known = self.store.exists(&key).await;
        debug!("Registry lookup {} -> known={}", key, known);
        known
    }

    pub async fn address(&self, host: &str, lan: bool) -> Option<String> {
        self.text(host, Some(Scope::from_lan(lan)), IP_ADDRESS).await
    }

    pub async fn ssh_port(&self, host: &str, lan: bool) -> Result<Option<u16>, Error> {
        self.number(host, Some(Scope::from_lan(lan)), PORT_SSH).await
    }

    pub async fn mac(&self, host: &str) -> Option<String> {
        self.text(host, None, MAC_ADDRESS).await
    }

    pub async fn wakeup_port(&self, host: &str, lan: bool) -> Result<Option<u16>, Error> {
        self.number(host, Some(Scope::from_lan(lan)), PORT_WAKEUP).await
    }

    pub async fn wakeup_delay(&self, host: &str) -> Result<Option<u64>, Error> {
        self.number(host, None, WAKEUP_DELAY).await
    }

    async fn text(&self, host: &str, scope: Option<Scope>, attribute: &str) -> Option<String> {
        let key = attribute_key(&self.prefix, host, scope, attribute);
        let value = self.store.get(&key).await;
        debug!("Registry lookup {} -> {:?}", key, value);
        value
    }

    async fn number<T: std::str::FromStr>(
        &self,
        host: &str,
        scope: Option<Scope>,
        attribute: &str,
    ) -> Result<Option<T>, Error> {
        let key = attribute_key(&self.prefix, host, scope, attribute);
        let Some(value) = self.store.get(&key).await else {
            debug!("Registry lookup {} -> None", key);
            return Ok(None);
        };
        debug!("Registry lookup {} -> {:?}", key, value);
        value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::CorruptRegistryValue { key, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry<MemoryStore> {
        let store = MemoryStore::new()
            .with("computers/nas/net/global/ip-address", "nas.example.com")
            .with("computers/nas/net/local/ip-address", "192.168.1.20")
            .with("computers/nas/net/global/port-ssh", "2222")
            .with("computers/nas/net/local/port-ssh", "22")
            .with("computers/nas/net/mac-address", "AA:BB:CC:DD:EE:FF")
            .with("computers/nas/net/wakeup-delay", "30")
            .with("computers/broken/net/global/port-ssh", "twenty-two");
        Registry::new(store, "computers")
    }

    #[test]
    fn key_layout() {
        assert_eq!(host_key("computers", "nas"), "computers/nas/net/");
        assert_eq!(
            attribute_key("computers", "nas", Some(Scope::Local), PORT_WAKEUP),
            "computers/nas/net/local/port-wakeup"
        );
        assert_eq!(
            attribute_key("computers", "nas", None, MAC_ADDRESS),
            "computers/nas/net/mac-address"
        );
    }

    #[tokio::test]
    async fn host_existence_uses_prefix() {
        let registry = registry();
        assert!(registry.host_known("nas").await);
        assert!(registry.host_known("broken").await);
        assert!(!registry.host_known("na").await);
        assert!(!registry.host_known("desktop").await);
    }

    #[tokio::test]
    async fn scoped_lookups_follow_lan_flag() {
        let registry = registry();
        assert_eq!(
            registry.address("nas", false).await.as_deref(),
            Some("nas.example.com")
        );
        assert_eq!(
            registry.address("nas", true).await.as_deref(),
            Some("192.168.1.20")
        );
        assert_eq!(registry.ssh_port("nas", false).await.unwrap(), Some(2222));
        assert_eq!(registry.ssh_port("nas", true).await.unwrap(), Some(22));
    }

    #[tokio::test]
    async fn unscoped_and_missing_values() {
        let registry = registry();
        assert_eq!(
            registry.mac("nas").await.as_deref(),
            Some("AA:BB:CC:DD:EE:FF")
        );
        assert_eq!(registry.wakeup_delay("nas").await.unwrap(), Some(30));
        assert_eq!(registry.wakeup_port("nas", false).await.unwrap(), None);
        assert_eq!(registry.address("desktop", false).await, None);
    }

    #[tokio::test]
    async fn non_numeric_value_is_corrupt_not_absent() {
        let err = registry().ssh_port("broken", false).await.unwrap_err();
        match err {
            Error::CorruptRegistryValue { key, value } => {
                assert_eq!(key, "computers/broken/net/global/port-ssh");
                assert_eq!(value, "twenty-two");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn hosts_file_flattens_into_keys() {
        let content = r#"
[hosts.nas]
mac-address = "AA:BB:CC:DD:EE:FF"
wakeup-delay = 45

[hosts.nas.global]
ip-address = "nas.example.com"
port-ssh = 2222
port-wakeup = 9

[hosts.nas.local]
ip-address = "192.168.1.20"

[hosts.empty]
"#;
        let registry = Registry::new(
            MemoryStore::from_hosts_toml(content, "computers").unwrap(),
            "computers",
        );
        assert!(registry.host_known("nas").await);
        assert!(registry.host_known("empty").await);
        assert!(!registry.host_known("other").await);
        assert_eq!(registry.wakeup_port("nas", false).await.unwrap(), Some(9));
        assert_eq!(registry.wakeup_port("nas", true).await.unwrap(), None);
        assert_eq!(registry.wakeup_delay("nas").await.unwrap(), Some(45));
        assert_eq!(
            registry.address("nas", true).await.as_deref(),
            Some("192.168.1.20")
        );
        assert_eq!(registry.address("empty", false).await, None);
    }

    #[tokio::test]
    async fn missing_store_program_reads_as_absent() {
        let store = PassStore::new("remote-test-no-such-secret-store");
        assert!(!store.exists("computers/nas/net/").await);
        assert_eq!(store.get("computers/nas/net/mac-address").await, None);
    }

    #[test]
    fn hosts_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts.toml");
        fs::write(&path, "[hosts.box.global]\nip-address = \"10.0.0.5\"\n").unwrap();
        let store = MemoryStore::from_hosts_file(&path, "machines").unwrap();
        assert_eq!(
            store.values.get("machines/box/net/global/ip-address").map(String::as_str),
            Some("10.0.0.5")
        );
        assert!(MemoryStore::from_hosts_file(&dir.path().join("none.toml"), "m").is_err());
    }
}
