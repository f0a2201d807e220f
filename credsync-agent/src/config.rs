//! Runtime configuration for the synchronizer.

use std::time::Duration;

const DEFAULT_SECRET_NAME: &str = "gcr-json-key";
const DEFAULT_REGISTRY_HOSTS: [&str; 4] = ["gcr.io", "asia.gcr.io", "eu.gcr.io", "us.gcr.io"];
const DEFAULT_PARTITION: &str = "default";
const DEFAULT_SERVICE_ACCOUNT: &str = "default";
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_FAN_OUT: usize = 4;

/// Configuration of a [`crate::sync::CredentialSynchronizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Well-known name of the pull secret, shared by every partition.
    pub secret_name: String,
    /// Registry hosts credentialed by the pull secret.
    pub registry_hosts: Vec<String>,
    /// The only partition allowed to originate new pull secrets.
    pub default_partition: String,
    /// Execution identity patched to reference the pull secret.
    pub service_account: String,
    /// Fixed delay between retry attempts.
    pub retry_interval: Duration,
    /// Upper bound on partitions processed concurrently.
    pub fan_out: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            secret_name: DEFAULT_SECRET_NAME.to_string(),
            registry_hosts: DEFAULT_REGISTRY_HOSTS.map(String::from).to_vec(),
            default_partition: DEFAULT_PARTITION.to_string(),
            service_account: DEFAULT_SERVICE_ACCOUNT.to_string(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            fan_out: DEFAULT_FAN_OUT,
        }
    }
}

impl SyncConfig {
    /// Build the configuration from the process environment.
    ///
    /// * `CREDSYNC_SECRET_NAME` overrides the pull-secret name.
    /// * `CREDSYNC_REGISTRY_HOSTS` is a comma-separated host list.
    /// * `CREDSYNC_DEFAULT_PARTITION` overrides the originating partition.
    /// * `CREDSYNC_SERVICE_ACCOUNT` overrides the patched identity.
    /// * `CREDSYNC_RETRY_INTERVAL_SECS` overrides the retry delay.
    /// * `CREDSYNC_FAN_OUT` overrides the concurrency bound.
    ///
    /// Unset, empty, or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(name) = non_empty(lookup("CREDSYNC_SECRET_NAME")) {
            config.secret_name = name;
        }

        if let Some(hosts) = non_empty(lookup("CREDSYNC_REGISTRY_HOSTS")) {
            let hosts: Vec<String> = hosts
                .split(',')
                .map(str::trim)
                .filter(|host| !host.is_empty())
                .map(String::from)
                .collect();
            if !hosts.is_empty() {
                config.registry_hosts = hosts;
            }
        }

        if let Some(partition) = non_empty(lookup("CREDSYNC_DEFAULT_PARTITION")) {
            config.default_partition = partition;
        }

        if let Some(account) = non_empty(lookup("CREDSYNC_SERVICE_ACCOUNT")) {
            config.service_account = account;
        }

        if let Some(seconds) = lookup("CREDSYNC_RETRY_INTERVAL_SECS") {
            if let Ok(seconds) = seconds.trim().parse::<u64>() {
                config.retry_interval = Duration::from_secs(seconds.max(1));
            }
        }

        if let Some(fan_out) = lookup("CREDSYNC_FAN_OUT") {
            if let Ok(fan_out) = fan_out.trim().parse::<usize>() {
                config.fan_out = fan_out.max(1);
            }
        }

        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
