use serde::Deserialize;

/// Connection settings for the shared session store. When `url` is unset the
/// server falls back to the in-process store, which is only suitable for
/// single-instance deployments.
#[derive(Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "crate::config::defaults::default_store_op_timeout_ms")]
    pub op_timeout_ms: u64,
    #[serde(default = "crate::config::defaults::default_store_scan_batch")]
    pub scan_batch: usize,
    #[serde(default = "crate::config::defaults::default_store_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            op_timeout_ms: crate::config::defaults::default_store_op_timeout_ms(),
            scan_batch: crate::config::defaults::default_store_scan_batch(),
            cleanup_interval_seconds:
                crate::config::defaults::default_store_cleanup_interval_seconds(),
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The store URL can embed credentials, never log it verbatim.
        f.debug_struct("StoreConfig")
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .field("op_timeout_ms", &self.op_timeout_ms)
            .field("scan_batch", &self.scan_batch)
            .field("cleanup_interval_seconds", &self.cleanup_interval_seconds)
            .finish()
    }
}
