use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    Ttl,
    Lru,
    None,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_cache_strategy")]
    pub cache_strategy: CacheStrategy,
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_cache_lru_capacity")]
    pub cache_lru_capacity: usize,
    #[serde(default = "default_kernel_attr_timeout_seconds")]
    pub kernel_attr_timeout_seconds: u64,
    #[serde(default = "default_kernel_entry_timeout_seconds")]
    pub kernel_entry_timeout_seconds: u64,
    /// Base URL of the `nmfs-objectd` instance holding metadata objects
    /// (inode records, dentries, the client registry, lease cache misses).
    #[serde(default = "default_objectd_addr")]
    pub objectd_addr: String,
    /// Base URL of the `nmfs-objectd` instance holding file content. May be
    /// the same address as `objectd_addr` in simple deployments.
    #[serde(default = "default_data_addr")]
    pub data_addr: String,
    #[serde(default = "default_coordinator_addr")]
    pub coordinator_addr: String,
    /// This client's own address, handed to the coordinator so a denied
    /// lease request can report who currently holds it.
    #[serde(default = "default_self_rpc_addr")]
    pub self_rpc_addr: String,
}

fn default_cache_strategy() -> CacheStrategy {
    CacheStrategy::Ttl
}
fn default_cache_ttl_seconds() -> u64 {
    60
}
fn default_cache_lru_capacity() -> usize {
    1000
}
fn default_kernel_attr_timeout_seconds() -> u64 {
    1
}
fn default_kernel_entry_timeout_seconds() -> u64 {
    1
}
fn default_objectd_addr() -> String {
    "http://127.0.0.1:8080".to_string()
}
fn default_data_addr() -> String {
    "http://127.0.0.1:8080".to_string()
}
fn default_coordinator_addr() -> String {
    "http://127.0.0.1:9000".to_string()
}
fn default_self_rpc_addr() -> String {
    "http://127.0.0.1:7000".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_strategy: default_cache_strategy(),
            cache_ttl_seconds: default_cache_ttl_seconds(),
            cache_lru_capacity: default_cache_lru_capacity(),
            kernel_attr_timeout_seconds: default_kernel_attr_timeout_seconds(),
            kernel_entry_timeout_seconds: default_kernel_entry_timeout_seconds(),
            objectd_addr: default_objectd_addr(),
            data_addr: default_data_addr(),
            coordinator_addr: default_coordinator_addr(),
            self_rpc_addr: default_self_rpc_addr(),
        }
    }
}
