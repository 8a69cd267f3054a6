//! Built-in providers.

use crate::provider::{ContextMap, ContextProvider, ProviderError};

/// Name under which [`DefaultProvider`] is registered.
pub const DEFAULT_PROVIDER_NAME: &str = "default";

/// Process and host facts attached to every record.
///
/// Keys: `os`, `os_family`, `arch`, `pid`, `thread`, `host_id`.
#[derive(Debug, Clone)]
pub struct DefaultProvider {
    host_id: String,
}

impl DefaultProvider {
    pub fn new() -> Self {
        Self {
            host_id: get_host_id(),
        }
    }
}

impl Default for DefaultProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextProvider for DefaultProvider {
    fn provide(&self) -> Result<ContextMap, ProviderError> {
        let thread = std::thread::current();
        let mut map = ContextMap::new();
        map.insert("os".to_string(), std::env::consts::OS.to_string());
        map.insert("os_family".to_string(), std::env::consts::FAMILY.to_string());
        map.insert("arch".to_string(), std::env::consts::ARCH.to_string());
        map.insert("pid".to_string(), std::process::id().to_string());
        map.insert(
            "thread".to_string(),
            thread.name().unwrap_or("unnamed").to_string(),
        );
        map.insert("host_id".to_string(), self.host_id.clone());
        Ok(map)
    }
}

/// Tags every record with one run identifier, fixed at construction.
#[derive(Debug, Clone)]
pub struct RunIdProvider {
    run_id: String,
}

impl RunIdProvider {
    pub fn new() -> Self {
        Self {
            run_id: generate_run_id(),
        }
    }

    pub fn with_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl Default for RunIdProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextProvider for RunIdProvider {
    fn provide(&self) -> Result<ContextMap, ProviderError> {
        Ok(ContextMap::from([("run_id".to_string(), self.run_id.clone())]))
    }
}

/// Generate a unique run ID.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    // Shorten to first 12 hex chars for readability
    format!("run-{}", &uuid[..12])
}

/// Get the host ID.
///
/// Uses machine-id on Linux or generates a stable ID from hostname.
pub fn get_host_id() -> String {
    if let Ok(id) = std::fs::read_to_string("/etc/machine-id") {
        if let Some(prefix) = id.trim().get(..8) {
            return format!("host-{prefix}");
        }
    }

    if let Ok(hostname) = std::env::var("HOSTNAME") {
        return format!("host-{:08x}", hash_string(&hostname) as u32);
    }

    // Last resort: random
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("host-{}", &uuid[..8])
}

fn hash_string(s: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}
