//! JSON persistence for harvested records

use crate::proxy::models::Proxy;
use crate::Result;
use std::fs;
use std::path::Path;

/// Write records as a pretty-printed JSON array, creating parent directories
pub fn save_records<P: AsRef<Path>>(proxies: &[Proxy], path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(proxies)?;
    fs::write(path, content)?;
    Ok(())
}

pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<Proxy>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
