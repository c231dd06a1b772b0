//! Default config file location.

use std::path::PathBuf;

/// `<platform config dir>/odas-bridge/config.json`.
///
/// The base comes from [`dirs::config_dir`], which honours
/// `$XDG_CONFIG_HOME` on Linux. Without a resolvable home the path is
/// relative to the working directory.
pub fn get_default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("odas-bridge")
        .join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path_layout() {
        let path = get_default_config_path();
        assert!(path.ends_with("odas-bridge/config.json"));
    }
}
