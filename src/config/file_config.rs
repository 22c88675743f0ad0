use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Optional TOML config file. Every field is optional; anything set here
/// overrides the corresponding command line argument.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub db_dir: Option<PathBuf>,
    pub port: Option<u16>,
    pub poll_interval_secs: Option<u64>,
}

impl FileConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "port = 9000").unwrap();

        let config = FileConfig::load(&path).unwrap();
        assert_eq!(config.port, Some(9000));
        assert_eq!(config.db_dir, None);
        assert_eq!(config.poll_interval_secs, None);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(FileConfig::load("/no/such/config.toml").is_err());
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = ").unwrap();
        assert!(FileConfig::load(&path).is_err());
    }
}
