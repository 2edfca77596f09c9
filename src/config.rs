use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub server: ServerConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatasetConfig {
    pub locality_dir: PathBuf,
    pub locality_area_dir: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            locality_dir: PathBuf::from("themes/type=locality"),
            locality_area_dir: PathBuf::from("themes/type=locality_area"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:5070".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QueryConfig {
    /// Half-width in degrees of the bbox scanned by nearby lookups
    pub nearby_radius: f64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            nearby_radius: 0.003,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:5070");
        assert_eq!(config.query.nearby_radius, 0.003);
        assert_eq!(
            config.dataset.locality_dir,
            PathBuf::from("themes/type=locality")
        );
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            r#"
            [dataset]
            locality_area_dir = "/data/areas"

            [query]
            nearby_radius = 0.01
            "#,
        )
        .unwrap();
        assert_eq!(config.dataset.locality_area_dir, PathBuf::from("/data/areas"));
        assert_eq!(
            config.dataset.locality_dir,
            PathBuf::from("themes/type=locality")
        );
        assert_eq!(config.query.nearby_radius, 0.01);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locus.toml");
        fs::write(&path, "[server]\nlisten = \"0.0.0.0:8080\"\n").unwrap();

        let config = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:8080");

        assert!(Config::load_from_file(dir.path().join("missing.toml")).is_err());
    }
}
