//! Configuration loading and validation

mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> Result<ChimeConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {:?}", path))?;
    let config: ChimeConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config {:?}", path))?;
    config.validate()?;
    Ok(config)
}

/// Load configuration, falling back to defaults when the file does not exist
pub fn load_or_default(path: &Path) -> Result<ChimeConfig> {
    if path.exists() {
        load_config(path)
    } else {
        log::info!("no config at {:?}, using defaults", path);
        Ok(ChimeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_minimal_config() {
        let yaml = r#"
audio:
  sample_rate: 48000

master:
  volume: 0.7
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.master.volume, 0.7);
        assert_eq!(config.keyboard.octave, 4);
    }

    #[test]
    fn test_load_invalid_config() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"master:\n  volume: 2.0\n").unwrap();

        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_load_malformed_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"audio: [not, a, map").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        assert!(load_config(&path).is_err());
        let config = load_or_default(&path).unwrap();
        assert_eq!(config.audio.sample_rate, 44100);
    }

    #[test]
    fn test_example_config_is_valid() {
        let config: ChimeConfig = serde_yaml::from_str(include_str!("../../chime.example.yaml")).unwrap();
        assert!(config.validate().is_ok());
    }
}
