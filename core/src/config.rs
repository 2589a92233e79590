//! Generic TOML config loading, generalizing the teacher's
//! `client/src/config.rs::load_config` to any `Deserialize + Default`
//! config type so `client`, `server`, and `coordinator` all load their
//! own config the same way.

use serde::de::DeserializeOwned;
use std::path::Path;

/// Load `T` from `path`, falling back to `T::default()` (with a warning)
/// if the file is missing or fails to parse. Never fails outright: a
/// filesystem daemon shouldn't refuse to start over a bad config file
/// when sane defaults exist.
pub fn load_config<T: DeserializeOwned + Default>(path: impl AsRef<Path>) -> T {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                T::default()
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "config file not found, using defaults");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Default, PartialEq)]
    struct Sample {
        #[serde(default)]
        name: String,
        #[serde(default)]
        count: u32,
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let cfg: Sample = load_config("/nonexistent/path/for/sure.toml");
        assert_eq!(cfg, Sample::default());
    }

    #[test]
    fn malformed_file_falls_back_to_default() {
        let dir = std::env::temp_dir().join(format!("nmfs-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "this is not valid toml [[[").unwrap();
        let cfg: Sample = load_config(&path);
        assert_eq!(cfg, Sample::default());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn valid_file_parses() {
        let dir = std::env::temp_dir().join(format!("nmfs-config-test2-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("good.toml");
        std::fs::write(&path, "name = \"x\"\ncount = 3\n").unwrap();
        let cfg: Sample = load_config(&path);
        assert_eq!(cfg.name, "x");
        assert_eq!(cfg.count, 3);
        std::fs::remove_dir_all(&dir).ok();
    }
}
