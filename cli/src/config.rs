use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub const DEFAULT_API_BASE: &str = "https://www.themealdb.com/api/json/v1/1/";

pub struct Config {
    pub db_path: PathBuf,
    pub api_base: String,
}

impl Config {
    /// Resolve paths, preferring explicit overrides over the platform data dir.
    pub fn load(db_override: Option<PathBuf>, api_base: Option<String>) -> Result<Self> {
        let db_path = match db_override {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory: {}", parent.display())
                    })?;
                }
                path
            }
            None => {
                let proj_dirs = ProjectDirs::from("", "", "recipebox")
                    .context("Could not determine home directory")?;
                let data_dir = proj_dirs.data_dir().to_path_buf();
                std::fs::create_dir_all(&data_dir).with_context(|| {
                    format!("Failed to create data directory: {}", data_dir.display())
                })?;
                data_dir.join("recipebox.db")
            }
        };

        Ok(Config {
            db_path,
            api_base: normalize_base(api_base.as_deref().unwrap_or(DEFAULT_API_BASE)),
        })
    }
}

/// Endpoint paths are joined onto the base, so it must end with a slash.
fn normalize_base(base: &str) -> String {
    let trimmed = base.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_override_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("box.db");
        let config = Config::load(Some(path.clone()), None).unwrap();
        assert_eq!(config.db_path, path);
        assert!(dir.path().join("nested").is_dir());
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_api_base_gets_trailing_slash() {
        assert_eq!(
            normalize_base("http://localhost:8080/api"),
            "http://localhost:8080/api/"
        );
        assert_eq!(normalize_base(DEFAULT_API_BASE), DEFAULT_API_BASE);
    }
}
