#[cfg(feature = "cli")]
pub mod cli;

use crate::core::version::VersionScheme;
use crate::utils::error::{BuildError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "hybrid-build.toml";

/// Optional per-project overrides read from `hybrid-build.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub layout: ProjectLayout,
    pub version: VersionScheme,
}

/// Where the tool finds and writes project files, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectLayout {
    pub build_dir: String,
    pub app_config_dir: String,
    pub index: String,
    pub cordova_config: String,
    pub pwa_script: String,
    pub www_dir: String,
    pub output_dir: String,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            build_dir: "_build".to_string(),
            app_config_dir: "src/app/config".to_string(),
            index: "src/index.html".to_string(),
            cordova_config: "config.xml".to_string(),
            pwa_script: "src/pwa.js".to_string(),
            www_dir: "www".to_string(),
            output_dir: "bin".to_string(),
        }
    }
}

impl ProjectLayout {
    pub fn build_dir(&self) -> PathBuf {
        PathBuf::from(&self.build_dir)
    }

    pub fn settings(&self) -> PathBuf {
        self.build_dir().join("settings.json")
    }

    pub fn endpoints(&self) -> PathBuf {
        self.build_dir().join("json").join("endpoints.json")
    }

    pub fn whitelist(&self) -> PathBuf {
        self.build_dir().join("json").join("whitelist.json")
    }

    pub fn versions(&self) -> PathBuf {
        self.build_dir().join("json").join("versions.json")
    }

    pub fn configs_dir(&self) -> PathBuf {
        self.build_dir().join("configs")
    }

    pub fn app_config_dir(&self) -> PathBuf {
        PathBuf::from(&self.app_config_dir)
    }

    pub fn index(&self) -> PathBuf {
        PathBuf::from(&self.index)
    }

    pub fn cordova_config(&self) -> PathBuf {
        PathBuf::from(&self.cordova_config)
    }

    pub fn pwa_script(&self) -> PathBuf {
        PathBuf::from(&self.pwa_script)
    }

    pub fn www_dir(&self) -> PathBuf {
        PathBuf::from(&self.www_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }
}

impl BuildConfig {
    /// Loads `explicit` if given, otherwise `hybrid-build.toml` under `root`
    /// when present, otherwise the defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => root.join(path),
            None => {
                let candidate = root.join(CONFIG_FILE_NAME);
                if !candidate.exists() {
                    tracing::debug!("no {} found, using default layout", CONFIG_FILE_NAME);
                    return Ok(Self::default());
                }
                candidate
            }
        };

        tracing::debug!("loading build configuration from {}", path.display());
        Self::from_file(&path)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| BuildError::file(path.as_ref().display().to_string(), e))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| BuildError::config(format!("TOML parsing error: {}", e)))
    }

    /// Replaces `${VAR}` with the value of the environment variable; unknown
    /// variables are left untouched.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BuildError::config(e.to_string()))?;

        let result = re.replace_all(content, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for BuildConfig {
    fn validate(&self) -> Result<()> {
        let layout = &self.layout;
        for (field, value) in [
            ("layout.build_dir", &layout.build_dir),
            ("layout.app_config_dir", &layout.app_config_dir),
            ("layout.index", &layout.index),
            ("layout.cordova_config", &layout.cordova_config),
            ("layout.pwa_script", &layout.pwa_script),
            ("layout.www_dir", &layout.www_dir),
            ("layout.output_dir", &layout.output_dir),
        ] {
            validation::validate_path(field, value)?;
        }

        self.version.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = BuildConfig::from_toml_str("").unwrap();

        assert_eq!(config.layout.index, "src/index.html");
        assert_eq!(config.version.minor_digits, 2);
        assert_eq!(config.version.patch_digits, 3);
        assert_eq!(
            config.layout.endpoints(),
            PathBuf::from("_build/json/endpoints.json")
        );
    }

    #[test]
    fn test_partial_overrides() {
        let config = BuildConfig::from_toml_str(
            r#"
[layout]
build_dir = "build-kit"

[version]
patch_digits = 2
"#,
        )
        .unwrap();

        assert_eq!(config.layout.settings(), PathBuf::from("build-kit/settings.json"));
        assert_eq!(config.layout.cordova_config, "config.xml");
        assert_eq!(config.version.minor_digits, 2);
        assert_eq!(config.version.patch_digits, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("HBK_TEST_OUTPUT_DIR", "dist/apk");

        let config = BuildConfig::from_toml_str(
            r#"
[layout]
output_dir = "${HBK_TEST_OUTPUT_DIR}"
"#,
        )
        .unwrap();
        assert_eq!(config.layout.output_dir, "dist/apk");

        std::env::remove_var("HBK_TEST_OUTPUT_DIR");
    }

    #[test]
    fn test_invalid_digit_width_fails_validation() {
        let config = BuildConfig::from_toml_str("[version]\nminor_digits = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_without_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = BuildConfig::load(temp_dir.path(), None).unwrap();
        assert_eq!(config.layout.build_dir, "_build");
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[layout]\nindex = \"www-src/index.html\"\n")
            .unwrap();

        let config = BuildConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.layout.index(), PathBuf::from("www-src/index.html"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = BuildConfig::load(temp_dir.path(), Some(Path::new("missing.toml")));
        assert!(matches!(result, Err(BuildError::FileError { .. })));
    }
}
