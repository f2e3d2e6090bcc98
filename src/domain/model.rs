use crate::utils::error::BuildError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Browser,
    Dev,
    Testing,
    Staging,
    Production,
}

impl Environment {
    pub const ALL: [Environment; 5] = [
        Environment::Browser,
        Environment::Dev,
        Environment::Testing,
        Environment::Staging,
        Environment::Production,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Browser => "browser",
            Environment::Dev => "dev",
            Environment::Testing => "testing",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    /// Local targets have no fixed backend and no real version history.
    pub fn is_local(&self) -> bool {
        matches!(self, Environment::Browser | Environment::Dev)
    }

    /// Environments shipped from signed release builds.
    pub fn is_release(&self) -> bool {
        matches!(self, Environment::Staging | Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Environment::ALL
            .into_iter()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| BuildError::UnknownEnvironment(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Pwa,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Pwa => "pwa",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            "pwa" => Ok(Platform::Pwa),
            other => Err(BuildError::UnknownPlatform(other.to_string())),
        }
    }
}

/// `_build/settings.json`. Unknown keys survive a rewrite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub package_name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Environment name to backend URL.
pub type EndpointMap = HashMap<String, String>;

/// Environment name to `major.minor.patch`.
pub type VersionMap = HashMap<String, String>;

/// One entry of the whitelist document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistRules {
    #[serde(default)]
    pub default_src: Vec<String>,
    #[serde(default)]
    pub style_src: Vec<String>,
    #[serde(default)]
    pub frame_src: Vec<String>,
    #[serde(default)]
    pub img_src: Vec<String>,
    #[serde(default)]
    pub script_src: Vec<String>,
    #[serde(default)]
    pub connect_src: Vec<String>,
}

/// Keyed by environment name, plus a `default` entry applied to all.
pub type Whitelist = HashMap<String, WhitelistRules>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDetails {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub android_version_code: u32,
    pub minor_digits: u32,
    pub patch_digits: u32,
}

impl VersionDetails {
    pub fn version(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    /// Zero-padded form used in artifact names, e.g. `1.02.003`.
    pub fn formatted_version(&self) -> String {
        format!(
            "{}.{:0minor$}.{:0patch$}",
            self.major,
            self.minor,
            self.patch,
            minor = self.minor_digits as usize,
            patch = self.patch_digits as usize
        )
    }
}
