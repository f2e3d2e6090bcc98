//! Android version codes derived from semantic versions.
//!
//! The code is `major * 10^(minor_digits + patch_digits) + minor * 10^patch_digits + patch`,
//! so with the default widths `1.2.3` becomes `102003`. Minor and patch must
//! fit their widths, otherwise a later version could map to a smaller code.

use crate::domain::model::{Environment, VersionDetails, VersionMap};
use crate::utils::error::{BuildError, Result};
use crate::utils::validation::{self, Validate};
use semver::Version;
use serde::{Deserialize, Serialize};

/// Largest `versionCode` the Play Store accepts.
pub const MAX_ANDROID_VERSION_CODE: u64 = 2_100_000_000;

/// Version reported for local environments, which are never published.
pub const LOCAL_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionScheme {
    pub minor_digits: u32,
    pub patch_digits: u32,
}

impl Default for VersionScheme {
    fn default() -> Self {
        Self {
            minor_digits: 2,
            patch_digits: 3,
        }
    }
}

impl Validate for VersionScheme {
    fn validate(&self) -> Result<()> {
        validation::validate_range("version.minor_digits", self.minor_digits, 1, 4)?;
        validation::validate_range("version.patch_digits", self.patch_digits, 1, 4)?;
        Ok(())
    }
}

impl VersionScheme {
    pub fn parse(&self, version: &str) -> Result<VersionDetails> {
        let parsed = Version::parse(version.trim()).map_err(|e| BuildError::VersionError {
            version: version.to_string(),
            reason: e.to_string(),
        })?;

        let android_version_code = self.version_code(&parsed)?;
        Ok(VersionDetails {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            android_version_code,
            minor_digits: self.minor_digits,
            patch_digits: self.patch_digits,
        })
    }

    pub fn version_code(&self, version: &Version) -> Result<u32> {
        let invalid = |reason: String| BuildError::VersionError {
            version: version.to_string(),
            reason,
        };

        let minor_limit = 10u64.pow(self.minor_digits);
        let patch_limit = 10u64.pow(self.patch_digits);

        if version.minor >= minor_limit {
            return Err(invalid(format!(
                "minor must have at most {} digit(s)",
                self.minor_digits
            )));
        }
        if version.patch >= patch_limit {
            return Err(invalid(format!(
                "patch must have at most {} digit(s)",
                self.patch_digits
            )));
        }

        let code = version
            .major
            .checked_mul(minor_limit * patch_limit)
            .and_then(|major| major.checked_add(version.minor * patch_limit + version.patch))
            .filter(|code| *code <= MAX_ANDROID_VERSION_CODE)
            .ok_or_else(|| {
                invalid(format!(
                    "version code would exceed {}",
                    MAX_ANDROID_VERSION_CODE
                ))
            })?;

        u32::try_from(code).map_err(|e| invalid(e.to_string()))
    }

    /// Published environments read `versions`; local ones are pinned to
    /// [`LOCAL_VERSION`].
    pub fn details_for(&self, env: Environment, versions: &VersionMap) -> Result<VersionDetails> {
        if env.is_local() {
            return self.parse(LOCAL_VERSION);
        }

        let version = versions
            .get(env.as_str())
            .ok_or_else(|| BuildError::MissingConfigError {
                field: format!("versions.{}", env),
            })?;
        self.parse(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn code(version: &str) -> u32 {
        VersionScheme::default()
            .parse(version)
            .unwrap()
            .android_version_code
    }

    #[test]
    fn test_default_widths() {
        assert_eq!(code("1.0.0"), 100000);
        assert_eq!(code("1.2.3"), 102003);
        assert_eq!(code("2.10.999"), 210999);
        assert_eq!(code("0.0.1"), 1);
    }

    #[test]
    fn test_codes_increase_with_versions() {
        let mut versions = Vec::new();
        for major in [0u64, 1, 2, 9, 10, 123, 20999] {
            for minor in [0u64, 1, 9, 10, 99] {
                for patch in [0u64, 1, 42, 999] {
                    versions.push(Version::new(major, minor, patch));
                }
            }
        }
        versions.sort();

        let scheme = VersionScheme::default();
        let codes: Vec<u32> = versions
            .iter()
            .map(|v| scheme.version_code(v).unwrap())
            .collect();

        for pair in codes.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
        assert!(codes.iter().all(|c| u64::from(*c) <= MAX_ANDROID_VERSION_CODE));
    }

    #[test]
    fn test_rejects_codes_above_maximum() {
        let scheme = VersionScheme::default();
        assert_eq!(
            u64::from(scheme.version_code(&Version::new(21000, 0, 0)).unwrap()),
            MAX_ANDROID_VERSION_CODE
        );
        assert!(scheme.version_code(&Version::new(21000, 0, 1)).is_err());
        assert!(scheme.version_code(&Version::new(u64::MAX, 0, 0)).is_err());
    }

    #[test]
    fn test_rejects_segments_wider_than_configured() {
        let scheme = VersionScheme::default();
        assert!(scheme.parse("1.100.0").is_err());
        assert!(scheme.parse("1.0.1000").is_err());
    }

    #[test]
    fn test_custom_widths() {
        let scheme = VersionScheme {
            minor_digits: 1,
            patch_digits: 2,
        };
        let details = scheme.parse("3.4.5").unwrap();
        assert_eq!(details.android_version_code, 3405);
        assert_eq!(details.formatted_version(), "3.4.05");
    }

    #[test]
    fn test_rejects_malformed_versions() {
        let scheme = VersionScheme::default();
        assert!(matches!(
            scheme.parse("1.2"),
            Err(BuildError::VersionError { .. })
        ));
        assert!(scheme.parse("one.two.three").is_err());
    }

    #[test]
    fn test_local_environments_are_pinned() {
        let scheme = VersionScheme::default();
        let versions = HashMap::from([("dev".to_string(), "9.9.9".to_string())]);

        for env in [Environment::Browser, Environment::Dev] {
            let details = scheme.details_for(env, &versions).unwrap();
            assert_eq!(details.version(), "1.0.0");
            assert_eq!(details.android_version_code, 100000);
        }
    }

    #[test]
    fn test_published_environments_read_versions() {
        let scheme = VersionScheme::default();
        let versions = HashMap::from([("staging".to_string(), "2.3.14".to_string())]);

        let details = scheme.details_for(Environment::Staging, &versions).unwrap();
        assert_eq!(details.version(), "2.3.14");
        assert_eq!(details.android_version_code, 203014);

        assert!(matches!(
            scheme.details_for(Environment::Production, &versions),
            Err(BuildError::MissingConfigError { .. })
        ));
    }
}
