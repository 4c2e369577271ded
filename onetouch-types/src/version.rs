use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest version code the Play Store accepts.
pub const MAX_VERSION_CODE: u64 = 2_100_000_000;

/// Canonical `{major, minor, patch, build}` tuple.
///
/// Both platforms derive their version metadata from this one value:
/// - Android `versionCode` = `major*1_000_000 + minor*10_000 + patch*100 + build`
/// - Android `versionName` and iOS `CFBundleShortVersionString` = `"major.minor.patch"`
/// - iOS build number = the Android version code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("version component {component} = {value} must be below 100")]
    ComponentOutOfRange { component: &'static str, value: u32 },

    #[error("version code {code} exceeds the maximum of {MAX_VERSION_CODE}")]
    CodeTooLarge { code: u64 },
}

impl BuildVersion {
    pub const fn new(major: u32, minor: u32, patch: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
        }
    }

    /// Check that every lower component fits in two decimal digits, so that
    /// distinct tuples never share a version code.
    pub fn validate(&self) -> Result<(), VersionError> {
        for (component, value) in [
            ("minor", self.minor),
            ("patch", self.patch),
            ("build", self.build),
        ] {
            if value >= 100 {
                return Err(VersionError::ComponentOutOfRange { component, value });
            }
        }

        let code = self.raw_code();
        if code > MAX_VERSION_CODE {
            return Err(VersionError::CodeTooLarge { code });
        }
        Ok(())
    }

    /// Android `versionCode`. Callers are expected to have validated the tuple.
    pub fn version_code(&self) -> u64 {
        self.raw_code()
    }

    /// Android `versionName`, also used as the iOS marketing version.
    pub fn version_name(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    fn raw_code(&self) -> u64 {
        u64::from(self.major) * 1_000_000
            + u64::from(self.minor) * 10_000
            + u64::from(self.patch) * 100
            + u64::from(self.build)
    }
}

impl std::fmt::Display for BuildVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{} ({})",
            self.major, self.minor, self.patch, self.build
        )
    }
}
