use crate::version::{BuildVersion, VersionError};
use serde::{Deserialize, Serialize};

/// Canonical per-invocation app identity and version record.
///
/// Loaded once from `build.json` and borrowed by every stage. Nothing writes
/// back to it; identity flows one way into the native metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDescriptor {
    pub app_id: String,
    pub app_name: String,
    pub version: BuildVersion,
    pub min_sdk_version: u32,
    pub compile_sdk_version: u32,
    pub target_sdk_version: u32,
    pub custom_url_scheme: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_ios_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ios_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios_development_team: Option<String>,

    /// Profile key this descriptor was resolved from (`None` for the default profile).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_key: Option<String>,

    #[serde(default)]
    pub android: AndroidProfile,
    #[serde(default)]
    pub ios: IosProfile,
}

impl BuildDescriptor {
    pub fn validate(&self) -> Result<(), VersionError> {
        self.version.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AndroidProfile {
    #[serde(default)]
    pub build_options: AndroidBuildOptions,
}

/// Release signing inputs. All four must be present for a release build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AndroidBuildOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keystore_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keystore_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keystore_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keystore_alias_password: Option<String>,
}

impl AndroidBuildOptions {
    /// Names of the signing inputs that are unset or empty.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("keystorePath", &self.keystore_path),
            ("keystorePassword", &self.keystore_password),
            ("keystoreAlias", &self.keystore_alias),
            ("keystoreAliasPassword", &self.keystore_alias_password),
        ]
        .into_iter()
        .filter(|(_, v)| v.as_deref().is_none_or(str::is_empty))
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IosProfile {
    /// Xcode scheme to archive. Falls back to `App`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

impl IosProfile {
    pub fn scheme_or_default(&self) -> &str {
        self.scheme.as_deref().unwrap_or("App")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_profile() {
        let json = serde_json::json!({
            "appId": "uk.co.ronoc.watchr",
            "appName": "watchR",
            "version": { "major": 1, "minor": 2, "patch": 3, "build": 4 },
            "minSdkVersion": 23,
            "compileSdkVersion": 34,
            "targetSdkVersion": 34,
            "customUrlScheme": "watchr",
            "minIosVersion": "14.0",
            "android": { "buildOptions": { "keystorePath": "release.jks" } }
        });
        let d: BuildDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(d.app_id, "uk.co.ronoc.watchr");
        assert_eq!(d.version.version_code(), 1_020_304);
        assert_eq!(d.min_ios_version.as_deref(), Some("14.0"));
        assert_eq!(
            d.android.build_options.keystore_path.as_deref(),
            Some("release.jks")
        );
        assert_eq!(d.ios.scheme_or_default(), "App");
    }

    #[test]
    fn missing_signing_inputs_are_listed_in_order() {
        let opts = AndroidBuildOptions {
            keystore_path: Some("a.jks".into()),
            keystore_password: Some(String::new()),
            keystore_alias: None,
            keystore_alias_password: Some("pw".into()),
        };
        assert_eq!(opts.missing(), vec!["keystorePassword", "keystoreAlias"]);
    }
}
