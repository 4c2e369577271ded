use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use onetouch_types::{BuildDescriptor, VersionError};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

pub const PROFILES_FILE_NAME: &str = "build.json";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("read {path}: {message}")]
    Io { path: Utf8PathBuf, message: String },

    #[error("parse {path}: {message}")]
    Json { path: Utf8PathBuf, message: String },

    #[error("{path} must contain a JSON object with at least one profile")]
    Empty { path: Utf8PathBuf },

    #[error("unknown config '{key}'; available: {}", available.join(", "))]
    UnknownConfig { key: String, available: Vec<String> },

    #[error("profile '{key}' is invalid: {message}")]
    Invalid { key: String, message: String },

    #[error("profile '{key}' has an invalid version: {source}")]
    Version {
        key: String,
        #[source]
        source: VersionError,
    },
}

/// The parsed contents of `build.json`, in file order.
#[derive(Debug, Clone)]
pub struct ProfileSet {
    path: Utf8PathBuf,
    profiles: Map<String, Value>,
}

pub fn load_profiles(path: &Utf8Path) -> Result<ProfileSet, ProfileError> {
    debug!(path = %path, "loading build profiles");

    let contents = fs::read_to_string(path).map_err(|e| ProfileError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    ProfileSet::from_json(path, &contents)
}

impl ProfileSet {
    pub fn from_json(path: &Utf8Path, contents: &str) -> Result<Self, ProfileError> {
        let value: Value = serde_json::from_str(contents).map_err(|e| ProfileError::Json {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let Value::Object(profiles) = value else {
            return Err(ProfileError::Empty {
                path: path.to_path_buf(),
            });
        };
        if profiles.is_empty() {
            return Err(ProfileError::Empty {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            profiles,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Key of the base profile (the first entry).
    pub fn base_key(&self) -> &str {
        self.profiles
            .keys()
            .next()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Selectable configuration keys: every entry after the base profile.
    pub fn config_keys(&self) -> Vec<&str> {
        self.profiles.keys().skip(1).map(String::as_str).collect()
    }

    /// Resolve a descriptor. `None` selects the base profile on its own.
    pub fn resolve(&self, key: Option<&str>) -> Result<BuildDescriptor, ProfileError> {
        let base_key = self.base_key().to_string();
        let mut merged = self.profiles.get(&base_key).cloned().unwrap_or(Value::Null);

        if let Some(key) = key {
            let overlay = self
                .profiles
                .get(key)
                .filter(|_| key != base_key)
                .ok_or_else(|| ProfileError::UnknownConfig {
                    key: key.to_string(),
                    available: self.config_keys().iter().map(|k| k.to_string()).collect(),
                })?;
            merge_json(&mut merged, overlay);
        }

        let label = key.unwrap_or(&base_key).to_string();
        let mut descriptor: BuildDescriptor =
            serde_json::from_value(merged).map_err(|e| ProfileError::Invalid {
                key: label.clone(),
                message: e.to_string(),
            })?;

        descriptor
            .validate()
            .map_err(|source| ProfileError::Version {
                key: label,
                source,
            })?;

        descriptor.config_key = key.map(str::to_string);
        debug!(
            config = key.unwrap_or("<base>"),
            app_id = %descriptor.app_id,
            version = %descriptor.version,
            "resolved build profile"
        );
        Ok(descriptor)
    }
}

/// Deep-merge `overlay` into `base`. Objects merge key by key; anything else replaces.
pub fn merge_json(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (k, v) in overlay {
                match base.get_mut(k) {
                    Some(existing) => merge_json(existing, v),
                    None => {
                        base.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_replaces_scalars_and_recurses_objects() {
        let mut base = json!({ "a": 1, "nested": { "x": 1, "y": 2 }, "list": [1, 2] });
        let overlay = json!({ "a": 2, "nested": { "y": 3 }, "list": [9] });
        merge_json(&mut base, &overlay);
        assert_eq!(
            base,
            json!({ "a": 2, "nested": { "x": 1, "y": 3 }, "list": [9] })
        );
    }

    #[test]
    fn non_object_root_is_rejected() {
        let err = ProfileSet::from_json(Utf8Path::new("build.json"), "[1, 2]").unwrap_err();
        assert!(matches!(err, ProfileError::Empty { .. }));
    }
}
