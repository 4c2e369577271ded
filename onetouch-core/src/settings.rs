//! Clap-free settings for the pipelines.

use camino::{Utf8Path, Utf8PathBuf};

/// Project layout. Every path is relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSettings {
    pub platforms: Utf8PathBuf,
    pub web: Utf8PathBuf,
    pub assets: Utf8PathBuf,
    pub temp: Utf8PathBuf,
    pub profiles: Utf8PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            platforms: Utf8PathBuf::from("platforms"),
            web: Utf8PathBuf::from("dist"),
            assets: Utf8PathBuf::from("bin/assets"),
            temp: Utf8PathBuf::from("temp"),
            profiles: Utf8PathBuf::from(onetouch_profiles::PROFILES_FILE_NAME),
        }
    }
}

/// External programs. Each value is passed to the shell verbatim and may carry its own
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    pub bundler: String,
    pub scaffold: String,
    pub gradle: String,
    pub apksigner: String,
    pub xcodebuild: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            bundler: "vite".to_string(),
            scaffold: "npx".to_string(),
            gradle: "./gradlew".to_string(),
            apksigner: "apksigner".to_string(),
            xcodebuild: "xcodebuild".to_string(),
        }
    }
}

/// Settings shared by every pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreSettings {
    pub project_root: Utf8PathBuf,
    pub paths: PathSettings,
    pub tools: ToolSettings,

    /// Xcode workspace archived by the iOS build.
    pub ios_workspace: String,

    /// Skip the bundler invocation; branding overlays are still staged.
    pub skip_bundler: bool,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            project_root: Utf8PathBuf::from("."),
            paths: PathSettings::default(),
            tools: ToolSettings::default(),
            ios_workspace: "App.xcworkspace".to_string(),
            skip_bundler: false,
        }
    }
}

impl CoreSettings {
    /// Resolve a project-relative path.
    pub fn abs(&self, rel: &Utf8Path) -> Utf8PathBuf {
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.project_root.join(rel)
        }
    }

    pub fn profiles_path(&self) -> Utf8PathBuf {
        self.abs(&self.paths.profiles)
    }
}
