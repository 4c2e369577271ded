use serde::{Deserialize, Serialize};

/// Native platform targeted by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How child processes treat stdio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdioMode {
    #[default]
    Inherit,
    Ignore,
    Pipe,
}

/// Normalized per-invocation options, built once at the CLI boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOptions {
    pub platform: Platform,
    pub release: bool,
    pub config: Option<String>,
    pub stdio: StdioMode,
}

impl CommandOptions {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            release: false,
            config: None,
            stdio: StdioMode::default(),
        }
    }

    pub fn is_android(&self) -> bool {
        self.platform == Platform::Android
    }

    pub fn is_ios(&self) -> bool {
        self.platform == Platform::Ios
    }

    /// `release` or `debug`, as used in Gradle output paths.
    pub fn build_type(&self) -> &'static str {
        if self.release { "release" } else { "debug" }
    }

    /// `Release` or `Debug`, as used for Xcode configurations.
    pub fn configuration(&self) -> &'static str {
        if self.release { "Release" } else { "Debug" }
    }

    /// Flags forwarded to the scaffolding tool after `--`.
    pub fn forwarded_flags(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.release {
            out.push("--release".to_string());
        }
        if let Some(config) = &self.config {
            out.push("--config".to_string());
            out.push(config.clone());
        }
        out.push(format!("--{}", self.platform));
        out.push("--platform".to_string());
        out.push(self.platform.to_string());
        out
    }
}
