//! Line-oriented CocoaPods Podfile edits.

use crate::error::{EditError, EditResult};
use std::cmp::Ordering;

const PLATFORM_PREFIX: &str = "platform :ios,";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Podfile {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl Podfile {
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            trailing_newline: text.ends_with('\n'),
        }
    }

    /// True if any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }

    /// Insert `line` directly after the first line containing `marker`.
    pub fn insert_after_marker(&mut self, marker: &str, line: &str) -> EditResult<()> {
        let idx = self
            .lines
            .iter()
            .position(|l| l.contains(marker))
            .ok_or_else(|| EditError::MarkerMissing {
                marker: marker.to_string(),
            })?;
        self.lines.insert(idx + 1, line.to_string());
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }
}

/// Rewrite every `platform :ios, 'X'` declaration to `min` when `X` is lower.
///
/// Returns `None` when there is nothing to do: no declaration, an unparsable version, or a
/// declaration that already meets the floor.
pub fn raise_platform_floor(src: &str, min: &str) -> Option<String> {
    parse_version(min)?;

    let lower = |v: &str| compare_versions(v, min) == Some(Ordering::Less);
    let mut changed = false;
    let mut out = String::with_capacity(src.len());

    for line in src.split_inclusive('\n') {
        match platform_version(line) {
            Some((start, end)) if lower(&line[start..end]) => {
                out.push_str(&line[..start]);
                out.push_str(min);
                out.push_str(&line[end..]);
                changed = true;
            }
            _ => out.push_str(line),
        }
    }

    changed.then_some(out)
}

/// Byte range of the quoted version in a `platform :ios, 'X'` line.
fn platform_version(line: &str) -> Option<(usize, usize)> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return None;
    }
    let at = line.find(PLATFORM_PREFIX)?;
    let rest = &line[at + PLATFORM_PREFIX.len()..];
    let quote_at = rest.find(|c: char| !c.is_whitespace())?;
    let quote = rest[quote_at..].chars().next()?;
    if quote != '\'' && quote != '"' {
        return None;
    }
    let start = at + PLATFORM_PREFIX.len() + quote_at + 1;
    let len = line[start..].find(quote)?;
    Some((start, start + len))
}

fn parse_version(v: &str) -> Option<Vec<u64>> {
    let v = v.trim();
    if v.is_empty() {
        return None;
    }
    v.split('.').map(|p| p.parse().ok()).collect()
}

/// Component-wise comparison of dotted versions; missing components count as zero.
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let a = parse_version(a)?;
    let b = parse_version(b)?;
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return Some(other),
        }
    }
    Some(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PODFILE: &str = concat!(
        "require_relative '../../node_modules/@capacitor/ios/scripts/pods_helpers'\n",
        "\n",
        "platform :ios, '13.0'\n",
        "use_frameworks!\n",
        "\n",
        "target 'App' do\n",
        "  capacitor_pods\n",
        "  # Add your Pods here\n",
        "end\n"
    );

    #[test]
    fn inserts_after_marker_and_keeps_trailing_newline() {
        let mut pf = Podfile::parse(PODFILE);
        pf.insert_after_marker("# Add your Pods here", "  pod 'FirebaseMessaging'")
            .unwrap();
        let expected = PODFILE.replace(
            "  # Add your Pods here\n",
            "  # Add your Pods here\n  pod 'FirebaseMessaging'\n",
        );
        assert_eq!(pf.render(), expected);
        assert!(pf.contains("pod 'FirebaseMessaging'"));
    }

    #[test]
    fn missing_marker_is_reported() {
        let mut pf = Podfile::parse("target 'App' do\nend\n");
        let err = pf
            .insert_after_marker("# Add your Pods here", "x")
            .unwrap_err();
        assert!(err.is_missing_target());
    }

    #[test]
    fn raises_lower_platform() {
        let out = raise_platform_floor(PODFILE, "14.0").unwrap();
        assert!(out.contains("platform :ios, '14.0'\n"));
        assert_eq!(out.len(), PODFILE.len());
    }

    #[test]
    fn leaves_equal_or_higher_platform() {
        assert_eq!(raise_platform_floor(PODFILE, "13.0"), None);
        assert_eq!(raise_platform_floor(PODFILE, "12.4"), None);
    }

    #[test]
    fn compares_components_numerically() {
        assert_eq!(compare_versions("13.10", "13.9"), Some(Ordering::Greater));
        assert_eq!(compare_versions("14", "14.0"), Some(Ordering::Equal));
        assert_eq!(compare_versions("x", "14.0"), None);
    }

    #[test]
    fn ignores_commented_declarations() {
        let commented = "# platform :ios, '9.0'\n";
        assert_eq!(raise_platform_floor(commented, "14.0"), None);
    }
}
