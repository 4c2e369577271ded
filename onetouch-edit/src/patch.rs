use camino::Utf8PathBuf;
use diffy::PatchFormatter;
use std::collections::BTreeMap;

/// Render a git-style unified diff for every path whose contents changed.
///
/// Paths present only in `after` are rendered as new files.
pub fn render_patch(
    before: &BTreeMap<Utf8PathBuf, String>,
    after: &BTreeMap<Utf8PathBuf, String>,
) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();
    let empty = String::new();

    for (path, new) in after {
        let old = before.get(path).unwrap_or(&empty);
        if old == new {
            continue;
        }

        out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
        if before.contains_key(path) {
            out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));
        } else {
            out.push_str(&format!("new file\n--- /dev/null\n+++ b/{0}\n", path));
        }

        let patch = diffy::create_patch(old, new);
        out.push_str(&formatter.fmt_patch(&patch).to_string());
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_files_render_nothing() {
        let mut before = BTreeMap::new();
        before.insert(Utf8PathBuf::from("a.xml"), "<a/>\n".to_string());
        assert_eq!(render_patch(&before, &before.clone()), "");
    }

    #[test]
    fn changed_and_new_files_are_rendered() {
        let mut before = BTreeMap::new();
        before.insert(Utf8PathBuf::from("a.xml"), "<a/>\n".to_string());
        let mut after = before.clone();
        after.insert(Utf8PathBuf::from("a.xml"), "<b/>\n".to_string());
        after.insert(Utf8PathBuf::from("new.xml"), "<c/>\n".to_string());

        let patch = render_patch(&before, &after);
        assert!(patch.contains("diff --git a/a.xml b/a.xml"));
        assert!(patch.contains("-<a/>"));
        assert!(patch.contains("+<b/>"));
        assert!(patch.contains("--- /dev/null\n+++ b/new.xml"));
    }
}
