//! Xcode `project.pbxproj` documents.
//!
//! The file is an OpenStep-style property list. [`parse`] reads it into a [`PbxValue`] tree,
//! [`PbxValue::render`] writes it back in the tab-indented layout Xcode uses. Annotation
//! comments (`/* App */`) are not kept; Xcode regenerates them on its next save.

mod parse;
mod project;

pub use parse::parse;
pub use project::{PbxProject, RESOURCES_PHASE};

/// Header line Xcode writes at the top of every project file.
pub const PBX_HEADER: &str = "// !$*UTF8*$!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PbxValue {
    String(String),
    Array(Vec<PbxValue>),
    Object(PbxObject),
}

impl PbxValue {
    pub fn string(s: impl Into<String>) -> Self {
        PbxValue::String(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PbxValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PbxValue]> {
        match self {
            PbxValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<PbxValue>> {
        match self {
            PbxValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&PbxObject> {
        match self {
            PbxValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut PbxObject> {
        match self {
            PbxValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Render a full project file: header line, then the value.
    pub fn render(&self) -> String {
        let mut out = String::from(PBX_HEADER);
        out.push('\n');
        write_value(&mut out, self, 0);
        out.push('\n');
        out
    }
}

/// An ordered dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PbxObject {
    entries: Vec<(String, PbxValue)>,
}

impl PbxObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&PbxValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PbxValue> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PbxValue::as_str)
    }

    /// Insert or overwrite `key`, keeping its position when it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: PbxValue) {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PbxValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut PbxValue)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push(&mut self, key: String, value: PbxValue) {
        self.entries.push((key, value));
    }
}

impl<K: Into<String>> FromIterator<(K, PbxValue)> for PbxObject {
    fn from_iter<I: IntoIterator<Item = (K, PbxValue)>>(iter: I) -> Self {
        let mut obj = PbxObject::new();
        for (k, v) in iter {
            obj.insert(k, v);
        }
        obj
    }
}

fn write_value(out: &mut String, value: &PbxValue, depth: usize) {
    match value {
        PbxValue::String(s) => write_string(out, s),
        PbxValue::Array(items) => {
            out.push_str("(\n");
            for item in items {
                indent(out, depth + 1);
                write_value(out, item, depth + 1);
                out.push_str(",\n");
            }
            indent(out, depth);
            out.push(')');
        }
        PbxValue::Object(obj) => {
            out.push_str("{\n");
            for (k, v) in &obj.entries {
                indent(out, depth + 1);
                write_string(out, k);
                out.push_str(" = ");
                write_value(out, v, depth + 1);
                out.push_str(";\n");
            }
            indent(out, depth);
            out.push('}');
        }
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

fn needs_quotes(s: &str) -> bool {
    let plain = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | '.');
    s.is_empty() || !s.chars().all(plain)
}

fn write_string(out: &mut String, s: &str) {
    if !needs_quotes(s) {
        out.push_str(s);
        return;
    }
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_follows_xcode_rules() {
        assert!(!needs_quotes("App/Info.plist"));
        assert!(!needs_quotes("$PROJECT_DIR"));
        assert!(needs_quotes("$(inherited)"));
        assert!(needs_quotes("<group>"));
        assert!(needs_quotes("com.apple.product-type.application"));
        assert!(needs_quotes(""));
    }

    #[test]
    fn render_nests_with_tabs() {
        let value = PbxValue::Object(PbxObject::from_iter([
            ("isa", PbxValue::string("PBXGroup")),
            ("children", PbxValue::Array(vec![PbxValue::string("ABC")])),
            ("sourceTree", PbxValue::string("<group>")),
        ]));
        let expected = concat!(
            "// !$*UTF8*$!\n",
            "{\n",
            "\tisa = PBXGroup;\n",
            "\tchildren = (\n",
            "\t\tABC,\n",
            "\t);\n",
            "\tsourceTree = \"<group>\";\n",
            "}\n"
        );
        assert_eq!(value.render(), expected);
    }

    #[test]
    fn insert_overwrites_in_place() {
        let mut obj = PbxObject::from_iter([
            ("name", PbxValue::string("1")),
            ("path", PbxValue::string("2")),
        ]);
        obj.insert("name", PbxValue::string("3"));
        let keys: Vec<&str> = obj.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["name", "path"]);
        assert_eq!(obj.get_str("name"), Some("3"));
    }
}
