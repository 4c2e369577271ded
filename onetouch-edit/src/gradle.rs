//! Text-level editing of Gradle build scripts.
//!
//! The scanner only understands enough Groovy to skip strings and comments and to pair
//! braces, which is all that is needed to locate `block.block.property` statements. Edits are
//! splices into the original text, so everything else in the file is left untouched.

use crate::error::{EditError, EditResult};
use std::ops::Range;

const INDENT_STEP: &str = "    ";

#[derive(Debug, Clone)]
struct Block {
    name: String,
    open: usize,
    close: usize,
    parent: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct GradleFile {
    text: String,
    blocks: Vec<Block>,
    code: Vec<bool>,
}

impl PartialEq for GradleFile {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl GradleFile {
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        let (blocks, code) = scan(&text);
        Self { text, blocks, code }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Byte range of the statement assigning the last element of `path` inside the nested
    /// blocks named by the rest of it. `["ext", "x"]` also matches a top-level `ext.x = ..`.
    pub fn find(&self, path: &[&str]) -> Option<Range<usize>> {
        let (name, blocks) = path.split_last()?;
        if let Some(scope) = self.scope_of(blocks)
            && let Some(range) = self.statement_in(scope, name)
        {
            return Some(range);
        }
        if let [prefix] = blocks {
            return self.statement_in(None, &format!("{prefix}.{name}"));
        }
        None
    }

    /// Source text of the statement at `path`.
    pub fn source(&self, path: &[&str]) -> Option<&str> {
        self.find(path).map(|r| &self.text[r])
    }

    /// First run of digits in the statement at `path`.
    pub fn first_integer(&self, path: &[&str]) -> Option<u64> {
        let src = self.source(path)?;
        let start = src.find(|c: char| c.is_ascii_digit())?;
        let digits: String = src[start..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    }

    /// Replace the statement at `path` with `name rhs`, or insert it at the end of the
    /// enclosing block. Returns whether the text changed.
    pub fn replace_property(&mut self, path: &[&str], rhs: &str) -> EditResult<bool> {
        let Some((name, blocks)) = path.split_last() else {
            return Err(EditError::missing("<empty gradle path>"));
        };

        if let Some(range) = self.find(path) {
            let current = &self.text[range.clone()];
            let key_len = current
                .find(|c: char| c.is_whitespace() || c == '=' || c == '(')
                .unwrap_or(current.len());
            let replacement = format!("{} {}", &current[..key_len], rhs);
            if replacement == current {
                return Ok(false);
            }
            let mut text = self.text.clone();
            text.replace_range(range, &replacement);
            *self = Self::parse(text);
            return Ok(true);
        }

        let scope = self
            .scope_of(blocks)
            .ok_or_else(|| EditError::missing(path.join(".")))?;
        let statement = format!("{name} {rhs}");
        let mut text = self.text.clone();

        match scope {
            None => {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str(&statement);
                text.push('\n');
            }
            Some(idx) => {
                let indent = self.body_indent(idx);
                let close = self.blocks[idx].close;
                let line_start = self.text[..close].rfind('\n').map_or(0, |p| p + 1);
                if self.text[line_start..close].trim().is_empty() {
                    text.insert_str(line_start, &format!("{indent}{statement}\n"));
                } else {
                    text.insert_str(close, &format!("\n{indent}{statement}\n"));
                }
            }
        }

        *self = Self::parse(text);
        Ok(true)
    }

    fn scope_of(&self, names: &[&str]) -> Option<Option<usize>> {
        let mut scope = None;
        for name in names {
            let idx = self
                .blocks
                .iter()
                .position(|b| b.parent == scope && b.name == *name)?;
            scope = Some(idx);
        }
        Some(scope)
    }

    fn body(&self, scope: Option<usize>) -> Range<usize> {
        match scope {
            Some(idx) => self.blocks[idx].open + 1..self.blocks[idx].close,
            None => 0..self.text.len(),
        }
    }

    fn innermost(&self, pos: usize) -> Option<usize> {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.open < pos && pos < b.close)
            .map(|(i, _)| i)
            .next_back()
    }

    /// Statement starts (first non-blank byte of each line) directly inside `scope`.
    fn statement_starts(&self, scope: Option<usize>) -> Vec<usize> {
        let body = self.body(scope);
        let mut starts = Vec::new();
        let mut line_start = body.start;

        while line_start < body.end {
            let line_end = self.text[line_start..body.end]
                .find('\n')
                .map_or(body.end, |p| line_start + p);
            let line = &self.text[line_start..line_end];
            let ws = line.len() - line.trim_start_matches([' ', '\t']).len();
            let pos = line_start + ws;

            if pos < line_end && self.code[pos] && self.innermost(pos) == scope {
                starts.push(pos);
            }
            line_start = line_end + 1;
        }
        starts
    }

    fn statement_in(&self, scope: Option<usize>, key: &str) -> Option<Range<usize>> {
        let body = self.body(scope);
        self.statement_starts(scope).into_iter().find_map(|pos| {
            let rest = &self.text[pos..body.end];
            let after = rest.strip_prefix(key)?;
            if !after.starts_with(|c: char| c.is_whitespace() || c == '=' || c == '(') {
                return None;
            }
            let line_len = rest.find('\n').unwrap_or(rest.len());
            let statement = rest[..line_len].trim_end();
            Some(pos..pos + statement.len())
        })
    }

    fn body_indent(&self, idx: usize) -> String {
        if let Some(pos) = self.statement_starts(Some(idx)).first() {
            let line_start = self.text[..*pos].rfind('\n').map_or(0, |p| p + 1);
            return self.text[line_start..*pos].to_string();
        }

        let open = self.blocks[idx].open;
        let line_start = self.text[..open].rfind('\n').map_or(0, |p| p + 1);
        let own: String = self.text[line_start..open]
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        format!("{own}{INDENT_STEP}")
    }
}

fn scan(text: &str) -> (Vec<Block>, Vec<bool>) {
    let bytes = text.as_bytes();
    let mut code = vec![true; bytes.len()];
    let mut blocks: Vec<Block> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();

        let skip_to = match (b, next) {
            (b'/', Some(b'/')) => Some(find_from(text, i, "\n").unwrap_or(bytes.len())),
            (b'/', Some(b'*')) => Some(find_from(text, i + 2, "*/").map_or(bytes.len(), |p| p + 2)),
            (b'"' | b'\'', _) => Some(string_end(bytes, i)),
            _ => None,
        };
        if let Some(end) = skip_to {
            for flag in &mut code[i..end] {
                *flag = false;
            }
            i = end;
            continue;
        }

        match b {
            b'{' => {
                blocks.push(Block {
                    name: name_before(text, i),
                    open: i,
                    close: bytes.len(),
                    parent: stack.last().copied(),
                });
                stack.push(blocks.len() - 1);
            }
            b'}' => {
                if let Some(idx) = stack.pop() {
                    blocks[idx].close = i;
                }
            }
            _ => {}
        }
        i += 1;
    }

    (blocks, code)
}

fn find_from(text: &str, from: usize, needle: &str) -> Option<usize> {
    text.get(from..)?.find(needle).map(|p| from + p)
}

fn string_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    if bytes[start..].starts_with(&[quote, quote, quote]) {
        let delim = [quote, quote, quote];
        let mut j = start + 3;
        while j + 3 <= bytes.len() {
            if bytes[j..j + 3] == delim {
                return j + 3;
            }
            j += 1;
        }
        return bytes.len();
    }

    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'\n' => return j,
            c if c == quote => return j + 1,
            _ => j += 1,
        }
    }
    bytes.len()
}

fn name_before(text: &str, open: usize) -> String {
    let head = text[..open].trim_end();
    let start = head
        .rfind(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .map_or(0, |p| p + 1);
    head[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VARIABLES: &str = concat!(
        "ext {\n",
        "    minSdkVersion = 22\n",
        "    compileSdkVersion = 34\n",
        "    // targetSdkVersion = 1\n",
        "    androidxCoreVersion = '1.12.0'\n",
        "}\n"
    );

    const APP: &str = r#"apply plugin: 'com.android.application'

android {
    namespace "com.example.app"
    compileSdk rootProject.ext.compileSdkVersion
    defaultConfig {
        applicationId "com.example.app"
        minSdkVersion rootProject.ext.minSdkVersion
        versionCode 1
        versionName "1.0" /* placeholder { */
    }
    buildTypes {
        release {
            minifyEnabled false
        }
    }
}
"#;

    #[test]
    fn reads_first_integer() {
        let g = GradleFile::parse(VARIABLES);
        assert_eq!(g.first_integer(&["ext", "minSdkVersion"]), Some(22));
        assert_eq!(g.first_integer(&["ext", "compileSdkVersion"]), Some(34));
    }

    #[test]
    fn commented_statements_are_ignored() {
        let g = GradleFile::parse(VARIABLES);
        assert_eq!(g.find(&["ext", "targetSdkVersion"]), None);
    }

    #[test]
    fn replace_keeps_the_rest_of_the_file() {
        let mut g = GradleFile::parse(VARIABLES);
        let key = ["ext", "minSdkVersion"];
        assert!(g.replace_property(&key, "= 23").unwrap());
        let expected = VARIABLES.replace("minSdkVersion = 22", "minSdkVersion = 23");
        assert_eq!(g.text(), expected);
        assert!(!g.replace_property(&key, "= 23").unwrap());
    }

    #[test]
    fn missing_property_is_appended_to_block() {
        let mut g = GradleFile::parse(VARIABLES);
        let key = ["ext", "targetSdkVersion"];
        assert!(g.replace_property(&key, "= 34").unwrap());
        let tail = "    androidxCoreVersion = '1.12.0'\n    targetSdkVersion = 34\n}\n";
        assert!(g.text().ends_with(tail));
        assert_eq!(g.first_integer(&key), Some(34));
    }

    #[test]
    fn nested_blocks_and_comment_braces() {
        let mut g = GradleFile::parse(APP);
        assert_eq!(
            g.source(&["android", "defaultConfig", "versionName"]),
            Some("versionName \"1.0\" /* placeholder { */")
        );
        let version = ["android", "defaultConfig", "versionCode"];
        let id = ["android", "defaultConfig", "applicationId"];
        g.replace_property(&version, "1020304").unwrap();
        g.replace_property(&id, "\"uk.co.ronoc.watchr\"").unwrap();
        let text = g.text();
        assert!(text.contains("        versionCode 1020304\n"));
        assert!(text.contains("        applicationId \"uk.co.ronoc.watchr\"\n"));
        assert!(text.contains("    namespace \"com.example.app\"\n"));
    }

    #[test]
    fn statement_in_nested_block_is_not_found_from_parent() {
        let g = GradleFile::parse(APP);
        assert_eq!(g.find(&["android", "versionCode"]), None);
        let minify = ["android", "buildTypes", "release", "minifyEnabled"];
        assert!(g.find(&minify).is_some());
    }

    #[test]
    fn top_level_ext_assignment_is_a_fallback() {
        let g = GradleFile::parse("ext.minSdkVersion = 21\n");
        assert_eq!(g.first_integer(&["ext", "minSdkVersion"]), Some(21));
    }

    #[test]
    fn missing_block_is_an_error() {
        let mut g = GradleFile::parse(APP);
        let err = g
            .replace_property(&["android", "flavors", "x"], "1")
            .unwrap_err();
        assert!(err.is_missing_target());
    }
}
