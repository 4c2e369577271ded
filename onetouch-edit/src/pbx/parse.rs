use super::{PbxObject, PbxValue};
use crate::error::{EditError, EditResult};

/// Bytes that end an unquoted token.
const DELIMITERS: &[u8] = b"{}();,=\"";

/// Parse an OpenStep property list such as `project.pbxproj`.
pub fn parse(src: &str) -> EditResult<PbxValue> {
    let mut p = Parser {
        src,
        bytes: src.as_bytes(),
        pos: 0,
    };
    p.skip_trivia()?;
    let value = p.value()?;
    p.skip_trivia()?;
    if p.pos < p.bytes.len() {
        return Err(p.error("trailing content after root value"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> EditError {
        EditError::Pbx {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Skip whitespace and both comment styles.
    fn skip_trivia(&mut self) -> EditResult<()> {
        loop {
            match (self.peek(), self.bytes.get(self.pos + 1).copied()) {
                (Some(c), _) if c.is_ascii_whitespace() => self.pos += 1,
                (Some(b'/'), Some(b'/')) => {
                    self.pos = self.src[self.pos..]
                        .find('\n')
                        .map_or(self.bytes.len(), |p| self.pos + p + 1);
                }
                (Some(b'/'), Some(b'*')) => {
                    let end = self.src[self.pos + 2..]
                        .find("*/")
                        .ok_or_else(|| self.error("unterminated comment"))?;
                    self.pos += 2 + end + 2;
                }
                _ => return Ok(()),
            }
        }
    }

    fn expect(&mut self, b: u8) -> EditResult<()> {
        self.skip_trivia()?;
        if self.peek() != Some(b) {
            return Err(self.error(format!("expected '{}'", b as char)));
        }
        self.pos += 1;
        Ok(())
    }

    fn value(&mut self) -> EditResult<PbxValue> {
        self.skip_trivia()?;
        match self.peek() {
            Some(b'{') => self.object().map(PbxValue::Object),
            Some(b'(') => self.array().map(PbxValue::Array),
            Some(_) => self.string().map(PbxValue::String),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn object(&mut self) -> EditResult<PbxObject> {
        self.expect(b'{')?;
        let mut obj = PbxObject::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(obj);
            }
            let key = self.string()?;
            self.expect(b'=')?;
            let value = self.value()?;
            self.expect(b';')?;
            obj.push(key, value);
        }
    }

    fn array(&mut self) -> EditResult<Vec<PbxValue>> {
        self.expect(b'(')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(b')') {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_trivia()?;
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {}
                _ => return Err(self.error("expected ',' or ')'")),
            }
        }
    }

    fn string(&mut self) -> EditResult<String> {
        self.skip_trivia()?;
        match self.peek() {
            Some(b'"') => self.quoted(),
            Some(_) => self.bare(),
            None => Err(self.error("expected string")),
        }
    }

    fn quoted(&mut self) -> EditResult<String> {
        self.pos += 1;
        let src = self.src;
        let mut out = String::new();
        let mut chars = src[self.pos..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return Ok(out);
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, other)) => out.push(other),
                    None => break,
                },
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn bare(&mut self) -> EditResult<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() || DELIMITERS.contains(&c) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error(format!("unexpected '{}'", self.bytes[start] as char)));
        }
        Ok(self.src[start..self.pos].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_annotated_project_fragment() {
        let src = r#"// !$*UTF8*$!
{
	archiveVersion = 1;
	objects = {

/* Begin PBXBuildFile section */
		2FAD9763203C412B000D30F8 /* config.xml in Resources */ = {isa = PBXBuildFile; fileRef = 2FAD9762203C412B000D30F8 /* config.xml */; };
/* End PBXBuildFile section */
	};
	list = (
		A,
		"B C",
	);
	rootObject = 504EC2FC1FED79650016851F /* Project object */;
}
"#;
        let root = parse(src).unwrap();
        let obj = root.as_object().unwrap();
        assert_eq!(obj.get_str("archiveVersion"), Some("1"));
        let build_file = obj
            .get("objects")
            .and_then(PbxValue::as_object)
            .and_then(|o| o.get("2FAD9763203C412B000D30F8"))
            .and_then(PbxValue::as_object)
            .unwrap();
        assert_eq!(build_file.get_str("isa"), Some("PBXBuildFile"));
        assert_eq!(
            build_file.get_str("fileRef"),
            Some("2FAD9762203C412B000D30F8")
        );
        assert_eq!(
            obj.get("list").and_then(PbxValue::as_array).unwrap(),
            &[PbxValue::string("A"), PbxValue::string("B C")]
        );
    }

    #[test]
    fn quoted_escapes_are_decoded() {
        let root = parse(r#"{ a = "say \"hi\"\n"; }"#).unwrap();
        let obj = root.as_object().unwrap();
        assert_eq!(obj.get_str("a"), Some("say \"hi\"\n"));
    }

    #[test]
    fn render_then_parse_is_stable() {
        let src = r#"{ a = "$(inherited)"; b = (x, y); c = { d = "<group>"; }; }"#;
        let root = parse(src).unwrap();
        let rendered = root.render();
        assert_eq!(parse(&rendered).unwrap(), root);
        assert_eq!(parse(&rendered).unwrap().render(), rendered);
    }

    #[test]
    fn reports_offset_of_syntax_errors() {
        let err = parse("{ a = 1 }").unwrap_err();
        assert!(matches!(err, EditError::Pbx { offset: 8, .. }), "{err:?}");
        assert!(parse("{ a = \"open; }").is_err());
        assert!(parse("{ a = 1; } extra").is_err());
    }
}
