//! Declarative document mutations.
//!
//! Every configurator edit is expressed as a [`Mutation`] over a [`Selector`]. The engine that
//! applies them lives in `onetouch-edit`; this module only defines the shapes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How an attribute predicate compares attribute names.
///
/// `Exact` compares the qualified name as written (`android:name`). `LocalName` ignores any
/// namespace prefix on both sides, for documents whose prefixes are not under our control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrMatch {
    #[default]
    Exact,
    LocalName,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttrPredicate {
    pub attr: String,
    pub value: String,
    #[serde(default)]
    pub mode: AttrMatch,
}

impl AttrPredicate {
    pub fn matches_name(&self, name: &str) -> bool {
        match self.mode {
            AttrMatch::Exact => self.attr == name,
            AttrMatch::LocalName => local_name(&self.attr) == local_name(name),
        }
    }
}

fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// One step of a selector path: an element (or dictionary key) name plus an optional
/// attribute-equality predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<AttrPredicate>,
}

/// XPath-like path such as `manifest/application/activity[@android:name = '.MainActivity']`.
///
/// The first segment names the document root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("empty segment at offset {0}")]
    EmptySegment(usize),
    #[error("malformed predicate at offset {offset}: {message}")]
    Predicate { offset: usize, message: String },
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        input.parse()
    }

    /// Selector from plain names with no predicates (dictionary key paths).
    pub fn keys<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: names
                .into_iter()
                .map(|n| Segment {
                    name: n.into(),
                    predicate: None,
                })
                .collect(),
        }
    }

    /// Append a child segment.
    pub fn child(mut self, name: impl Into<String>) -> Self {
        self.segments.push(Segment {
            name: name.into(),
            predicate: None,
        });
        self
    }

    /// Append a child segment filtered by an exact attribute match.
    pub fn child_where(
        mut self,
        name: impl Into<String>,
        attr: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.segments.push(Segment {
            name: name.into(),
            predicate: Some(AttrPredicate {
                attr: attr.into(),
                value: value.into(),
                mode: AttrMatch::Exact,
            }),
        });
        self
    }

    /// Switch every predicate to the given match mode.
    pub fn with_match(mut self, mode: AttrMatch) -> Self {
        for seg in &mut self.segments {
            if let Some(p) = &mut seg.predicate {
                p.mode = mode;
            }
        }
        self
    }

    /// The selector for the parent of the last segment.
    pub fn parent(&self) -> Option<Selector> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Selector {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SelectorError::Empty);
        }

        let chars: Vec<char> = input.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let start = i;
            while i < chars.len() && chars[i] != '/' && chars[i] != '[' {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(SelectorError::EmptySegment(start));
            }

            let mut predicate = None;
            if i < chars.len() && chars[i] == '[' {
                let open = i;
                let mut quote: Option<char> = None;
                i += 1;
                let body_start = i;
                while i < chars.len() {
                    match (quote, chars[i]) {
                        (None, '\'' | '"') => quote = Some(chars[i]),
                        (Some(q), c) if c == q => quote = None,
                        (None, ']') => break,
                        _ => {}
                    }
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(SelectorError::Predicate {
                        offset: open,
                        message: "unterminated '['".to_string(),
                    });
                }
                let body: String = chars[body_start..i].iter().collect();
                predicate = Some(parse_predicate(&body, open)?);
                i += 1;
            }

            segments.push(Segment { name, predicate });

            if i < chars.len() {
                if chars[i] != '/' {
                    return Err(SelectorError::Predicate {
                        offset: i,
                        message: format!("unexpected '{}'", chars[i]),
                    });
                }
                i += 1;
                if i == chars.len() {
                    return Err(SelectorError::EmptySegment(i));
                }
            }
        }

        Ok(Selector { segments })
    }
}

fn parse_predicate(body: &str, offset: usize) -> Result<AttrPredicate, SelectorError> {
    let err = |message: &str| SelectorError::Predicate {
        offset,
        message: message.to_string(),
    };

    let body = body.trim();
    let rest = body.strip_prefix('@').ok_or_else(|| err("expected '@'"))?;
    let (attr, value) = rest.split_once('=').ok_or_else(|| err("expected '='"))?;
    let attr = attr.trim();
    if attr.is_empty() {
        return Err(err("empty attribute name"));
    }

    let value = value.trim();
    let unquoted = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
        .ok_or_else(|| err("value must be quoted"))?;

    Ok(AttrPredicate {
        attr: attr.to_string(),
        value: unquoted.to_string(),
        mode: AttrMatch::Exact,
    })
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(&seg.name)?;
            if let Some(p) = &seg.predicate {
                write!(f, "[@{} = '{}']", p.attr, p.value)?;
            }
        }
        Ok(())
    }
}

/// A single idempotent document edit.
///
/// `F` is the fragment type of the target document: XML source text for XML documents, a
/// property-list value for plists.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<F> {
    /// Inject under `parent` when `target` is absent, otherwise replace `target` in place.
    Upsert {
        target: Selector,
        parent: Selector,
        fragment: F,
    },
    /// Replace `target` when it exists; do nothing otherwise.
    ReplaceIfPresent { target: Selector, fragment: F },
    /// Inject under `parent` only when nothing matches `probe`.
    InsertIfAbsent {
        probe: Selector,
        parent: Selector,
        fragment: F,
    },
    /// Append to the list at `list` unless an entry already has `field == value`.
    AppendIfNotMatching {
        list: Selector,
        field: String,
        value: String,
        fragment: F,
    },
}

impl<F> Mutation<F> {
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Upsert { .. } => "upsert",
            Mutation::ReplaceIfPresent { .. } => "replace_if_present",
            Mutation::InsertIfAbsent { .. } => "insert_if_absent",
            Mutation::AppendIfNotMatching { .. } => "append_if_not_matching",
        }
    }

    /// The selector the mutation is keyed on, for logging.
    pub fn anchor(&self) -> &Selector {
        match self {
            Mutation::Upsert { target, .. } | Mutation::ReplaceIfPresent { target, .. } => target,
            Mutation::InsertIfAbsent { probe, .. } => probe,
            Mutation::AppendIfNotMatching { list, .. } => list,
        }
    }
}

/// What applying a mutation did. Finding the document already converged is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOutcome {
    Applied,
    Unchanged,
}

impl MutationOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, MutationOutcome::Applied)
    }
}
