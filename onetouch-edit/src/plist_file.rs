//! Property-list documents (Info.plist, entitlements, privacy manifests).
//!
//! Selectors address dictionary keys starting from a `plist` root segment. A predicate on a
//! segment whose value is an array selects the dictionary entries of that array whose field
//! equals the predicate value, e.g. `plist/NSPrivacyAccessedAPITypes[@NSPrivacyAccessedAPIType
//! = 'NSPrivacyAccessedAPICategoryUserDefaults']`.

use crate::error::{EditError, EditResult};
use onetouch_types::{AttrPredicate, Selector};
use plist::{Dictionary, Value};
use std::io::Cursor;

pub const ROOT_SEGMENT: &str = "plist";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
}

enum ContainerMut<'a> {
    Dict(&'a mut Dictionary),
    Array(&'a mut Vec<Value>),
}

/// A plist whose root is a dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlistDocument {
    root: Dictionary,
}

impl PlistDocument {
    /// An empty document; rendering it gives a minimal valid property list.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parse(bytes: &[u8]) -> EditResult<Self> {
        let value = Value::from_reader(Cursor::new(bytes))?;
        let root = value
            .into_dictionary()
            .ok_or_else(|| EditError::shape(ROOT_SEGMENT, "root is not a dictionary"))?;
        Ok(Self { root })
    }

    /// Render as an XML property list.
    pub fn render(&self) -> EditResult<String> {
        let mut buf = Vec::new();
        Value::Dictionary(self.root.clone()).to_writer_xml(&mut buf)?;
        let mut out = String::from_utf8(buf)?;
        if !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }

    pub fn root(&self) -> &Dictionary {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Merge top-level entries into the document and report whether anything changed.
    ///
    /// With `replace` every key is overwritten wholesale. Otherwise dictionaries merge key by
    /// key, arrays gain the items they do not already contain, and scalars are overwritten.
    pub fn update(&mut self, entries: Dictionary, replace: bool) -> bool {
        let mut changed = false;
        for (key, value) in entries {
            match self.root.get_mut(&key) {
                Some(existing) if !replace => changed |= merge_value(existing, value),
                Some(existing) => {
                    if *existing != value {
                        *existing = value;
                        changed = true;
                    }
                }
                None => {
                    self.root.insert(key, value);
                    changed = true;
                }
            }
        }
        changed
    }

    /// Paths of every value matching `sel`.
    fn find(&self, sel: &Selector) -> Vec<Vec<Step>> {
        let Some((first, rest)) = sel.segments.split_first() else {
            return Vec::new();
        };
        if first.name != ROOT_SEGMENT {
            return Vec::new();
        }

        let mut current: Vec<Vec<Step>> = vec![Vec::new()];
        for seg in rest {
            let mut next = Vec::new();
            for path in &current {
                let Some(child) = self.dict_at(path).and_then(|d| d.get(&seg.name)) else {
                    continue;
                };
                let mut base = path.clone();
                base.push(Step::Key(seg.name.clone()));

                match (&seg.predicate, child) {
                    (None, _) => next.push(base),
                    (Some(pred), Value::Array(items)) => {
                        for (i, item) in items.iter().enumerate() {
                            if entry_matches(item, pred) {
                                let mut p = base.clone();
                                p.push(Step::Index(i));
                                next.push(p);
                            }
                        }
                    }
                    (Some(_), _) => {}
                }
            }
            current = next;
        }
        current
    }

    pub fn count(&self, sel: &Selector) -> usize {
        self.find(sel).len()
    }

    /// First value matching `sel`.
    pub fn value(&self, sel: &Selector) -> Option<&Value> {
        let path = self.find(sel).into_iter().next()?;
        get_path(&self.root, &path)
    }

    /// Add `fragment` to every container matching `parent`: dictionaries take the fragment's
    /// entries, arrays take the fragment as a new item.
    pub fn inject(&mut self, parent: &Selector, fragment: &Value) -> EditResult<()> {
        let targets = self.find(parent);
        if targets.is_empty() {
            return Err(EditError::missing(parent));
        }

        for path in &targets {
            match self.container_mut(path) {
                Some(ContainerMut::Dict(dict)) => {
                    let entries = fragment
                        .as_dictionary()
                        .ok_or_else(|| EditError::shape(parent, "dictionary fragment expected"))?;
                    for (k, v) in entries {
                        dict.insert(k.clone(), v.clone());
                    }
                }
                Some(ContainerMut::Array(items)) => items.push(fragment.clone()),
                None => return Err(EditError::shape(parent, "not a dictionary or array")),
            }
        }
        Ok(())
    }

    /// Overwrite every value matching `target`; returns how many changed.
    pub fn replace(&mut self, target: &Selector, fragment: &Value) -> EditResult<usize> {
        let mut changed = 0;
        for path in self.find(target) {
            if path.is_empty() {
                let dict = fragment
                    .as_dictionary()
                    .ok_or_else(|| EditError::shape(target, "dictionary fragment expected"))?;
                if self.root != *dict {
                    self.root = dict.clone();
                    changed += 1;
                }
                continue;
            }

            let slot =
                get_path_mut(&mut self.root, &path).ok_or_else(|| EditError::missing(target))?;
            if *slot != *fragment {
                *slot = fragment.clone();
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Whether the array at `list` holds a dictionary whose `field` is the string `value`.
    pub fn list_contains(&self, list: &Selector, field: &str, value: &str) -> bool {
        let pred = AttrPredicate {
            attr: field.to_string(),
            value: value.to_string(),
            mode: Default::default(),
        };
        self.find(list).iter().any(|path| {
            matches!(
                get_path(&self.root, path),
                Some(Value::Array(items)) if items.iter().any(|item| entry_matches(item, &pred))
            )
        })
    }

    /// Push `fragment` onto the array at `list`, creating the array under its parent
    /// dictionary when it does not exist yet.
    pub fn append(&mut self, list: &Selector, fragment: &Value) -> EditResult<()> {
        let targets = self.find(list);
        if targets.is_empty() {
            let (parent, name) = match (list.parent(), list.last()) {
                (Some(parent), Some(last)) => (parent, last.name.clone()),
                _ => return Err(EditError::missing(list)),
            };
            let parents = self.find(&parent);
            let Some(path) = parents.first() else {
                return Err(EditError::missing(list));
            };
            return match self.container_mut(path) {
                Some(ContainerMut::Dict(dict)) => {
                    dict.insert(name, Value::Array(vec![fragment.clone()]));
                    Ok(())
                }
                _ => Err(EditError::shape(&parent, "not a dictionary")),
            };
        }

        for path in &targets {
            match self.container_mut(path) {
                Some(ContainerMut::Array(items)) => items.push(fragment.clone()),
                _ => return Err(EditError::shape(list, "not an array")),
            }
        }
        Ok(())
    }

    fn dict_at(&self, path: &[Step]) -> Option<&Dictionary> {
        if path.is_empty() {
            return Some(&self.root);
        }
        get_path(&self.root, path).and_then(Value::as_dictionary)
    }

    fn container_mut(&mut self, path: &[Step]) -> Option<ContainerMut<'_>> {
        if path.is_empty() {
            return Some(ContainerMut::Dict(&mut self.root));
        }
        match get_path_mut(&mut self.root, path)? {
            Value::Dictionary(d) => Some(ContainerMut::Dict(d)),
            Value::Array(a) => Some(ContainerMut::Array(a)),
            _ => None,
        }
    }
}

fn get_path<'a>(root: &'a Dictionary, path: &[Step]) -> Option<&'a Value> {
    let (Step::Key(first), rest) = path.split_first()? else {
        return None;
    };
    let mut cur = root.get(first)?;
    for step in rest {
        cur = match step {
            Step::Key(k) => cur.as_dictionary()?.get(k)?,
            Step::Index(i) => cur.as_array()?.get(*i)?,
        };
    }
    Some(cur)
}

fn get_path_mut<'a>(root: &'a mut Dictionary, path: &[Step]) -> Option<&'a mut Value> {
    let (Step::Key(first), rest) = path.split_first()? else {
        return None;
    };
    let mut cur = root.get_mut(first)?;
    for step in rest {
        cur = match step {
            Step::Key(k) => cur.as_dictionary_mut()?.get_mut(k)?,
            Step::Index(i) => cur.as_array_mut()?.get_mut(*i)?,
        };
    }
    Some(cur)
}

fn entry_matches(item: &Value, pred: &AttrPredicate) -> bool {
    item.as_dictionary().is_some_and(|d| {
        d.iter()
            .any(|(k, v)| pred.matches_name(k) && v.as_string() == Some(pred.value.as_str()))
    })
}

fn merge_value(existing: &mut Value, incoming: Value) -> bool {
    match (existing, incoming) {
        (Value::Dictionary(base), Value::Dictionary(overlay)) => {
            let mut changed = false;
            for (k, v) in overlay {
                match base.get_mut(&k) {
                    Some(slot) => changed |= merge_value(slot, v),
                    None => {
                        base.insert(k, v);
                        changed = true;
                    }
                }
            }
            changed
        }
        (Value::Array(base), Value::Array(items)) => {
            let mut changed = false;
            for item in items {
                if !base.contains(&item) {
                    base.push(item);
                    changed = true;
                }
            }
            changed
        }
        (slot, value) => {
            if *slot == value {
                false
            } else {
                *slot = value;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const INFO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleDisplayName</key>
	<string>Old</string>
	<key>UIRequiredDeviceCapabilities</key>
	<array>
		<string>armv7</string>
	</array>
	<key>NSPrivacyAccessedAPITypes</key>
	<array>
		<dict>
			<key>NSPrivacyAccessedAPIType</key>
			<string>NSPrivacyAccessedAPICategoryUserDefaults</string>
		</dict>
	</array>
</dict>
</plist>
"#;

    fn doc() -> PlistDocument {
        PlistDocument::parse(INFO.as_bytes()).unwrap()
    }

    fn entries(pairs: Vec<(&str, Value)>) -> Dictionary {
        pairs
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    #[test]
    fn replace_update_overwrites_arrays() {
        let mut d = doc();
        let changed = d.update(
            entries(vec![(
                "UIRequiredDeviceCapabilities",
                Value::Array(vec![Value::String("arm64".into())]),
            )]),
            true,
        );
        assert!(changed);
        assert_eq!(
            d.get("UIRequiredDeviceCapabilities"),
            Some(&Value::Array(vec![Value::String("arm64".into())]))
        );
    }

    #[test]
    fn merge_update_extends_arrays_once() {
        let mut d = doc();
        let add = || {
            entries(vec![(
                "UIRequiredDeviceCapabilities",
                Value::Array(vec![Value::String("arm64".into())]),
            )])
        };
        assert!(d.update(add(), false));
        assert!(!d.update(add(), false));
        assert_eq!(
            d.get("UIRequiredDeviceCapabilities")
                .and_then(Value::as_array)
                .map(Vec::len),
            Some(2)
        );
    }

    #[test]
    fn update_with_same_value_reports_no_change() {
        let mut d = doc();
        let same = entries(vec![("CFBundleDisplayName", Value::String("Old".into()))]);
        assert!(!d.update(same, true));
    }

    #[test]
    fn predicate_selects_array_entries() {
        let d = doc();
        let api = "NSPrivacyAccessedAPICategoryUserDefaults";
        let src = format!("plist/NSPrivacyAccessedAPITypes[@NSPrivacyAccessedAPIType = '{api}']");
        let sel = Selector::parse(&src).unwrap();
        assert_eq!(d.count(&sel), 1);
        let list = Selector::parse("plist/NSPrivacyAccessedAPITypes").unwrap();
        assert!(d.list_contains(&list, "NSPrivacyAccessedAPIType", api));
    }

    #[test]
    fn append_creates_missing_array() {
        let mut d = PlistDocument::empty();
        let list = Selector::parse("plist/NSPrivacyAccessedAPITypes").unwrap();
        let mut entry = Dictionary::new();
        entry.insert(
            "NSPrivacyAccessedAPIType".into(),
            Value::String("NSPrivacyAccessedAPICategoryFileTimestamp".into()),
        );
        d.append(&list, &Value::Dictionary(entry)).unwrap();
        assert!(d.list_contains(
            &list,
            "NSPrivacyAccessedAPIType",
            "NSPrivacyAccessedAPICategoryFileTimestamp",
        ));
    }

    #[test]
    fn render_parses_back() {
        let d = doc();
        let rendered = d.render().unwrap();
        assert!(rendered.ends_with('\n'));
        assert_eq!(PlistDocument::parse(rendered.as_bytes()).unwrap(), d);
    }

    #[test]
    fn empty_document_renders_valid_plist() {
        let rendered = PlistDocument::empty().render().unwrap();
        assert!(rendered.starts_with("<?xml"));
        assert_eq!(
            PlistDocument::parse(rendered.as_bytes()).unwrap(),
            PlistDocument::empty()
        );
    }

    #[test]
    fn non_dictionary_root_is_rejected() {
        let src = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0"><array/></plist>"#;
        assert!(PlistDocument::parse(src.as_bytes()).is_err());
    }
}
