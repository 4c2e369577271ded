//! The native project handle.
//!
//! [`MobileProject`] borrows the generated Android and iOS trees for one configurator pass.
//! Documents are parsed on first access and kept in memory; directory removals and asset copies
//! are queued. Nothing touches the disk until [`MobileProject::commit`].

use anyhow::{Context, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use onetouch_edit::{
    EditResult, GradleFile, PbxProject, PlistDocument, Podfile, XmlDocument, render_patch,
};
use onetouch_types::Platform;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};
use walkdir::WalkDir;

/// A parsed native document.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeDoc {
    Xml(XmlDocument),
    Plist(PlistDocument),
    Pbx(PbxProject),
    Gradle(GradleFile),
    Podfile(Podfile),
}

impl NativeDoc {
    pub fn kind(&self) -> &'static str {
        match self {
            NativeDoc::Xml(_) => XmlDocument::KIND,
            NativeDoc::Plist(_) => PlistDocument::KIND,
            NativeDoc::Pbx(_) => PbxProject::KIND,
            NativeDoc::Gradle(_) => GradleFile::KIND,
            NativeDoc::Podfile(_) => Podfile::KIND,
        }
    }

    pub fn render(&self) -> EditResult<String> {
        match self {
            NativeDoc::Xml(d) => Ok(d.render()),
            NativeDoc::Plist(d) => d.render(),
            NativeDoc::Pbx(d) => Ok(d.render()),
            NativeDoc::Gradle(d) => Ok(d.text().to_string()),
            NativeDoc::Podfile(d) => Ok(d.render()),
        }
    }
}

/// A document type the handle can open.
pub trait NativeDocument: Sized + Clone {
    const KIND: &'static str;

    fn parse(src: &str) -> EditResult<Self>;

    fn wrap(self) -> NativeDoc;

    fn unwrap_mut(doc: &mut NativeDoc) -> Option<&mut Self>;
}

impl NativeDocument for XmlDocument {
    const KIND: &'static str = "xml";

    fn parse(src: &str) -> EditResult<Self> {
        XmlDocument::parse(src)
    }

    fn wrap(self) -> NativeDoc {
        NativeDoc::Xml(self)
    }

    fn unwrap_mut(doc: &mut NativeDoc) -> Option<&mut Self> {
        match doc {
            NativeDoc::Xml(d) => Some(d),
            _ => None,
        }
    }
}

impl NativeDocument for PlistDocument {
    const KIND: &'static str = "plist";

    fn parse(src: &str) -> EditResult<Self> {
        PlistDocument::parse(src.as_bytes())
    }

    fn wrap(self) -> NativeDoc {
        NativeDoc::Plist(self)
    }

    fn unwrap_mut(doc: &mut NativeDoc) -> Option<&mut Self> {
        match doc {
            NativeDoc::Plist(d) => Some(d),
            _ => None,
        }
    }
}

impl NativeDocument for PbxProject {
    const KIND: &'static str = "pbxproj";

    fn parse(src: &str) -> EditResult<Self> {
        PbxProject::parse(src)
    }

    fn wrap(self) -> NativeDoc {
        NativeDoc::Pbx(self)
    }

    fn unwrap_mut(doc: &mut NativeDoc) -> Option<&mut Self> {
        match doc {
            NativeDoc::Pbx(d) => Some(d),
            _ => None,
        }
    }
}

impl NativeDocument for GradleFile {
    const KIND: &'static str = "gradle";

    fn parse(src: &str) -> EditResult<Self> {
        Ok(GradleFile::parse(src))
    }

    fn wrap(self) -> NativeDoc {
        NativeDoc::Gradle(self)
    }

    fn unwrap_mut(doc: &mut NativeDoc) -> Option<&mut Self> {
        match doc {
            NativeDoc::Gradle(d) => Some(d),
            _ => None,
        }
    }
}

impl NativeDocument for Podfile {
    const KIND: &'static str = "podfile";

    fn parse(src: &str) -> EditResult<Self> {
        Ok(Podfile::parse(src))
    }

    fn wrap(self) -> NativeDoc {
        NativeDoc::Podfile(self)
    }

    fn unwrap_mut(doc: &mut NativeDoc) -> Option<&mut Self> {
        match doc {
            NativeDoc::Podfile(d) => Some(d),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct OpenDoc {
    /// Text on disk when the document was opened; `None` for documents created in this pass.
    original: Option<String>,
    /// Parsed form of `original`, for structural change detection.
    pristine: Option<NativeDoc>,
    doc: NativeDoc,
}

impl OpenDoc {
    fn is_modified(&self) -> bool {
        self.pristine.as_ref() != Some(&self.doc)
    }
}

/// A queued filesystem operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsOp {
    RemoveDir(Utf8PathBuf),
    CopyDir { from: Utf8PathBuf, to: Utf8PathBuf },
}

impl fmt::Display for FsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsOp::RemoveDir(path) => write!(f, "remove {path}/"),
            FsOp::CopyDir { from, to } => write!(f, "copy {from}/ -> {to}/"),
        }
    }
}

/// What a commit wrote (or, for a dry run, would write).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub written: Vec<Utf8PathBuf>,
    pub fs_ops: Vec<FsOp>,
    pub dry_run: bool,
}

/// Handle over the generated native projects below a project root.
///
/// All paths taken and returned by the handle are relative to the project root.
#[derive(Debug)]
pub struct MobileProject {
    root: Utf8PathBuf,
    platforms: Utf8PathBuf,
    docs: BTreeMap<Utf8PathBuf, OpenDoc>,
    pending: Vec<FsOp>,
    dry_run: bool,
}

impl MobileProject {
    pub fn load(root: impl Into<Utf8PathBuf>, platforms: impl Into<Utf8PathBuf>) -> Self {
        let root = root.into();
        let platforms = platforms.into();
        debug!(root = %root, platforms = %platforms, "loaded native project");
        Self {
            root,
            platforms,
            docs: BTreeMap::new(),
            pending: Vec::new(),
            dry_run: false,
        }
    }

    /// In dry-run mode `commit` reports what it would write and leaves the disk alone.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// `<platforms>/android` or `<platforms>/ios`.
    pub fn platform_dir(&self, platform: Platform) -> Utf8PathBuf {
        self.platforms.join(platform.as_str())
    }

    pub fn android_dir(&self) -> Utf8PathBuf {
        self.platform_dir(Platform::Android)
    }

    /// The Xcode project directory, `<platforms>/ios/App`.
    pub fn ios_dir(&self) -> Utf8PathBuf {
        self.platform_dir(Platform::Ios).join("App")
    }

    /// A platform counts as added once its directory exists.
    pub fn has_platform(&self, platform: Platform) -> bool {
        self.abs(&self.platform_dir(platform)).is_dir()
    }

    pub fn abs(&self, rel: &Utf8Path) -> Utf8PathBuf {
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.root.join(rel)
        }
    }

    /// Whether `rel` exists, either on disk or as a document created in this pass.
    pub fn exists(&self, rel: &Utf8Path) -> bool {
        self.docs.contains_key(rel) || self.abs(rel).exists()
    }

    /// Open the document at `rel`. Returns `None` when the file does not exist.
    pub fn document<D: NativeDocument>(
        &mut self,
        rel: &Utf8Path,
    ) -> anyhow::Result<Option<&mut D>> {
        if !self.docs.contains_key(rel) {
            let abs = self.abs(rel);
            if !abs.is_file() {
                return Ok(None);
            }
            let text = fs::read_to_string(&abs).with_context(|| format!("read {}", abs))?;
            let doc = D::parse(&text).with_context(|| format!("parse {} as {}", abs, D::KIND))?;
            debug!(path = %rel, kind = D::KIND, "opened document");
            self.docs.insert(
                rel.to_path_buf(),
                OpenDoc {
                    original: Some(text),
                    pristine: Some(doc.clone().wrap()),
                    doc: doc.wrap(),
                },
            );
        }
        self.typed(rel).map(Some)
    }

    /// Open the document at `rel`, failing when it does not exist.
    pub fn require<D: NativeDocument>(&mut self, rel: &Utf8Path) -> anyhow::Result<&mut D> {
        let abs = self.abs(rel);
        self.document(rel)?
            .ok_or_else(|| anyhow!("required file {} does not exist", abs))
    }

    /// Open the document at `rel`, seeding it in memory with `seed()` when it does not exist.
    pub fn document_or_create<D: NativeDocument>(
        &mut self,
        rel: &Utf8Path,
        seed: impl FnOnce() -> D,
    ) -> anyhow::Result<&mut D> {
        if self.document::<D>(rel)?.is_none() {
            debug!(path = %rel, kind = D::KIND, "created document");
            self.docs.insert(
                rel.to_path_buf(),
                OpenDoc {
                    original: None,
                    pristine: None,
                    doc: seed().wrap(),
                },
            );
        }
        self.typed(rel)
    }

    /// Set the whole content of `rel`, whether or not it exists yet.
    pub fn put_document<D: NativeDocument>(
        &mut self,
        rel: &Utf8Path,
        doc: D,
    ) -> anyhow::Result<()> {
        if let Some(existing) = self.document::<D>(rel)? {
            *existing = doc;
            return Ok(());
        }
        self.docs.insert(
            rel.to_path_buf(),
            OpenDoc {
                original: None,
                pristine: None,
                doc: doc.wrap(),
            },
        );
        Ok(())
    }

    fn typed<D: NativeDocument>(&mut self, rel: &Utf8Path) -> anyhow::Result<&mut D> {
        let open = self
            .docs
            .get_mut(rel)
            .ok_or_else(|| anyhow!("{} is not open", rel))?;
        let kind = open.doc.kind();
        D::unwrap_mut(&mut open.doc)
            .ok_or_else(|| anyhow!("{} is open as {}, not {}", rel, kind, D::KIND))
    }

    /// Names of the immediate subdirectories of `rel`, sorted.
    pub fn list_dirs(&self, rel: &Utf8Path) -> anyhow::Result<Vec<String>> {
        let abs = self.abs(rel);
        let mut out = Vec::new();
        for entry in fs::read_dir(&abs)? {
            let entry = entry.with_context(|| format!("list {}", abs))?;
            let file_type = entry.file_type().with_context(|| format!("stat {}", abs))?;
            if file_type.is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                out.push(name.to_string());
            }
        }
        out.sort();
        Ok(out)
    }

    /// Queue a recursive directory removal. Missing directories are ignored at commit time.
    pub fn remove_dir(&mut self, rel: impl Into<Utf8PathBuf>) {
        self.pending.push(FsOp::RemoveDir(rel.into()));
    }

    /// Queue a recursive copy of `from` into `to`, overwriting files that exist.
    pub fn copy_dir(
        &mut self,
        from: impl Into<Utf8PathBuf>,
        to: impl Into<Utf8PathBuf>,
    ) -> anyhow::Result<()> {
        let from = from.into();
        let abs = self.abs(&from);
        if !abs.is_dir() {
            bail!("asset directory {} does not exist", abs);
        }
        self.pending.push(FsOp::CopyDir {
            from,
            to: to.into(),
        });
        Ok(())
    }

    pub fn pending_ops(&self) -> &[FsOp] {
        &self.pending
    }

    /// Paths of documents that differ from what was read, or that are new.
    pub fn modified_paths(&self) -> Vec<&Utf8Path> {
        self.docs
            .iter()
            .filter(|(_, open)| open.is_modified())
            .map(|(path, _)| path.as_path())
            .collect()
    }

    /// Unified diff of every pending document edit.
    pub fn diff(&self) -> anyhow::Result<String> {
        let mut before = BTreeMap::new();
        let mut after = BTreeMap::new();
        for (path, open) in self.docs.iter().filter(|(_, o)| o.is_modified()) {
            if let Some(original) = &open.original {
                before.insert(path.clone(), original.clone());
            }
            let rendered = open
                .doc
                .render()
                .with_context(|| format!("render {}", path))?;
            after.insert(path.clone(), rendered);
        }
        Ok(render_patch(&before, &after))
    }

    /// Write every modified document, then run the queued filesystem operations in order.
    pub fn commit(&mut self) -> anyhow::Result<CommitSummary> {
        let mut summary = CommitSummary {
            dry_run: self.dry_run,
            ..CommitSummary::default()
        };

        for (rel, open) in self.docs.iter_mut().filter(|(_, o)| o.is_modified()) {
            let text = open
                .doc
                .render()
                .with_context(|| format!("render {}", rel))?;
            if !self.dry_run {
                let abs = self.root.join(rel);
                if let Some(parent) = abs.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&abs, &text)?;
                open.original = Some(text);
                open.pristine = Some(open.doc.clone());
            }
            debug!(path = %rel, dry_run = self.dry_run, "wrote document");
            summary.written.push(rel.clone());
        }

        let ops = std::mem::take(&mut self.pending);
        for op in &ops {
            if !self.dry_run {
                self.run_op(op)?;
            }
            debug!(op = %op, dry_run = self.dry_run, "filesystem op");
        }
        summary.fs_ops = ops;

        info!(
            documents = summary.written.len(),
            fs_ops = summary.fs_ops.len(),
            dry_run = self.dry_run,
            "committed native project"
        );
        Ok(summary)
    }

    fn run_op(&self, op: &FsOp) -> anyhow::Result<()> {
        match op {
            FsOp::RemoveDir(rel) => {
                let abs = self.abs(rel);
                if abs.exists() {
                    fs::remove_dir_all(&abs)?;
                }
            }
            FsOp::CopyDir { from, to } => copy_tree(&self.abs(from), &self.abs(to))?,
        }
        Ok(())
    }
}

/// Recursively copy `from` into `to`, creating directories as needed.
pub fn copy_tree(from: &Utf8Path, to: &Utf8Path) -> anyhow::Result<()> {
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", from))?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .with_context(|| format!("strip {}", from))?;
        let dest = to.as_std_path().join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}
