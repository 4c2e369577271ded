//! Applying [`Mutation`]s to tree documents.

use crate::error::{EditError, EditResult};
use crate::plist_file::PlistDocument;
use crate::xml::XmlDocument;
use onetouch_types::{Mutation, MutationOutcome, Selector};
use tracing::debug;

/// The capabilities the mutation engine needs from a document.
pub trait TreeDocument {
    type Fragment;

    /// Number of nodes matching `sel`.
    fn count(&self, sel: &Selector) -> usize;

    /// Add `fragment` under every node matching `parent`.
    fn inject(&mut self, parent: &Selector, fragment: &Self::Fragment) -> EditResult<()>;

    /// Replace every node matching `target`; returns how many changed.
    fn replace(&mut self, target: &Selector, fragment: &Self::Fragment) -> EditResult<usize>;

    /// Whether the list at `list` has an entry whose `field` equals `value`.
    fn list_contains(&self, list: &Selector, field: &str, value: &str) -> bool;

    /// Append `fragment` to the list at `list`.
    fn append(&mut self, list: &Selector, fragment: &Self::Fragment) -> EditResult<()>;
}

/// Apply one mutation. Finding the document already converged yields
/// [`MutationOutcome::Unchanged`].
pub fn apply_mutation<D: TreeDocument>(
    doc: &mut D,
    mutation: &Mutation<D::Fragment>,
) -> EditResult<MutationOutcome> {
    let outcome = match mutation {
        Mutation::Upsert {
            target,
            parent,
            fragment,
        } => {
            if doc.count(target) == 0 {
                doc.inject(parent, fragment)?;
                if doc.count(target) == 0 {
                    return Err(EditError::shape(
                        target,
                        "injected fragment does not match its own selector",
                    ));
                }
                MutationOutcome::Applied
            } else {
                changed(doc.replace(target, fragment)?)
            }
        }
        Mutation::ReplaceIfPresent { target, fragment } => changed(doc.replace(target, fragment)?),
        Mutation::InsertIfAbsent {
            probe,
            parent,
            fragment,
        } => {
            if doc.count(probe) > 0 {
                MutationOutcome::Unchanged
            } else {
                doc.inject(parent, fragment)?;
                MutationOutcome::Applied
            }
        }
        Mutation::AppendIfNotMatching {
            list,
            field,
            value,
            fragment,
        } => {
            if doc.list_contains(list, field, value) {
                MutationOutcome::Unchanged
            } else {
                doc.append(list, fragment)?;
                MutationOutcome::Applied
            }
        }
    };

    debug!(
        op = mutation.kind(),
        selector = %mutation.anchor(),
        applied = outcome.is_applied(),
        "mutation"
    );
    Ok(outcome)
}

fn changed(count: usize) -> MutationOutcome {
    if count > 0 {
        MutationOutcome::Applied
    } else {
        MutationOutcome::Unchanged
    }
}

impl TreeDocument for XmlDocument {
    type Fragment = String;

    fn count(&self, sel: &Selector) -> usize {
        XmlDocument::count(self, sel)
    }

    fn inject(&mut self, parent: &Selector, fragment: &String) -> EditResult<()> {
        self.inject_fragment(parent, fragment)
    }

    fn replace(&mut self, target: &Selector, fragment: &String) -> EditResult<usize> {
        self.replace_fragment(target, fragment)
    }

    fn list_contains(&self, list: &Selector, field: &str, value: &str) -> bool {
        self.has_child_with_attr(list, field, value)
    }

    fn append(&mut self, list: &Selector, fragment: &String) -> EditResult<()> {
        self.inject_fragment(list, fragment)
    }
}

impl TreeDocument for PlistDocument {
    type Fragment = plist::Value;

    fn count(&self, sel: &Selector) -> usize {
        PlistDocument::count(self, sel)
    }

    fn inject(&mut self, parent: &Selector, fragment: &plist::Value) -> EditResult<()> {
        PlistDocument::inject(self, parent, fragment)
    }

    fn replace(&mut self, target: &Selector, fragment: &plist::Value) -> EditResult<usize> {
        PlistDocument::replace(self, target, fragment)
    }

    fn list_contains(&self, list: &Selector, field: &str, value: &str) -> bool {
        PlistDocument::list_contains(self, list, field, value)
    }

    fn append(&mut self, list: &Selector, fragment: &plist::Value) -> EditResult<()> {
        PlistDocument::append(self, list, fragment)
    }
}
