//! Tracked insertions (`w:ins`) and deletions (`w:del`).

use serde::{Deserialize, Serialize};
use word_ooxml::{XmlElement, XmlNode};

use crate::body::{
    MatchLimit, body_paragraph_ordinal, for_each_match, max_numeric_attr, new_run,
    paragraph_paths, paragraph_text,
};
use crate::document::Document;

use super::documents::truncate_chars;
use super::{ControlError, DocumentControl, require_text, utc_timestamp};

const CONTEXT_CHARS: usize = 100;

/// Selects tracked changes by author and id; both conditions must hold.
#[derive(Debug, Clone, Default)]
pub struct ChangeFilter {
    pub author: Option<String>,
    pub change_ids: Vec<String>,
}

impl ChangeFilter {
    fn matches(&self, change: &XmlElement) -> bool {
        let author_ok = self
            .author
            .as_deref()
            .filter(|author| !author.trim().is_empty())
            .is_none_or(|author| {
                change
                    .attr("w:author")
                    .is_some_and(|found| found.eq_ignore_ascii_case(author.trim()))
            });
        let id_ok = self.change_ids.is_empty()
            || change
                .attr("w:id")
                .is_some_and(|id| self.change_ids.iter().any(|wanted| wanted.trim() == id));
        author_ok && id_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insertion,
    Deletion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedChange {
    pub id: String,
    pub kind: ChangeKind,
    pub author: String,
    pub date: Option<String>,
    pub text: String,
    pub paragraph_index: Option<usize>,
    pub paragraph_context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedChangeList {
    pub total_changes: usize,
    pub insertions: usize,
    pub deletions: usize,
    pub changes: Vec<TrackedChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedEdit {
    pub changes: usize,
    pub author: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangesResolved {
    pub count: usize,
    pub message: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Accept,
    Reject,
}

/// Revision attributes shared by every change made in one operation.
struct Revision {
    next_id: i64,
    author: String,
    date: String,
}

impl Revision {
    fn for_document(doc: &Document, author: String) -> Self {
        let next_id = max_numeric_attr(doc.root(), "w:id", &|_| true).map_or(1, |max| max + 1);
        Self {
            next_id,
            author,
            date: utc_timestamp(),
        }
    }

    fn wrapper(&mut self, name: &str) -> XmlElement {
        let element = XmlElement::new(name)
            .with_attr("w:id", self.next_id.to_string())
            .with_attr("w:author", &self.author)
            .with_attr("w:date", &self.date);
        self.next_id += 1;
        element
    }
}

impl DocumentControl {
    /// Marks every occurrence of `old_text` deleted and inserts `new_text` after it.
    ///
    /// # Errors
    /// Returns `NotFound` when `old_text` does not occur.
    pub async fn track_replace(
        &self,
        filename: &str,
        old_text: &str,
        new_text: &str,
        author: Option<String>,
    ) -> Result<TrackedEdit, ControlError> {
        if old_text.is_empty() {
            return Err(ControlError::InvalidInput("old_text is required".to_string()));
        }
        let author = self.author_or_default(author);
        self.edit(filename, "track_replace", |doc| {
            let mut revision = Revision::for_document(doc, author.clone());
            let changes = tracked_rewrite(doc, old_text, MatchLimit::All, &mut |container, first, last| {
                let inserted_rpr = container
                    .at_path(&[first])
                    .and_then(|run| run.child("w:rPr"))
                    .cloned();
                let deletion = mark_deleted(container, first, last, &mut revision);
                container.insert(first, deletion);
                if !new_text.is_empty() {
                    let mut run = new_run(new_text);
                    if let Some(rpr) = inserted_rpr {
                        run.insert(0, rpr);
                    }
                    container.insert(first + 1, revision.wrapper("w:ins").with_child(run));
                }
                new_text.len()
            })?;
            require_match(changes, old_text)?;
            Ok(TrackedEdit {
                changes,
                author: author.clone(),
                message: format!("Tracked replacement of {changes} occurrence(s) of '{old_text}'"),
            })
        })
        .await
    }

    /// Inserts `insert_text` as a tracked insertion right after the first
    /// occurrence of `after_text`.
    ///
    /// # Errors
    /// Returns `NotFound` when `after_text` does not occur.
    pub async fn track_insert(
        &self,
        filename: &str,
        after_text: &str,
        insert_text: &str,
        author: Option<String>,
    ) -> Result<TrackedEdit, ControlError> {
        if after_text.is_empty() {
            return Err(ControlError::InvalidInput("after_text is required".to_string()));
        }
        require_text(insert_text, "insert_text")?;
        let author = self.author_or_default(author);
        self.edit(filename, "track_insert", |doc| {
            let mut revision = Revision::for_document(doc, author.clone());
            let changes = tracked_rewrite(doc, after_text, MatchLimit::First, &mut |container, _, last| {
                let mut run = new_run(insert_text);
                if let Some(rpr) = container
                    .at_path(&[last])
                    .and_then(|run| run.child("w:rPr"))
                    .cloned()
                {
                    run.insert(0, rpr);
                }
                container.insert(last + 1, revision.wrapper("w:ins").with_child(run));
                after_text.len() + insert_text.len()
            })?;
            require_match(changes, after_text)?;
            Ok(TrackedEdit {
                changes,
                author: author.clone(),
                message: format!("Tracked insertion after '{after_text}'"),
            })
        })
        .await
    }

    /// Marks every occurrence of `text` as a tracked deletion.
    ///
    /// # Errors
    /// Returns `NotFound` when `text` does not occur.
    pub async fn track_delete(
        &self,
        filename: &str,
        text: &str,
        author: Option<String>,
    ) -> Result<TrackedEdit, ControlError> {
        if text.is_empty() {
            return Err(ControlError::InvalidInput("text is required".to_string()));
        }
        let author = self.author_or_default(author);
        self.edit(filename, "track_delete", |doc| {
            let mut revision = Revision::for_document(doc, author.clone());
            let changes = tracked_rewrite(doc, text, MatchLimit::All, &mut |container, first, last| {
                let deletion = mark_deleted(container, first, last, &mut revision);
                container.insert(first, deletion);
                0
            })?;
            require_match(changes, text)?;
            Ok(TrackedEdit {
                changes,
                author: author.clone(),
                message: format!("Tracked deletion of {changes} occurrence(s) of '{text}'"),
            })
        })
        .await
    }

    /// # Errors
    /// Returns `ControlError` when the document cannot be read.
    pub async fn list_tracked_changes(
        &self,
        filename: &str,
    ) -> Result<TrackedChangeList, ControlError> {
        self.inspect(filename, "list_tracked_changes", |doc| {
            let changes = collect_changes(doc.body()?);
            let insertions = changes
                .iter()
                .filter(|change| change.kind == ChangeKind::Insertion)
                .count();
            Ok(TrackedChangeList {
                total_changes: changes.len(),
                insertions,
                deletions: changes.len() - insertions,
                changes,
            })
        })
        .await
    }

    /// Keeps matching insertions and drops matching deletions.
    ///
    /// # Errors
    /// Returns `ControlError` when the document cannot be read or written.
    pub async fn accept_tracked_changes(
        &self,
        filename: &str,
        filter: ChangeFilter,
    ) -> Result<ChangesResolved, ControlError> {
        self.resolve_changes(filename, filter, Resolution::Accept).await
    }

    /// Drops matching insertions and restores matching deletions.
    ///
    /// # Errors
    /// Returns `ControlError` when the document cannot be read or written.
    pub async fn reject_tracked_changes(
        &self,
        filename: &str,
        filter: ChangeFilter,
    ) -> Result<ChangesResolved, ControlError> {
        self.resolve_changes(filename, filter, Resolution::Reject).await
    }

    async fn resolve_changes(
        &self,
        filename: &str,
        filter: ChangeFilter,
        resolution: Resolution,
    ) -> Result<ChangesResolved, ControlError> {
        let (operation, verb) = match resolution {
            Resolution::Accept => ("accept_tracked_changes", "Accepted"),
            Resolution::Reject => ("reject_tracked_changes", "Rejected"),
        };
        self.edit(filename, operation, |doc| {
            let count = resolve_in(doc.root_mut(), &filter, resolution);
            if count == 0 {
                doc.discard_changes();
                return Ok(ChangesResolved {
                    count,
                    message: "No matching tracked changes found".to_string(),
                });
            }
            Ok(ChangesResolved {
                count,
                message: format!("{verb} {count} tracked change(s)"),
            })
        })
        .await
    }
}

fn require_match(changes: usize, text: &str) -> Result<(), ControlError> {
    if changes == 0 {
        return Err(ControlError::NotFound(format!(
            "Text '{text}' not found in document"
        )));
    }
    Ok(())
}

/// Runs `rewrite` on each isolated occurrence of `needle` in the body. The
/// callback receives the run container and the isolated run positions, and
/// returns how many bytes of visible text now follow the match start.
fn tracked_rewrite(
    doc: &mut Document,
    needle: &str,
    limit: MatchLimit,
    rewrite: &mut dyn FnMut(&mut XmlElement, usize, usize) -> usize,
) -> Result<usize, ControlError> {
    let body = doc.body_mut()?;
    let paths = paragraph_paths(body);
    for_each_match(body, &paths, needle, limit, &mut |ctx| {
        let Some(container) = ctx.paragraph.at_path_mut(&ctx.site.parent) else {
            return Ok(ctx.end);
        };
        let advance = rewrite(container, ctx.site.first, ctx.site.last);
        Ok(ctx.start + advance)
    })
}

/// Removes runs `first..=last` from `container` and returns them inside a
/// `w:del`, with `w:t` turned into `w:delText`.
fn mark_deleted(
    container: &mut XmlElement,
    first: usize,
    last: usize,
    revision: &mut Revision,
) -> XmlElement {
    let mut deletion = revision.wrapper("w:del");
    let runs: Vec<XmlNode> = container.children.drain(first..=last).collect();
    for node in runs {
        if let XmlNode::Element(mut run) = node {
            run.walk_mut(&mut |element| {
                if element.is("w:t") {
                    element.name = "w:delText".to_string();
                }
            });
            deletion.push(run);
        }
    }
    deletion
}

fn collect_changes(body: &XmlElement) -> Vec<TrackedChange> {
    let mut changes = Vec::new();
    for path in paragraph_paths(body) {
        let Some(paragraph) = body.at_path(&path) else {
            continue;
        };
        let context = truncate_chars(&paragraph_text(paragraph), CONTEXT_CHARS);
        let paragraph_index = body_paragraph_ordinal(body, &path);
        let change_paths = paragraph.find_paths(&|el| el.is("w:ins") || el.is("w:del"));
        for change_path in change_paths {
            let Some(change) = paragraph.at_path(&change_path) else {
                continue;
            };
            if change.child("w:r").is_none() {
                continue;
            }
            let (kind, text) = if change.is("w:ins") {
                (
                    ChangeKind::Insertion,
                    change.descendants_named("w:t").map(XmlElement::text).collect(),
                )
            } else {
                (
                    ChangeKind::Deletion,
                    change
                        .descendants_named("w:delText")
                        .map(XmlElement::text)
                        .collect(),
                )
            };
            changes.push(TrackedChange {
                id: change.attr("w:id").unwrap_or_default().to_string(),
                kind,
                author: change.attr("w:author").unwrap_or_default().to_string(),
                date: change.attr("w:date").map(ToString::to_string),
                text,
                paragraph_index,
                paragraph_context: context.clone(),
            });
        }
    }
    changes
}

/// Accepts or rejects every matching change under `element`; returns how
/// many were resolved.
fn resolve_in(element: &mut XmlElement, filter: &ChangeFilter, resolution: Resolution) -> usize {
    let mut count = 0;
    let mut index = 0;
    while index < element.children.len() {
        let action = match element.children[index].as_element() {
            Some(child) if (child.is("w:ins") || child.is("w:del")) && filter.matches(child) => {
                let keep = matches!(
                    (child.is("w:ins"), resolution),
                    (true, Resolution::Accept) | (false, Resolution::Reject)
                );
                Some(keep)
            }
            _ => None,
        };
        match action {
            Some(keep) => {
                count += 1;
                let XmlNode::Element(mut change) = element.children.remove(index) else {
                    continue;
                };
                if keep {
                    if change.is("w:del") {
                        change.walk_mut(&mut |el| {
                            if el.is("w:delText") {
                                el.name = "w:t".to_string();
                            }
                        });
                    }
                    let restored = change.children.len();
                    for (offset, node) in change.children.into_iter().enumerate() {
                        element.children.insert(index + offset, node);
                    }
                    index += restored;
                }
            }
            None => {
                if let Some(child) = element.children[index].as_element_mut() {
                    count += resolve_in(child, filter, resolution);
                }
                index += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{match_text, new_paragraph};

    fn deleted_run(text: &str) -> XmlElement {
        let mut run = new_run(text);
        if let Some(t) = run.child_mut("w:t") {
            t.name = "w:delText".to_string();
        }
        run
    }

    fn revision(next_id: i64) -> Revision {
        Revision {
            next_id,
            author: "Reviewer".to_string(),
            date: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn mark_deleted_converts_text() {
        let mut paragraph = new_paragraph("gone", None);
        let mut rev = revision(7);
        let deletion = mark_deleted(&mut paragraph, 0, 0, &mut rev);
        assert_eq!(deletion.attr("w:id"), Some("7"));
        assert_eq!(rev.next_id, 8);
        assert!(deletion.descendants_named("w:t").next().is_none());
        assert_eq!(
            deletion.descendants_named("w:delText").map(XmlElement::text).collect::<String>(),
            "gone"
        );
        assert!(paragraph.child("w:r").is_none());
    }

    #[test]
    fn accept_and_reject_follow_filter() {
        let body = || {
            XmlElement::new("w:body").with_child(
                XmlElement::new("w:p")
                    .with_child(new_run("keep "))
                    .with_child(
                        revision(1).wrapper("w:del").with_child(deleted_run("old")),
                    )
                    .with_child(
                        revision(2).wrapper("w:ins").with_child(new_run("new")),
                    )
                    .with_child(
                        XmlElement::new("w:ins")
                            .with_attr("w:id", "9")
                            .with_attr("w:author", "Other")
                            .with_child(new_run("!")),
                    ),
            )
        };

        let mut accepted = body();
        let filter = ChangeFilter {
            author: Some("reviewer".into()),
            change_ids: Vec::new(),
        };
        assert_eq!(resolve_in(&mut accepted, &filter, Resolution::Accept), 2);
        let paragraph = accepted.child("w:p").expect("p");
        assert_eq!(match_text(paragraph), "keep new!");
        assert_eq!(collect_changes(&accepted).len(), 1);

        let mut rejected = body();
        let filter = ChangeFilter {
            author: None,
            change_ids: vec!["1".into(), "2".into()],
        };
        assert_eq!(resolve_in(&mut rejected, &filter, Resolution::Reject), 2);
        let paragraph = rejected.child("w:p").expect("p");
        assert_eq!(match_text(paragraph), "keep old!");

        let mut untouched = body();
        let nobody = ChangeFilter {
            author: Some("nobody".into()),
            change_ids: vec!["1".into()],
        };
        assert_eq!(resolve_in(&mut untouched, &nobody, Resolution::Accept), 0);
    }

    #[test]
    fn lists_changes_with_context() {
        let body = XmlElement::new("w:body").with_child(
            XmlElement::new("w:p")
                .with_child(new_run("Total: "))
                .with_child(revision(4).wrapper("w:del").with_child(deleted_run("10")))
                .with_child(revision(5).wrapper("w:ins").with_child(new_run("12"))),
        );
        let changes = collect_changes(&body);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].kind, ChangeKind::Deletion);
        assert_eq!(changes[0].text, "10");
        assert_eq!(changes[1].text, "12");
        assert_eq!(changes[1].paragraph_context, "Total: 12");
        assert_eq!(changes[1].paragraph_index, Some(0));
    }
}
