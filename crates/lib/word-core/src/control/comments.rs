use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use word_ooxml::schema::{CT_COMMENTS, NS_R, NS_W, REL_COMMENTS};
use word_ooxml::{XmlDocument, XmlElement};

use crate::body::{
    MatchLimit, RPR_ORDER, body_paragraph_ordinal, body_paragraph_positions, for_each_match,
    max_numeric_attr, new_run, paragraph_paths, paragraph_text, set_ordered,
    set_paragraph_style, val,
};
use crate::document::Document;
use crate::styles::ensure_builtin_styles;

use super::{ControlError, DocumentControl, require_text, utc_timestamp};

const COMMENTS_PART: &str = "word/comments.xml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentInfo {
    pub id: String,
    pub author: String,
    pub initials: String,
    pub date: Option<String>,
    pub text: String,
    /// Document text between the comment's range markers.
    pub anchor_text: String,
    pub paragraph_index: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentList {
    pub total_comments: usize,
    pub comments: Vec<CommentInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentAdded {
    pub comment_id: String,
    pub author: String,
    pub initials: String,
    pub paragraph_index: Option<usize>,
}

impl DocumentControl {
    /// # Errors
    /// Returns `ControlError` when the document cannot be read.
    pub async fn get_all_comments(&self, filename: &str) -> Result<CommentList, ControlError> {
        self.inspect(filename, "get_all_comments", |doc| {
            Ok(CommentList::from(read_comments(doc)?))
        })
        .await
    }

    /// Comments whose author matches `author`, ignoring case.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a blank author.
    pub async fn get_comments_by_author(
        &self,
        filename: &str,
        author: &str,
    ) -> Result<CommentList, ControlError> {
        require_text(author, "author")?;
        let wanted = author.trim().to_lowercase();
        self.inspect(filename, "get_comments_by_author", |doc| {
            let comments = read_comments(doc)?
                .into_iter()
                .filter(|comment| comment.author.to_lowercase() == wanted)
                .collect::<Vec<_>>();
            Ok(CommentList::from(comments))
        })
        .await
    }

    /// # Errors
    /// Returns `InvalidInput` for an out-of-range paragraph index.
    pub async fn get_comments_for_paragraph(
        &self,
        filename: &str,
        paragraph_index: usize,
    ) -> Result<CommentList, ControlError> {
        self.inspect(filename, "get_comments_for_paragraph", |doc| {
            crate::body::body_paragraph_position(doc.body()?, paragraph_index)?;
            let comments = read_comments(doc)?
                .into_iter()
                .filter(|comment| comment.paragraph_index == Some(paragraph_index))
                .collect::<Vec<_>>();
            Ok(CommentList::from(comments))
        })
        .await
    }

    /// Anchors a comment on the first occurrence of `target_text`.
    ///
    /// # Errors
    /// Returns `NotFound` when the text does not occur in the body.
    pub async fn add_comment(
        &self,
        filename: &str,
        target_text: &str,
        comment_text: &str,
        author: Option<String>,
        initials: Option<String>,
    ) -> Result<CommentAdded, ControlError> {
        require_text(target_text, "target_text")?;
        require_text(comment_text, "comment_text")?;
        let author = self.author_or_default(author);
        let initials = self.initials_or_default(initials, &author);
        self.edit(filename, "add_comment", |doc| {
            let (part, mut comments) = comments_part(doc)?;
            let any_id = |el: &XmlElement| el.attr("w:id").is_some();
            let comment_id = max_numeric_attr(&comments.root, "w:id", &any_id)
                .max(max_numeric_attr(doc.root(), "w:id", &any_id))
                .map_or(0, |max| max + 1)
                .to_string();

            let body = doc.body_mut()?;
            let paths = paragraph_paths(body);
            let mut anchored_path = None;
            let found = for_each_match(body, &paths, target_text, MatchLimit::First, &mut |ctx| {
                let Some(container) = ctx.paragraph.at_path_mut(&ctx.site.parent) else {
                    return Ok(ctx.end);
                };
                container.insert(ctx.site.last + 1, comment_reference_run(&comment_id));
                container.insert(
                    ctx.site.last + 1,
                    XmlElement::new("w:commentRangeEnd").with_attr("w:id", &comment_id),
                );
                container.insert(
                    ctx.site.first,
                    XmlElement::new("w:commentRangeStart").with_attr("w:id", &comment_id),
                );
                anchored_path = Some(ctx.path.to_vec());
                Ok(ctx.end)
            })?;
            if found == 0 {
                return Err(ControlError::NotFound(format!(
                    "Text '{target_text}' not found in document"
                )));
            }
            let paragraph_index = anchored_path
                .as_deref()
                .and_then(|path| body_paragraph_ordinal(body, path));

            comments
                .root
                .push(comment_element(&comment_id, &author, &initials, comment_text));
            doc.set_part_xml(&part, &comments);
            ensure_builtin_styles(doc, &["CommentText", "CommentReference"])?;
            Ok(CommentAdded {
                comment_id,
                author: author.clone(),
                initials: initials.clone(),
                paragraph_index,
            })
        })
        .await
    }
}

impl From<Vec<CommentInfo>> for CommentList {
    fn from(comments: Vec<CommentInfo>) -> Self {
        Self {
            total_comments: comments.len(),
            comments,
        }
    }
}

fn comments_part(doc: &mut Document) -> Result<(String, XmlDocument), ControlError> {
    doc.ensure_related(REL_COMMENTS, COMMENTS_PART, CT_COMMENTS, || {
        XmlDocument::new(
            XmlElement::new("w:comments")
                .with_attr("xmlns:w", NS_W)
                .with_attr("xmlns:r", NS_R),
        )
    })
}

fn comment_reference_run(id: &str) -> XmlElement {
    let mut run = XmlElement::new("w:r");
    let rpr = run.ensure_first_child("w:rPr");
    set_ordered(rpr, val("w:rStyle", "CommentReference"), RPR_ORDER);
    run.push(XmlElement::new("w:commentReference").with_attr("w:id", id));
    run
}

fn comment_element(id: &str, author: &str, initials: &str, text: &str) -> XmlElement {
    let mut comment = XmlElement::new("w:comment")
        .with_attr("w:id", id)
        .with_attr("w:author", author)
        .with_attr("w:date", utc_timestamp())
        .with_attr("w:initials", initials);
    for (line_number, line) in text.lines().enumerate() {
        let mut paragraph = XmlElement::new("w:p");
        set_paragraph_style(&mut paragraph, "CommentText");
        if line_number == 0 {
            let mut marker = XmlElement::new("w:r");
            set_ordered(
                marker.ensure_first_child("w:rPr"),
                val("w:rStyle", "CommentReference"),
                RPR_ORDER,
            );
            marker.push(XmlElement::new("w:annotationRef"));
            paragraph.push(marker);
        }
        paragraph.push(new_run(line));
        comment.push(paragraph);
    }
    comment
}

/// Comments in `comments.xml` order, joined with their anchors in the body.
pub(crate) fn read_comments(doc: &Document) -> Result<Vec<CommentInfo>, ControlError> {
    let Some((_, comments)) = doc.load_related(REL_COMMENTS)? else {
        return Ok(Vec::new());
    };
    let anchors = collect_anchors(doc.body()?);
    Ok(comments
        .root
        .children_named("w:comment")
        .map(|comment| {
            let id = comment.attr("w:id").unwrap_or_default().to_string();
            let anchor = anchors.get(&id);
            CommentInfo {
                author: comment.attr("w:author").unwrap_or_default().to_string(),
                initials: comment.attr("w:initials").unwrap_or_default().to_string(),
                date: comment.attr("w:date").map(ToString::to_string),
                text: comment
                    .children_named("w:p")
                    .map(paragraph_text)
                    .collect::<Vec<_>>()
                    .join("\n"),
                anchor_text: anchor.map(|a| a.text.clone()).unwrap_or_default(),
                paragraph_index: anchor.and_then(|a| a.paragraph_index),
                id,
            }
        })
        .collect())
}

#[derive(Debug, Default)]
struct Anchor {
    text: String,
    paragraph_index: Option<usize>,
}

/// Walks the body in document order, collecting the text inside each
/// comment range and the paragraph where each comment starts.
fn collect_anchors(body: &XmlElement) -> BTreeMap<String, Anchor> {
    let paragraph_positions = body_paragraph_positions(body);
    let mut anchors: BTreeMap<String, Anchor> = BTreeMap::new();
    let mut active: HashSet<String> = HashSet::new();
    for (position, node) in body.children.iter().enumerate() {
        let Some(block) = node.as_element() else {
            continue;
        };
        let ordinal = paragraph_positions.iter().position(|p| *p == position);
        visit_anchor_nodes(block, ordinal, &mut anchors, &mut active);
    }
    anchors
}

fn visit_anchor_nodes(
    element: &XmlElement,
    ordinal: Option<usize>,
    anchors: &mut BTreeMap<String, Anchor>,
    active: &mut HashSet<String>,
) {
    let id = || element.attr("w:id").unwrap_or_default().to_string();
    match element.name.as_str() {
        "w:commentRangeStart" => {
            let anchor = anchors.entry(id()).or_default();
            anchor.paragraph_index = anchor.paragraph_index.or(ordinal);
            active.insert(id());
        }
        "w:commentRangeEnd" => {
            active.remove(&id());
        }
        "w:commentReference" => {
            let anchor = anchors.entry(id()).or_default();
            anchor.paragraph_index = anchor.paragraph_index.or(ordinal);
        }
        "w:t" => {
            let text = element.text();
            for open in active.iter() {
                anchors.entry(open.clone()).or_default().text.push_str(&text);
            }
        }
        "w:del" | "w:txbxContent" => {}
        _ => {
            for child in element.elements() {
                visit_anchor_nodes(child, ordinal, anchors, active);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::content::blank_document;
    use crate::control::content::append_block;
    use crate::body::new_paragraph;

    #[test]
    fn anchors_follow_range_markers() {
        let body = XmlElement::new("w:body")
            .with_child(new_paragraph("intro", None))
            .with_child(
                XmlElement::new("w:p")
                    .with_child(new_run("see "))
                    .with_child(XmlElement::new("w:commentRangeStart").with_attr("w:id", "3"))
                    .with_child(new_run("this"))
                    .with_child(new_run(" part"))
                    .with_child(XmlElement::new("w:commentRangeEnd").with_attr("w:id", "3"))
                    .with_child(comment_reference_run("3")),
            );
        let anchors = collect_anchors(&body);
        let anchor = anchors.get("3").expect("anchor");
        assert_eq!(anchor.text, "this part");
        assert_eq!(anchor.paragraph_index, Some(1));
    }

    #[test]
    fn comments_round_trip_through_document() {
        let mut doc = blank_document();
        append_block(doc.body_mut().expect("body"), new_paragraph("alpha beta", None));
        let (part, mut comments) = comments_part(&mut doc).expect("comments part");
        comments.root.push(comment_element("0", "Ann Lee", "AL", "Check\nthis"));
        doc.set_part_xml(&part, &comments);

        let read = read_comments(&doc).expect("comments");
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].author, "Ann Lee");
        assert_eq!(read[0].text, "Check\nthis");
        assert_eq!(read[0].paragraph_index, None);
        assert!(read[0].date.is_some());
    }
}
