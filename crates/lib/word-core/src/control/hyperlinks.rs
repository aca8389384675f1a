use serde::{Deserialize, Serialize};
use word_ooxml::schema::{NS_R, REL_HYPERLINK};
use word_ooxml::{Relationships, XmlElement, XmlNode};

use crate::body::{
    MatchLimit, RPR_ORDER, RunFormat, body_paragraph_ordinal, body_paragraph_position,
    for_each_match, paragraph_paths, paragraph_text, set_ordered, val,
};
use crate::styles::ensure_builtin_styles;

use super::{ControlError, DocumentControl, require_text};

const HYPERLINK_COLOR: &str = "0563C1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HyperlinkAction {
    Add,
    List,
    Remove,
}

impl HyperlinkAction {
    /// # Errors
    /// Returns `InvalidInput` for anything but `add`, `list`, or `remove`.
    pub fn parse(value: &str) -> Result<Self, ControlError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "list" => Ok(Self::List),
            "remove" => Ok(Self::Remove),
            other => Err(ControlError::InvalidInput(format!(
                "Invalid action '{other}'. Use 'add', 'list', or 'remove'."
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HyperlinkInfo {
    pub text: String,
    /// External URL, or `#anchor` for internal links.
    pub target: String,
    pub relationship_id: Option<String>,
    pub paragraph_index: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperlinkReport {
    pub action: HyperlinkAction,
    pub count: usize,
    pub hyperlinks: Vec<HyperlinkInfo>,
    pub message: String,
}

impl DocumentControl {
    /// Adds, lists, or removes hyperlinks.
    ///
    /// # Errors
    /// Returns `InvalidInput` for missing arguments and `NotFound` when the
    /// text to link does not occur.
    pub async fn manage_hyperlinks(
        &self,
        filename: &str,
        action: HyperlinkAction,
        text: Option<&str>,
        url: Option<&str>,
        paragraph_index: Option<usize>,
    ) -> Result<HyperlinkReport, ControlError> {
        let text = text.filter(|value| !value.is_empty());
        let url = url.map(str::trim).filter(|value| !value.is_empty());
        match action {
            HyperlinkAction::List => {
                self.inspect(filename, "manage_hyperlinks", |doc| {
                    let rels = doc.main_relationships()?;
                    let hyperlinks = list_hyperlinks(doc.body()?, &rels);
                    Ok(HyperlinkReport {
                        action,
                        count: hyperlinks.len(),
                        message: format!("Found {} hyperlink(s)", hyperlinks.len()),
                        hyperlinks,
                    })
                })
                .await
            }
            HyperlinkAction::Add => {
                let text = text.unwrap_or_default();
                require_text(text, "text")?;
                let url = url.ok_or_else(|| {
                    ControlError::InvalidInput("url is required to add a hyperlink".to_string())
                })?;
                self.edit(filename, "manage_hyperlinks", |doc| {
                    let mut rels = doc.main_relationships()?;
                    let relationship_id = rels.add(REL_HYPERLINK, url, true);
                    let body = doc.body_mut()?;
                    let paths = match paragraph_index {
                        Some(index) => vec![vec![body_paragraph_position(body, index)?]],
                        None => paragraph_paths(body),
                    };
                    let mut linked_path = None;
                    let found = for_each_match(body, &paths, text, MatchLimit::First, &mut |ctx| {
                        let Some(container) = ctx.paragraph.at_path_mut(&ctx.site.parent) else {
                            return Ok(ctx.end);
                        };
                        if container.is("w:hyperlink") {
                            return Err(ControlError::InvalidInput(format!(
                                "Text '{text}' is already part of a hyperlink"
                            )));
                        }
                        let link = hyperlink_element(
                            &relationship_id,
                            container.children.drain(ctx.site.range()).collect(),
                        );
                        container.insert(ctx.site.first, link);
                        linked_path = Some(ctx.path.to_vec());
                        Ok(ctx.end)
                    })?;
                    if found == 0 {
                        return Err(ControlError::NotFound(format!(
                            "Text '{text}' not found in document"
                        )));
                    }
                    let paragraph_index = linked_path
                        .as_deref()
                        .and_then(|path| body_paragraph_ordinal(body, path));
                    doc.root_mut().ensure_namespace("r", NS_R);
                    doc.set_main_relationships(&rels);
                    ensure_builtin_styles(doc, &["Hyperlink"])?;
                    Ok(HyperlinkReport {
                        action,
                        count: 1,
                        hyperlinks: vec![HyperlinkInfo {
                            text: text.to_string(),
                            target: url.to_string(),
                            relationship_id: Some(relationship_id.clone()),
                            paragraph_index,
                        }],
                        message: format!("Linked '{text}' to {url}"),
                    })
                })
                .await
            }
            HyperlinkAction::Remove => {
                if text.is_none() && url.is_none() {
                    return Err(ControlError::InvalidInput(
                        "text or url is required to remove hyperlinks".to_string(),
                    ));
                }
                self.edit(filename, "manage_hyperlinks", |doc| {
                    let mut rels = doc.main_relationships()?;
                    let selector = LinkSelector { text, url };
                    let removed = remove_hyperlinks(doc.body_mut()?, &rels, &selector);
                    if removed.is_empty() {
                        doc.discard_changes();
                    } else {
                        let still_used = referenced_ids(doc.root());
                        for info in &removed {
                            if let Some(id) = &info.relationship_id
                                && !still_used.contains(id)
                            {
                                rels.remove(id);
                            }
                        }
                        doc.set_main_relationships(&rels);
                    }
                    Ok(HyperlinkReport {
                        action,
                        count: removed.len(),
                        message: format!("Removed {} hyperlink(s)", removed.len()),
                        hyperlinks: removed,
                    })
                })
                .await
            }
        }
    }
}

fn hyperlink_element(relationship_id: &str, runs: Vec<XmlNode>) -> XmlElement {
    let format = RunFormat {
        color: Some(HYPERLINK_COLOR.to_string()),
        underline: Some(true),
        ..RunFormat::default()
    };
    let mut link = XmlElement::new("w:hyperlink")
        .with_attr("r:id", relationship_id)
        .with_attr("w:history", "1");
    for node in runs {
        if let XmlNode::Element(mut run) = node {
            let rpr = run.ensure_first_child("w:rPr");
            set_ordered(rpr, val("w:rStyle", "Hyperlink"), RPR_ORDER);
            format.apply_to_rpr(rpr);
            link.push(run);
        }
    }
    link
}

fn link_info(link: &XmlElement, rels: &Relationships, paragraph_index: Option<usize>) -> HyperlinkInfo {
    let relationship_id = link.attr("r:id").map(ToString::to_string);
    let target = match (&relationship_id, link.attr("w:anchor")) {
        (Some(id), _) => rels.get(id).map(|rel| rel.target.clone()).unwrap_or_default(),
        (None, Some(anchor)) => format!("#{anchor}"),
        (None, None) => String::new(),
    };
    HyperlinkInfo {
        text: paragraph_text(link),
        target,
        relationship_id,
        paragraph_index,
    }
}

fn list_hyperlinks(body: &XmlElement, rels: &Relationships) -> Vec<HyperlinkInfo> {
    paragraph_paths(body)
        .into_iter()
        .filter_map(|path| Some((body.at_path(&path)?, body_paragraph_ordinal(body, &path))))
        .flat_map(|(paragraph, ordinal)| {
            paragraph
                .descendants_named("w:hyperlink")
                .map(|link| link_info(link, rels, ordinal))
                .collect::<Vec<_>>()
        })
        .collect()
}

struct LinkSelector<'a> {
    text: Option<&'a str>,
    url: Option<&'a str>,
}

impl LinkSelector<'_> {
    fn matches(&self, info: &HyperlinkInfo) -> bool {
        self.text.is_some_and(|text| info.text.contains(text))
            || self.url.is_some_and(|url| info.target == url)
    }
}

/// Unwraps matching hyperlinks in body paragraphs and returns what was removed.
fn remove_hyperlinks(
    body: &mut XmlElement,
    rels: &Relationships,
    selector: &LinkSelector<'_>,
) -> Vec<HyperlinkInfo> {
    let mut removed = Vec::new();
    for path in paragraph_paths(body) {
        let ordinal = body_paragraph_ordinal(body, &path);
        if let Some(paragraph) = body.at_path_mut(&path) {
            unwrap_links(paragraph, rels, selector, ordinal, &mut removed);
        }
    }
    removed
}

fn unwrap_links(
    element: &mut XmlElement,
    rels: &Relationships,
    selector: &LinkSelector<'_>,
    ordinal: Option<usize>,
    removed: &mut Vec<HyperlinkInfo>,
) {
    let mut index = 0;
    while index < element.children.len() {
        let matched = element.children[index]
            .as_element()
            .filter(|child| child.is("w:hyperlink"))
            .map(|link| link_info(link, rels, ordinal))
            .filter(|info| selector.matches(info));
        if let Some(info) = matched {
            removed.push(info);
            if let XmlNode::Element(link) = element.children.remove(index) {
                let runs = link.children.len();
                for (offset, mut node) in link.children.into_iter().enumerate() {
                    if let Some(run) = node.as_element_mut() {
                        strip_hyperlink_style(run);
                    }
                    element.children.insert(index + offset, node);
                }
                index += runs;
            }
            continue;
        }
        if let Some(child) = element.children[index].as_element_mut() {
            unwrap_links(child, rels, selector, ordinal, removed);
        }
        index += 1;
    }
}

fn strip_hyperlink_style(run: &mut XmlElement) {
    if let Some(rpr) = run.child_mut("w:rPr") {
        rpr.children.retain(|node| {
            !node.as_element().is_some_and(|el| {
                (el.is("w:rStyle") && el.attr("w:val") == Some("Hyperlink"))
                    || (el.is("w:color") && el.attr("w:val") == Some(HYPERLINK_COLOR))
                    || el.is("w:u")
            })
        });
    }
}

fn referenced_ids(root: &XmlElement) -> Vec<String> {
    root.descendants()
        .filter_map(|el| el.attr("r:id").map(ToString::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{match_text, new_paragraph, new_run};

    fn rels_with_link() -> Relationships {
        let mut rels = Relationships::new();
        rels.add(REL_HYPERLINK, "https://example.com", true);
        rels
    }

    #[test]
    fn wraps_runs_with_hyperlink_formatting() {
        let link = hyperlink_element("rId1", vec![XmlNode::Element(new_run("site"))]);
        let run = link.child("w:r").expect("run");
        let rpr = run.child("w:rPr").expect("rPr");
        let names: Vec<_> = rpr.elements().map(|el| el.name.as_str()).collect();
        assert_eq!(names, vec!["w:rStyle", "w:color", "w:u"]);
        assert_eq!(link.attr("r:id"), Some("rId1"));
    }

    #[test]
    fn lists_and_removes_by_url() {
        let rels = rels_with_link();
        let mut body = XmlElement::new("w:body").with_child(
            new_paragraph("Visit ", None)
                .with_child(hyperlink_element("rId1", vec![XmlNode::Element(new_run("our site"))]))
                .with_child(
                    XmlElement::new("w:hyperlink")
                        .with_attr("w:anchor", "intro")
                        .with_child(new_run(" intro")),
                ),
        );
        let listed = list_hyperlinks(&body, &rels);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].target, "https://example.com");
        assert_eq!(listed[1].target, "#intro");

        let selector = LinkSelector {
            text: None,
            url: Some("https://example.com"),
        };
        let removed = remove_hyperlinks(&mut body, &rels, &selector);
        assert_eq!(removed.len(), 1);
        let paragraph = body.child("w:p").expect("p");
        assert_eq!(match_text(paragraph), "Visit our site intro");
        assert_eq!(paragraph.descendants_named("w:hyperlink").count(), 1);
        assert!(paragraph.descendants_named("w:rStyle").next().is_none());
    }

    #[test]
    fn action_parsing() {
        assert_eq!(HyperlinkAction::parse(" LIST ").expect("ok"), HyperlinkAction::List);
        assert!(HyperlinkAction::parse("edit").is_err());
    }
}
