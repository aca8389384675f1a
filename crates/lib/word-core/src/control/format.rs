use serde::{Deserialize, Serialize};
use word_ooxml::XmlElement;

use crate::body::{RunFormat, body_paragraph_position, isolate_char_range, match_text, val};
use crate::styles::{find_style, style_key, styles_part};

use super::{ControlError, DocumentControl, require_text};

/// Input payload for `create_custom_style`.
#[derive(Debug, Clone, Default)]
pub struct CustomStyleRequest {
    pub style_name: String,
    pub format: RunFormat,
    pub base_style: Option<String>,
}

/// Input payload for `format_text`. Positions are 0-based chars, end exclusive.
#[derive(Debug, Clone, Default)]
pub struct FormatTextRequest {
    pub paragraph_index: usize,
    pub start_pos: usize,
    pub end_pos: usize,
    pub format: RunFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleSaved {
    pub style_id: String,
    pub style_name: String,
    pub created: bool,
    pub based_on: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFormatted {
    pub paragraph_index: usize,
    pub formatted_text: String,
    pub runs: usize,
}

impl DocumentControl {
    /// Creates a paragraph style, or updates its run properties when it exists.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an unknown base style or bad formatting values.
    pub async fn create_custom_style(
        &self,
        filename: &str,
        request: CustomStyleRequest,
    ) -> Result<StyleSaved, ControlError> {
        require_text(&request.style_name, "style_name")?;
        request.format.validate()?;
        self.edit(filename, "create_custom_style", |doc| {
            let (part, mut styles) = styles_part(doc)?;
            let based_on = match request
                .base_style
                .as_deref()
                .filter(|base| !base.trim().is_empty())
            {
                Some(base) => Some(
                    find_style(&styles.root, base)
                        .and_then(|style| style.attr("w:styleId"))
                        .map(ToString::to_string)
                        .ok_or_else(|| {
                            ControlError::InvalidInput(format!("Base style '{base}' not found"))
                        })?,
                ),
                None => None,
            };

            let key = style_key(&request.style_name);
            let existing = styles.root.children.iter().position(|node| {
                node.as_element().is_some_and(|style| {
                    style.is("w:style")
                        && (style.attr("w:styleId").is_some_and(|id| style_key(id) == key)
                            || style
                                .child("w:name")
                                .and_then(|name| name.attr("w:val"))
                                .is_some_and(|name| style_key(name) == key))
                })
            });
            let created = existing.is_none();
            let style_id = match existing {
                Some(position) => {
                    let style = styles.root.children[position]
                        .as_element_mut()
                        .ok_or_else(|| ControlError::Unsupported("style is not an element".into()))?;
                    update_style(style, based_on.as_deref(), &request.format);
                    style.attr("w:styleId").unwrap_or_default().to_string()
                }
                None => {
                    let style_id = unique_style_id(&styles.root, &request.style_name);
                    let mut style = XmlElement::new("w:style")
                        .with_attr("w:type", "paragraph")
                        .with_attr("w:customStyle", "1")
                        .with_attr("w:styleId", &style_id)
                        .with_child(val("w:name", &request.style_name));
                    update_style(&mut style, based_on.as_deref(), &request.format);
                    style.push(XmlElement::new("w:qFormat"));
                    styles.root.push(style);
                    style_id
                }
            };
            doc.set_part_xml(&part, &styles);
            Ok(StyleSaved {
                style_id,
                style_name: request.style_name.clone(),
                created,
                based_on,
            })
        })
        .await
    }

    /// Formats a character range of a body paragraph, splitting runs at the
    /// range boundaries.
    ///
    /// # Errors
    /// Returns `InvalidInput` unless `start_pos < end_pos <= len`.
    pub async fn format_text(
        &self,
        filename: &str,
        request: FormatTextRequest,
    ) -> Result<TextFormatted, ControlError> {
        request.format.validate()?;
        self.edit(filename, "format_text", |doc| {
            let body = doc.body_mut()?;
            let position = body_paragraph_position(body, request.paragraph_index)?;
            let paragraph = body.children[position]
                .as_element_mut()
                .ok_or_else(|| ControlError::Unsupported("paragraph is not an element".into()))?;
            let text = match_text(paragraph);
            let length = text.chars().count();
            if request.start_pos >= request.end_pos || request.end_pos > length {
                return Err(ControlError::InvalidInput(format!(
                    "Invalid text positions {}..{}. Paragraph has {length} characters; \
                     start_pos must be less than end_pos and end_pos at most {length}.",
                    request.start_pos, request.end_pos
                )));
            }
            let formatted_text: String = text
                .chars()
                .skip(request.start_pos)
                .take(request.end_pos - request.start_pos)
                .collect();
            let paths = isolate_char_range(paragraph, request.start_pos, request.end_pos);
            for path in &paths {
                if let Some(run) = paragraph.at_path_mut(path) {
                    request.format.apply_to_run(run);
                }
            }
            Ok(TextFormatted {
                paragraph_index: request.paragraph_index,
                formatted_text,
                runs: paths.len(),
            })
        })
        .await
    }
}

fn update_style(style: &mut XmlElement, based_on: Option<&str>, format: &RunFormat) {
    if let Some(base) = based_on {
        style.remove_children_named("w:basedOn");
        let insert_at = style.child_index("w:name").map_or(0, |index| index + 1);
        style.insert(insert_at, val("w:basedOn", base));
    }
    if format.is_empty() {
        return;
    }
    if style.child("w:rPr").is_none() {
        style.push(XmlElement::new("w:rPr"));
    }
    if let Some(rpr) = style.child_mut("w:rPr") {
        format.apply_to_rpr(rpr);
    }
}

/// Style id from a display name: alphanumerics only, suffixed until unique.
fn unique_style_id(styles: &XmlElement, name: &str) -> String {
    let base: String = name.chars().filter(char::is_ascii_alphanumeric).collect();
    let base = if base.is_empty() {
        "CustomStyle".to_string()
    } else {
        base
    };
    let taken = |id: &str| {
        styles
            .children_named("w:style")
            .any(|style| style.attr("w:styleId") == Some(id))
    };
    let mut candidate = base.clone();
    let mut suffix = 1;
    while taken(&candidate) {
        candidate = format!("{base}{suffix}");
        suffix += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{new_paragraph, run_text};

    #[test]
    fn style_ids_are_unique() {
        let styles = XmlElement::new("w:styles")
            .with_child(XmlElement::new("w:style").with_attr("w:styleId", "MyStyle"))
            .with_child(XmlElement::new("w:style").with_attr("w:styleId", "MyStyle1"));
        assert_eq!(unique_style_id(&styles, "My Style"), "MyStyle2");
        assert_eq!(unique_style_id(&styles, "Quote Block"), "QuoteBlock");
        assert_eq!(unique_style_id(&styles, "???"), "CustomStyle");
    }

    #[test]
    fn update_style_sets_base_after_name() {
        let mut style = XmlElement::new("w:style").with_child(val("w:name", "Callout"));
        let format = RunFormat {
            bold: Some(true),
            color: Some("#1f4e79".into()),
            ..RunFormat::default()
        };
        update_style(&mut style, Some("Normal"), &format);
        let names: Vec<_> = style.elements().map(|el| el.name.as_str()).collect();
        assert_eq!(names, vec!["w:name", "w:basedOn", "w:rPr"]);
        let rpr = style.child("w:rPr").expect("rPr");
        assert!(rpr.child("w:b").is_some());
        assert_eq!(rpr.child("w:color").and_then(|c| c.attr("w:val")), Some("1F4E79"));
    }

    #[test]
    fn char_range_formatting_splits_runs() {
        let mut paragraph = new_paragraph("Hello world", None);
        let paths = isolate_char_range(&mut paragraph, 6, 11);
        assert_eq!(paths.len(), 1);
        let texts: Vec<_> = paragraph.children_named("w:r").map(run_text).collect();
        assert_eq!(texts, vec!["Hello ", "world"]);
    }
}
