use serde::{Deserialize, Serialize};
use word_ooxml::schema::{NS_O, NS_V, NS_W10};
use word_ooxml::units::{inches_to_twips, parse_hex_color, points_to_twips, twips_to_inches};
use word_ooxml::{XmlDocument, XmlElement};

use crate::body::{
    PPR_ORDER, RPR_ORDER, body_paragraph_position, body_paragraph_positions, max_numeric_attr,
    new_run, set_ordered, val,
};
use crate::sections::{
    HeaderKind, SECTPR_ORDER, ensure_section_part, final_section_mut, section_mut, section_paths,
};

use super::content::insert_before_section;
use super::{ControlError, DocumentControl, require_text};

const DEFAULT_PAGE_WIDTH: i64 = 12240;
const DEFAULT_PAGE_HEIGHT: i64 = 15840;
const MAX_BOOKMARK_NAME: usize = 40;

#[derive(Debug, Clone, Default)]
pub struct PageLayoutRequest {
    pub section_index: usize,
    pub orientation: Option<String>,
    pub page_width_inches: Option<f64>,
    pub page_height_inches: Option<f64>,
    pub margin_top_inches: Option<f64>,
    pub margin_bottom_inches: Option<f64>,
    pub margin_left_inches: Option<f64>,
    pub margin_right_inches: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct HeaderFooterRequest {
    pub section_index: usize,
    pub header_text: Option<String>,
    pub footer_text: Option<String>,
    pub header_alignment: String,
    pub footer_alignment: String,
}

#[derive(Debug, Clone)]
pub struct PageNumberRequest {
    pub section_index: usize,
    pub position: String,
    pub alignment: String,
    pub prefix: String,
    pub suffix: String,
    pub include_total: bool,
}

impl Default for PageNumberRequest {
    fn default() -> Self {
        Self {
            section_index: 0,
            position: "footer".to_string(),
            alignment: "center".to_string(),
            prefix: String::new(),
            suffix: String::new(),
            include_total: false,
        }
    }
}

/// Which paragraphs `set_paragraph_spacing` touches and what it sets. With
/// neither an index nor a range, every body paragraph is updated.
#[derive(Debug, Clone, Default)]
pub struct SpacingRequest {
    pub paragraph_index: Option<usize>,
    pub start_paragraph: Option<usize>,
    pub end_paragraph: Option<usize>,
    pub space_before_pt: Option<f64>,
    pub space_after_pt: Option<f64>,
    pub line_spacing: Option<f64>,
    pub line_spacing_rule: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WatermarkRequest {
    pub text: String,
    pub font_size: f64,
    pub font_color: String,
    pub rotation: i32,
    pub section_index: usize,
}

impl Default for WatermarkRequest {
    fn default() -> Self {
        Self {
            text: "DRAFT".to_string(),
            font_size: 72.0,
            font_color: "C0C0C0".to_string(),
            rotation: -45,
            section_index: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    pub section_index: usize,
    pub orientation: String,
    pub page_width_inches: f64,
    pub page_height_inches: f64,
    pub margin_top_inches: f64,
    pub margin_bottom_inches: f64,
    pub margin_left_inches: f64,
    pub margin_right_inches: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderFooterUpdated {
    pub section_index: usize,
    pub header_part: Option<String>,
    pub footer_part: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionReport {
    pub section_index: usize,
    pub section_count: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacingUpdated {
    pub paragraphs_updated: usize,
    pub first_paragraph: usize,
    pub last_paragraph: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkAdded {
    pub bookmark_name: String,
    pub bookmark_id: String,
    pub paragraph_index: usize,
}

impl DocumentControl {
    /// Sets page size, orientation, and margins of one section.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an unknown orientation, a non-positive size,
    /// a negative margin, or an unknown section.
    pub async fn set_page_layout(
        &self,
        filename: &str,
        request: PageLayoutRequest,
    ) -> Result<PageLayout, ControlError> {
        let landscape = match request.orientation.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) if value.eq_ignore_ascii_case("landscape") => Some(true),
            Some(value) if value.eq_ignore_ascii_case("portrait") => Some(false),
            Some(other) => {
                return Err(ControlError::InvalidInput(format!(
                    "Invalid orientation '{other}'. Use 'portrait' or 'landscape'."
                )));
            }
        };
        for (name, value) in [
            ("page_width_inches", request.page_width_inches),
            ("page_height_inches", request.page_height_inches),
        ] {
            if value.is_some_and(|inches| inches <= 0.0 || !inches.is_finite()) {
                return Err(ControlError::InvalidInput(format!("{name} must be positive")));
            }
        }
        let margins = [
            ("w:top", request.margin_top_inches),
            ("w:bottom", request.margin_bottom_inches),
            ("w:left", request.margin_left_inches),
            ("w:right", request.margin_right_inches),
        ];
        if margins
            .iter()
            .any(|(_, value)| value.is_some_and(|inches| inches < 0.0 || !inches.is_finite()))
        {
            return Err(ControlError::InvalidInput("Margins must not be negative".to_string()));
        }

        self.edit(filename, "set_page_layout", |doc| {
            let section = section_mut(doc.body_mut()?, request.section_index)?;
            let size = section.child("w:pgSz");
            let read = |attr: &str, default: i64| {
                size.and_then(|el| el.attr(attr))
                    .and_then(|value| value.parse::<i64>().ok())
                    .unwrap_or(default)
            };
            let mut width = request
                .page_width_inches
                .map_or_else(|| read("w:w", DEFAULT_PAGE_WIDTH), inches_to_twips);
            let mut height = request
                .page_height_inches
                .map_or_else(|| read("w:h", DEFAULT_PAGE_HEIGHT), inches_to_twips);
            let landscape = landscape.unwrap_or(width > height);
            if landscape != (width > height) && width != height {
                std::mem::swap(&mut width, &mut height);
            }
            let mut page_size = XmlElement::new("w:pgSz")
                .with_attr("w:w", width.to_string())
                .with_attr("w:h", height.to_string());
            if landscape {
                page_size.set_attr("w:orient", "landscape");
            }
            set_ordered(section, page_size, SECTPR_ORDER);

            if section.child("w:pgMar").is_none() {
                set_ordered(
                    section,
                    XmlElement::new("w:pgMar")
                        .with_attr("w:top", "1440")
                        .with_attr("w:right", "1440")
                        .with_attr("w:bottom", "1440")
                        .with_attr("w:left", "1440")
                        .with_attr("w:header", "720")
                        .with_attr("w:footer", "720")
                        .with_attr("w:gutter", "0"),
                    SECTPR_ORDER,
                );
            }
            let page_margins = section
                .child_mut("w:pgMar")
                .ok_or_else(|| ControlError::Unsupported("page margins missing".to_string()))?;
            for (attr, value) in margins {
                if let Some(inches) = value {
                    page_margins.set_attr(attr, inches_to_twips(inches).to_string());
                }
            }
            let margin = |attr: &str| {
                twips_to_inches(
                    page_margins
                        .attr(attr)
                        .and_then(|value| value.parse::<i64>().ok())
                        .unwrap_or(1440),
                )
            };
            Ok(PageLayout {
                section_index: request.section_index,
                orientation: if landscape { "landscape" } else { "portrait" }.to_string(),
                page_width_inches: twips_to_inches(width),
                page_height_inches: twips_to_inches(height),
                margin_top_inches: margin("w:top"),
                margin_bottom_inches: margin("w:bottom"),
                margin_left_inches: margin("w:left"),
                margin_right_inches: margin("w:right"),
            })
        })
        .await
    }

    /// Creates or replaces the default header and/or footer of a section.
    ///
    /// # Errors
    /// Returns `InvalidInput` when neither text is given or an alignment is unknown.
    pub async fn add_header_footer(
        &self,
        filename: &str,
        request: HeaderFooterRequest,
    ) -> Result<HeaderFooterUpdated, ControlError> {
        let header = request.header_text.as_deref().filter(|text| !text.is_empty());
        let footer = request.footer_text.as_deref().filter(|text| !text.is_empty());
        if header.is_none() && footer.is_none() {
            return Err(ControlError::InvalidInput(
                "header_text or footer_text is required".to_string(),
            ));
        }
        let header_jc = justification(&request.header_alignment)?;
        let footer_jc = justification(&request.footer_alignment)?;
        self.edit(filename, "add_header_footer", |doc| {
            let mut written = [None, None];
            for (slot, (kind, text, jc)) in [
                (HeaderKind::Header, header, header_jc),
                (HeaderKind::Footer, footer, footer_jc),
            ]
            .into_iter()
            .enumerate()
            {
                let Some(text) = text else {
                    continue;
                };
                let (part, mut xml) = ensure_section_part(doc, request.section_index, kind)?;
                xml.root.children.clear();
                for line in text.lines() {
                    xml.root.push(aligned_paragraph(vec![new_run(line)], jc));
                }
                doc.set_part_xml(&part, &xml);
                written[slot] = Some(part);
            }
            let [header_part, footer_part] = written;
            Ok(HeaderFooterUpdated {
                section_index: request.section_index,
                header_part,
                footer_part,
            })
        })
        .await
    }

    /// Appends a `PAGE` field paragraph, optionally with `NUMPAGES`, to a
    /// section's header or footer.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an unknown position or alignment.
    pub async fn add_page_numbers(
        &self,
        filename: &str,
        request: PageNumberRequest,
    ) -> Result<SectionReport, ControlError> {
        let kind = HeaderKind::parse(&request.position)?;
        let jc = justification(&request.alignment)?;
        self.edit(filename, "add_page_numbers", |doc| {
            let (part, mut xml) = ensure_section_part(doc, request.section_index, kind)?;
            let mut runs = Vec::new();
            if !request.prefix.is_empty() {
                runs.push(new_run(&request.prefix));
            }
            runs.extend(simple_field_runs("PAGE", "1"));
            if request.include_total {
                runs.push(new_run(" / "));
                runs.extend(simple_field_runs("NUMPAGES", "1"));
            }
            if !request.suffix.is_empty() {
                runs.push(new_run(&request.suffix));
            }
            xml.root.push(aligned_paragraph(runs, jc));
            doc.set_part_xml(&part, &xml);
            let section_count = section_paths(doc.body()?).len();
            Ok(SectionReport {
                section_index: request.section_index,
                section_count,
                message: format!("Page numbers added to {part}"),
            })
        })
        .await
    }

    /// Ends the current last section and starts a new one of `break_type`.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an unknown break type.
    pub async fn add_section_break(
        &self,
        filename: &str,
        break_type: &str,
    ) -> Result<SectionReport, ControlError> {
        let section_type = match break_type.trim().to_ascii_lowercase().as_str() {
            "new_page" | "nextpage" | "" => "nextPage",
            "continuous" => "continuous",
            "even_page" | "evenpage" => "evenPage",
            "odd_page" | "oddpage" => "oddPage",
            other => {
                return Err(ControlError::InvalidInput(format!(
                    "Invalid break_type '{other}'. Use new_page, continuous, even_page, or odd_page."
                )));
            }
        };
        self.edit(filename, "add_section_break", |doc| {
            let body = doc.body_mut()?;
            let ending = final_section_mut(body)?.clone();
            let mut paragraph = XmlElement::new("w:p");
            set_ordered(paragraph.ensure_first_child("w:pPr"), ending, PPR_ORDER);
            insert_before_section(body, paragraph);
            set_ordered(
                final_section_mut(body)?,
                val("w:type", section_type),
                SECTPR_ORDER,
            );
            let section_count = section_paths(body).len();
            Ok(SectionReport {
                section_index: section_count - 1,
                section_count,
                message: format!("Section break ({section_type}) added"),
            })
        })
        .await
    }

    /// # Errors
    /// Returns `InvalidInput` when nothing would change, for an unknown rule,
    /// or for an out-of-range start paragraph.
    pub async fn set_paragraph_spacing(
        &self,
        filename: &str,
        request: SpacingRequest,
    ) -> Result<SpacingUpdated, ControlError> {
        let spacing = SpacingValues::from_request(&request)?;
        self.edit(filename, "set_paragraph_spacing", |doc| {
            let body = doc.body_mut()?;
            let positions = body_paragraph_positions(body);
            let (first, last) = spacing_targets(&request, positions.len())?;
            for position in &positions[first..=last] {
                if let Some(paragraph) = body.children[*position].as_element_mut() {
                    spacing.apply(paragraph);
                }
            }
            Ok(SpacingUpdated {
                paragraphs_updated: last - first + 1,
                first_paragraph: first,
                last_paragraph: last,
            })
        })
        .await
    }

    /// Wraps a body paragraph's content in a named bookmark.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an invalid or duplicate name.
    pub async fn add_bookmark(
        &self,
        filename: &str,
        paragraph_index: usize,
        bookmark_name: &str,
    ) -> Result<BookmarkAdded, ControlError> {
        validate_bookmark_name(bookmark_name)?;
        self.edit(filename, "add_bookmark", |doc| {
            let root = doc.root();
            if root
                .descendants_named("w:bookmarkStart")
                .any(|mark| mark.attr("w:name") == Some(bookmark_name))
            {
                return Err(ControlError::InvalidInput(format!(
                    "Bookmark '{bookmark_name}' already exists"
                )));
            }
            let bookmark_id = max_numeric_attr(root, "w:id", &|el| {
                el.is("w:bookmarkStart") || el.is("w:bookmarkEnd")
            })
            .map_or(0, |max| max + 1)
            .to_string();

            let body = doc.body_mut()?;
            let position = body_paragraph_position(body, paragraph_index)?;
            let paragraph = body.children[position]
                .as_element_mut()
                .ok_or_else(|| ControlError::Unsupported("paragraph is not an element".into()))?;
            let start_at = paragraph.child_index("w:pPr").map_or(0, |index| index + 1);
            paragraph.insert(
                start_at,
                XmlElement::new("w:bookmarkStart")
                    .with_attr("w:id", &bookmark_id)
                    .with_attr("w:name", bookmark_name),
            );
            paragraph.push(XmlElement::new("w:bookmarkEnd").with_attr("w:id", &bookmark_id));
            Ok(BookmarkAdded {
                bookmark_name: bookmark_name.to_string(),
                bookmark_id,
                paragraph_index,
            })
        })
        .await
    }

    /// Adds a rotated text watermark to a section's default header.
    ///
    /// # Errors
    /// Returns `InvalidInput` for empty text, a bad colour, or a non-positive size.
    pub async fn add_watermark(
        &self,
        filename: &str,
        request: WatermarkRequest,
    ) -> Result<SectionReport, ControlError> {
        require_text(&request.text, "text")?;
        let color = parse_hex_color(&request.font_color).ok_or_else(|| {
            ControlError::InvalidInput(format!(
                "Invalid font_color '{}'. Use hex format like 'C0C0C0'.",
                request.font_color
            ))
        })?;
        if !(request.font_size > 0.0 && request.font_size.is_finite()) {
            return Err(ControlError::InvalidInput("font_size must be positive".to_string()));
        }
        self.edit(filename, "add_watermark", |doc| {
            let (part, mut xml) =
                ensure_section_part(doc, request.section_index, HeaderKind::Header)?;
            add_watermark_shape(&mut xml, &request, &color);
            doc.set_part_xml(&part, &xml);
            let section_count = section_paths(doc.body()?).len();
            Ok(SectionReport {
                section_index: request.section_index,
                section_count,
                message: format!("Watermark '{}' added to {part}", request.text),
            })
        })
        .await
    }
}

fn justification(alignment: &str) -> Result<&'static str, ControlError> {
    match alignment.trim().to_ascii_lowercase().as_str() {
        "left" => Ok("left"),
        "center" | "centre" | "" => Ok("center"),
        "right" => Ok("right"),
        "justify" | "both" => Ok("both"),
        other => Err(ControlError::InvalidInput(format!(
            "Invalid alignment '{other}'. Use left, center, right, or justify."
        ))),
    }
}

fn aligned_paragraph(runs: Vec<XmlElement>, jc: &str) -> XmlElement {
    let mut paragraph = XmlElement::new("w:p");
    set_ordered(paragraph.ensure_first_child("w:pPr"), val("w:jc", jc), PPR_ORDER);
    for run in runs {
        paragraph.push(run);
    }
    paragraph
}

/// Runs of a complex field `instruction` with `cached` as its result.
pub(crate) fn simple_field_runs(instruction: &str, cached: &str) -> Vec<XmlElement> {
    let field_char = |kind: &str| {
        XmlElement::new("w:r")
            .with_child(XmlElement::new("w:fldChar").with_attr("w:fldCharType", kind))
    };
    vec![
        field_char("begin"),
        XmlElement::new("w:r").with_child(
            XmlElement::new("w:instrText")
                .with_attr("xml:space", "preserve")
                .with_text(format!(" {instruction} ")),
        ),
        field_char("separate"),
        new_run(cached),
        field_char("end"),
    ]
}

struct SpacingValues {
    before: Option<i64>,
    after: Option<i64>,
    line: Option<(i64, &'static str)>,
}

impl SpacingValues {
    #[allow(clippy::cast_possible_truncation)]
    fn from_request(request: &SpacingRequest) -> Result<Self, ControlError> {
        for value in [request.space_before_pt, request.space_after_pt, request.line_spacing]
            .into_iter()
            .flatten()
        {
            if value < 0.0 || !value.is_finite() {
                return Err(ControlError::InvalidInput(format!(
                    "Spacing values must not be negative (got {value})"
                )));
            }
        }
        let rule = request
            .line_spacing_rule
            .as_deref()
            .map(|rule| rule.trim().to_ascii_lowercase())
            .filter(|rule| !rule.is_empty());
        let line = match (rule.as_deref(), request.line_spacing) {
            (None, None) => None,
            (Some("single"), _) => Some((240, "auto")),
            (Some("1.5_lines" | "one_and_half" | "1.5"), _) => Some((360, "auto")),
            (Some("double"), _) => Some((480, "auto")),
            (Some("exactly" | "exact"), Some(points)) => Some((points_to_twips(points), "exact")),
            (Some("at_least" | "atleast"), Some(points)) => {
                Some((points_to_twips(points), "atLeast"))
            }
            (Some("multiple") | None, Some(multiple)) => {
                Some(((multiple * 240.0).round() as i64, "auto"))
            }
            (Some("exactly" | "exact" | "at_least" | "atleast" | "multiple"), None) => {
                return Err(ControlError::InvalidInput(
                    "line_spacing is required for this line_spacing_rule".to_string(),
                ));
            }
            (Some(other), _) => {
                return Err(ControlError::InvalidInput(format!(
                    "Invalid line_spacing_rule '{other}'. Use single, 1.5_lines, double, exactly, at_least, or multiple."
                )));
            }
        };
        let values = Self {
            before: request.space_before_pt.map(points_to_twips),
            after: request.space_after_pt.map(points_to_twips),
            line,
        };
        if values.before.is_none() && values.after.is_none() && values.line.is_none() {
            return Err(ControlError::InvalidInput(
                "At least one spacing value is required".to_string(),
            ));
        }
        Ok(values)
    }

    fn apply(&self, paragraph: &mut XmlElement) {
        let ppr = paragraph.ensure_first_child("w:pPr");
        let mut spacing = ppr
            .child("w:spacing")
            .cloned()
            .unwrap_or_else(|| XmlElement::new("w:spacing"));
        if let Some(before) = self.before {
            spacing.set_attr("w:before", before.to_string());
            spacing.remove_attr("w:beforeAutospacing");
        }
        if let Some(after) = self.after {
            spacing.set_attr("w:after", after.to_string());
            spacing.remove_attr("w:afterAutospacing");
        }
        if let Some((line, rule)) = self.line {
            spacing.set_attr("w:line", line.to_string());
            spacing.set_attr("w:lineRule", rule);
        }
        set_ordered(ppr, spacing, PPR_ORDER);
    }
}

/// Inclusive paragraph range to update; a range end past the document is clamped.
fn spacing_targets(request: &SpacingRequest, count: usize) -> Result<(usize, usize), ControlError> {
    if count == 0 {
        return Err(ControlError::InvalidInput("Document has no paragraphs".to_string()));
    }
    let out_of_range = |index: usize| {
        ControlError::InvalidInput(format!(
            "Invalid paragraph index {index}. Document has {count} paragraphs (0-{}).",
            count - 1
        ))
    };
    if let Some(index) = request.paragraph_index {
        return if index < count {
            Ok((index, index))
        } else {
            Err(out_of_range(index))
        };
    }
    match (request.start_paragraph, request.end_paragraph) {
        (None, None) => Ok((0, count - 1)),
        (start, end) => {
            let start = start.unwrap_or(0);
            if start >= count {
                return Err(out_of_range(start));
            }
            let end = end.unwrap_or(count - 1).min(count - 1);
            if end < start {
                return Err(ControlError::InvalidInput(format!(
                    "end_paragraph {end} is before start_paragraph {start}"
                )));
            }
            Ok((start, end))
        }
    }
}

fn validate_bookmark_name(name: &str) -> Result<(), ControlError> {
    let starts_with_letter = name.chars().next().is_some_and(char::is_alphabetic);
    let valid_chars = name.chars().all(|ch| ch.is_alphanumeric() || ch == '_');
    let length = name.chars().count();
    if !starts_with_letter || !valid_chars || length > MAX_BOOKMARK_NAME {
        return Err(ControlError::InvalidInput(format!(
            "Invalid bookmark name '{name}'. Names start with a letter, use only letters, \
             digits, and underscores, and are at most {MAX_BOOKMARK_NAME} characters."
        )));
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn add_watermark_shape(header: &mut XmlDocument, request: &WatermarkRequest, color: &str) {
    header.root.ensure_namespace("v", NS_V);
    header.root.ensure_namespace("o", NS_O);
    header.root.ensure_namespace("w10", NS_W10);

    let shape_number = header.root.descendants_named("v:shape").count() + 1;
    let rotation = request.rotation.rem_euclid(360);
    let width_pt = (request.text.chars().count() as f64 * request.font_size * 0.6).max(request.font_size);
    let height_pt = request.font_size * 1.25;
    let style = format!(
        "position:absolute;margin-left:0;margin-top:0;width:{width_pt:.1}pt;height:{height_pt:.1}pt;\
         rotation:{rotation};z-index:-251654144;mso-position-horizontal:center;\
         mso-position-horizontal-relative:margin;mso-position-vertical:center;\
         mso-position-vertical-relative:margin"
    );
    let shapetype = XmlElement::new("v:shapetype")
        .with_attr("id", "_x0000_t136")
        .with_attr("coordsize", "21600,21600")
        .with_attr("o:spt", "136")
        .with_attr("adj", "10800")
        .with_attr("path", "m@7,l@8,m@5,21600l@6,21600e")
        .with_child(
            XmlElement::new("v:path")
                .with_attr("textpathok", "t")
                .with_attr("o:connecttype", "custom"),
        )
        .with_child(
            XmlElement::new("v:textpath")
                .with_attr("on", "t")
                .with_attr("fitshape", "t"),
        )
        .with_child(
            XmlElement::new("o:lock")
                .with_attr("v:ext", "edit")
                .with_attr("text", "t")
                .with_attr("shapetype", "t"),
        );
    let shape = XmlElement::new("v:shape")
        .with_attr("id", format!("WordMcpWatermark{shape_number}"))
        .with_attr("o:spid", format!("_x0000_s{}", 2048 + shape_number))
        .with_attr("type", "#_x0000_t136")
        .with_attr("style", style)
        .with_attr("o:allowincell", "f")
        .with_attr("fillcolor", format!("#{color}"))
        .with_attr("stroked", "f")
        .with_child(XmlElement::new("v:fill").with_attr("opacity", ".5"))
        .with_child(
            XmlElement::new("v:textpath")
                .with_attr(
                    "style",
                    format!("font-family:\"Calibri\";font-size:{}pt", request.font_size),
                )
                .with_attr("string", &request.text),
        )
        .with_child(
            XmlElement::new("w10:wrap")
                .with_attr("anchorx", "margin")
                .with_attr("anchory", "margin"),
        );
    let mut pict = XmlElement::new("w:pict");
    if header.root.descendants_named("v:shapetype").next().is_none() {
        pict.push(shapetype);
    }
    pict.push(shape);

    let mut run = XmlElement::new("w:r");
    set_ordered(run.ensure_first_child("w:rPr"), XmlElement::new("w:noProof"), RPR_ORDER);
    run.push(pict);

    if let Some(paragraph) = header.root.child_mut("w:p") {
        paragraph.push(run);
    } else {
        header.root.push(XmlElement::new("w:p").with_child(run));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::new_paragraph;

    #[test]
    fn spacing_rules_map_to_line_values() {
        let request = SpacingRequest {
            line_spacing_rule: Some("1.5_lines".into()),
            ..SpacingRequest::default()
        };
        let values = SpacingValues::from_request(&request).expect("valid");
        assert_eq!(values.line, Some((360, "auto")));

        let request = SpacingRequest {
            line_spacing: Some(14.0),
            line_spacing_rule: Some("exactly".into()),
            space_after_pt: Some(6.0),
            ..SpacingRequest::default()
        };
        let values = SpacingValues::from_request(&request).expect("valid");
        assert_eq!(values.line, Some((280, "exact")));
        assert_eq!(values.after, Some(120));

        let mut paragraph = new_paragraph("x", None);
        values.apply(&mut paragraph);
        let spacing = paragraph
            .child("w:pPr")
            .and_then(|ppr| ppr.child("w:spacing"))
            .expect("spacing");
        assert_eq!(spacing.attr("w:lineRule"), Some("exact"));

        assert!(SpacingValues::from_request(&SpacingRequest::default()).is_err());
        let bad = SpacingRequest {
            line_spacing_rule: Some("exactly".into()),
            ..SpacingRequest::default()
        };
        assert!(SpacingValues::from_request(&bad).is_err());
    }

    #[test]
    fn spacing_range_is_clamped() {
        let request = SpacingRequest {
            start_paragraph: Some(2),
            end_paragraph: Some(99),
            ..SpacingRequest::default()
        };
        assert_eq!(spacing_targets(&request, 5).expect("range"), (2, 4));
        let request = SpacingRequest {
            start_paragraph: Some(5),
            ..SpacingRequest::default()
        };
        assert!(spacing_targets(&request, 5).is_err());
        assert_eq!(
            spacing_targets(&SpacingRequest::default(), 3).expect("all"),
            (0, 2)
        );
    }

    #[test]
    fn bookmark_names_are_validated() {
        assert!(validate_bookmark_name("Section_2").is_ok());
        assert!(validate_bookmark_name("2nd").is_err());
        assert!(validate_bookmark_name("has space").is_err());
        assert!(validate_bookmark_name(&"a".repeat(41)).is_err());
    }

    #[test]
    fn watermark_goes_into_first_header_paragraph() {
        let mut header = XmlDocument::new(XmlElement::new("w:hdr"));
        let request = WatermarkRequest::default();
        add_watermark_shape(&mut header, &request, "C0C0C0");
        add_watermark_shape(&mut header, &request, "C0C0C0");
        assert_eq!(header.root.children_named("w:p").count(), 1);
        assert_eq!(header.root.descendants_named("v:shape").count(), 2);
        assert_eq!(header.root.descendants_named("v:shapetype").count(), 1);
        let shape = header.root.descendants_named("v:shape").next().expect("shape");
        assert!(shape.attr("style").is_some_and(|style| style.contains("rotation:315")));
    }

    #[test]
    fn page_fields_have_instruction_and_result() {
        let runs = simple_field_runs("PAGE", "1");
        assert_eq!(runs.len(), 5);
        assert_eq!(
            runs[1].child("w:instrText").map(XmlElement::text).as_deref(),
            Some(" PAGE ")
        );
    }
}
