//! Paragraph and run model over `w:body`.
//!
//! Indices handed to tools are body-level: `paragraph_index` counts the direct
//! `w:p` children of `w:body`, `table_index` the direct `w:tbl` children. Text
//! search instead walks every paragraph in the body, tables included, and
//! matches against the concatenated `w:t` text of its runs.

use std::ops::RangeInclusive;

use word_ooxml::{XmlElement, XmlNode};

use crate::control::ControlError;

pub const RPR_ORDER: &[&str] = &[
    "w:rStyle", "w:rFonts", "w:b", "w:bCs", "w:i", "w:iCs", "w:caps", "w:smallCaps",
    "w:strike", "w:dstrike", "w:outline", "w:shadow", "w:emboss", "w:imprint", "w:noProof",
    "w:snapToGrid", "w:vanish", "w:webHidden", "w:color", "w:spacing", "w:w", "w:kern",
    "w:position", "w:sz", "w:szCs", "w:highlight", "w:u", "w:effect", "w:bdr", "w:shd",
    "w:fitText", "w:vertAlign", "w:rtl", "w:cs", "w:em", "w:lang", "w:eastAsianLayout",
    "w:specVanish", "w:oMath",
];

pub const PPR_ORDER: &[&str] = &[
    "w:pStyle", "w:keepNext", "w:keepLines", "w:pageBreakBefore", "w:framePr",
    "w:widowControl", "w:numPr", "w:suppressLineNumbers", "w:pBdr", "w:shd", "w:tabs",
    "w:suppressAutoHyphens", "w:kinsoku", "w:wordWrap", "w:overflowPunct", "w:topLinePunct",
    "w:autoSpaceDE", "w:autoSpaceDN", "w:bidi", "w:adjustRightInd", "w:snapToGrid",
    "w:spacing", "w:ind", "w:contextualSpacing", "w:mirrorIndents", "w:suppressOverlap",
    "w:jc", "w:textDirection", "w:textAlignment", "w:textboxTightWrap", "w:outlineLvl",
    "w:divId", "w:cnfStyle", "w:rPr", "w:sectPr", "w:pPrChange",
];

/// Inserts `element` into a property container in schema order, replacing any
/// existing child with the same name.
pub fn set_ordered(parent: &mut XmlElement, element: XmlElement, order: &[&str]) {
    if let Some(index) = parent.child_index(&element.name) {
        parent.children[index] = XmlNode::Element(element);
        return;
    }
    let rank = order.iter().position(|name| *name == element.name);
    let insert_at = rank.and_then(|rank| {
        parent.children.iter().position(|node| {
            node.as_element().is_some_and(|child| {
                order
                    .iter()
                    .position(|name| *name == child.name)
                    .is_some_and(|other| other > rank)
            })
        })
    });
    match insert_at {
        Some(index) => parent.insert(index, element),
        None => parent.push(element),
    }
}

/// `w:t` with `xml:space="preserve"`.
#[must_use]
pub fn text_element(text: &str) -> XmlElement {
    XmlElement::new("w:t")
        .with_attr("xml:space", "preserve")
        .with_text(text)
}

#[must_use]
pub fn new_run(text: &str) -> XmlElement {
    XmlElement::new("w:r").with_child(text_element(text))
}

#[must_use]
pub fn new_paragraph(text: &str, style: Option<&str>) -> XmlElement {
    let mut paragraph = XmlElement::new("w:p");
    if let Some(style) = style {
        set_paragraph_style(&mut paragraph, style);
    }
    if !text.is_empty() {
        paragraph.push(new_run(text));
    }
    paragraph
}

/// A paragraph holding a single page break.
#[must_use]
pub fn page_break_paragraph() -> XmlElement {
    XmlElement::new("w:p").with_child(
        XmlElement::new("w:r").with_child(XmlElement::new("w:br").with_attr("w:type", "page")),
    )
}

pub fn set_paragraph_style(paragraph: &mut XmlElement, style_id: &str) {
    let ppr = paragraph.ensure_first_child("w:pPr");
    set_ordered(
        ppr,
        XmlElement::new("w:pStyle").with_attr("w:val", style_id),
        PPR_ORDER,
    );
}

#[must_use]
pub fn paragraph_style(paragraph: &XmlElement) -> Option<&str> {
    paragraph
        .child("w:pPr")?
        .child("w:pStyle")?
        .attr("w:val")
}

/// Heading level for a style id or name: `Heading3` and `heading 3` give 3, `Title` gives 0.
#[must_use]
pub fn heading_level(style: &str) -> Option<u8> {
    let compact: String = style
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    if compact == "title" {
        return Some(0);
    }
    compact.strip_prefix("heading")?.parse::<u8>().ok()
}

#[must_use]
pub fn is_heading_style(style: Option<&str>) -> bool {
    style.is_some_and(|style| heading_level(style).is_some())
}

#[must_use]
pub fn is_toc_style(style: Option<&str>) -> bool {
    style.is_some_and(|style| style.to_ascii_lowercase().starts_with("toc"))
}

/// Child positions of the direct `w:p` children of `w:body`.
#[must_use]
pub fn body_paragraph_positions(body: &XmlElement) -> Vec<usize> {
    positions_named(body, "w:p")
}

/// Child positions of the direct `w:tbl` children of `w:body`.
#[must_use]
pub fn body_table_positions(body: &XmlElement) -> Vec<usize> {
    positions_named(body, "w:tbl")
}

fn positions_named(parent: &XmlElement, name: &str) -> Vec<usize> {
    parent
        .children
        .iter()
        .enumerate()
        .filter_map(|(index, node)| {
            node.as_element()
                .filter(|element| element.is(name))
                .map(|_| index)
        })
        .collect()
}

/// Child position of body paragraph `index`.
///
/// # Errors
/// Returns `InvalidInput` naming the valid range when `index` is out of bounds.
pub fn body_paragraph_position(body: &XmlElement, index: usize) -> Result<usize, ControlError> {
    let positions = body_paragraph_positions(body);
    positions.get(index).copied().ok_or_else(|| {
        ControlError::InvalidInput(format!(
            "Invalid paragraph index {index}. Document has {} paragraphs{}.",
            positions.len(),
            range_hint(positions.len())
        ))
    })
}

/// Child position of body table `index`.
///
/// # Errors
/// Returns `InvalidInput` naming the valid range when `index` is out of bounds.
pub fn body_table_position(body: &XmlElement, index: usize) -> Result<usize, ControlError> {
    let positions = body_table_positions(body);
    positions.get(index).copied().ok_or_else(|| {
        ControlError::InvalidInput(format!(
            "Invalid table index {index}. Document has {} tables{}.",
            positions.len(),
            range_hint(positions.len())
        ))
    })
}

fn range_hint(len: usize) -> String {
    if len == 0 {
        String::new()
    } else {
        format!(" (0-{})", len - 1)
    }
}

/// Paths to every paragraph under `root`, tables and content controls included.
#[must_use]
pub fn paragraph_paths(root: &XmlElement) -> Vec<Vec<usize>> {
    root.find_paths(&|element| element.is("w:p") || element.is("w:txbxContent"))
        .into_iter()
        .filter(|path| root.at_path(path).is_some_and(|element| element.is("w:p")))
        .collect()
}

/// Body paragraph index of the paragraph at `path`, when it is a direct body child.
#[must_use]
pub fn body_paragraph_ordinal(body: &XmlElement, path: &[usize]) -> Option<usize> {
    let [position] = path else {
        return None;
    };
    body_paragraph_positions(body)
        .iter()
        .position(|candidate| candidate == position)
}

/// Extraction text: `w:t`, tabs as `\t`, breaks as `\n`, deleted text skipped.
#[must_use]
pub fn paragraph_text(paragraph: &XmlElement) -> String {
    let mut output = String::new();
    push_visible_text(paragraph, &mut output);
    output
}

fn push_visible_text(element: &XmlElement, output: &mut String) {
    for child in element.elements() {
        match child.name.as_str() {
            "w:t" => output.push_str(&child.text()),
            "w:tab" => output.push('\t'),
            "w:br" | "w:cr" => output.push('\n'),
            "w:del" | "w:pPr" | "w:rPr" | "w:txbxContent" | "w:instrText" | "w:delText" => {}
            _ => push_visible_text(child, output),
        }
    }
}

/// Text of a table cell: its paragraphs joined by newlines.
#[must_use]
pub fn cell_text(cell: &XmlElement) -> String {
    cell.children_named("w:p")
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn table_rows(table: &XmlElement) -> Vec<&XmlElement> {
    table.children_named("w:tr").collect()
}

/// Rows of a table as cell texts.
#[must_use]
pub fn table_text_grid(table: &XmlElement) -> Vec<Vec<String>> {
    table
        .children_named("w:tr")
        .map(|row| row.children_named("w:tc").map(cell_text).collect())
        .collect()
}

/// A text-bearing run inside a paragraph.
#[derive(Debug, Clone)]
pub struct TextRun {
    /// Path from the paragraph to the `w:r` element.
    pub path: Vec<usize>,
    /// Byte offset of the run's text in the paragraph match text.
    pub start: usize,
    pub text: String,
}

impl TextRun {
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.text.len()
    }

    fn parent(&self) -> &[usize] {
        &self.path[..self.path.len() - 1]
    }

    fn index(&self) -> usize {
        self.path[self.path.len() - 1]
    }
}

/// Runs of `paragraph` that carry `w:t` text, in document order. Runs inside
/// `w:del` are skipped; runs inside insertions, hyperlinks, and other inline
/// wrappers count.
#[must_use]
pub fn text_runs(paragraph: &XmlElement) -> Vec<TextRun> {
    let mut runs = Vec::new();
    let mut path = Vec::new();
    let mut offset = 0;
    collect_runs(paragraph, &mut path, &mut offset, &mut runs);
    runs
}

fn collect_runs(
    element: &XmlElement,
    path: &mut Vec<usize>,
    offset: &mut usize,
    runs: &mut Vec<TextRun>,
) {
    for (index, node) in element.children.iter().enumerate() {
        let XmlNode::Element(child) = node else {
            continue;
        };
        path.push(index);
        match child.name.as_str() {
            "w:r" => {
                let text = run_text(child);
                if child.child("w:t").is_some() && !text.is_empty() {
                    runs.push(TextRun {
                        path: path.clone(),
                        start: *offset,
                        text: text.clone(),
                    });
                    *offset += text.len();
                }
            }
            "w:del" | "w:pPr" | "w:moveFrom" | "w:txbxContent" => {}
            _ => collect_runs(child, path, offset, runs),
        }
        path.pop();
    }
}

/// Concatenated `w:t` text of a run.
#[must_use]
pub fn run_text(run: &XmlElement) -> String {
    run.children_named("w:t").map(XmlElement::text).collect()
}

/// Match text of a paragraph: the concatenated text of [`text_runs`].
#[must_use]
pub fn match_text(paragraph: &XmlElement) -> String {
    text_runs(paragraph)
        .into_iter()
        .map(|run| run.text)
        .collect()
}

/// Replaces the `w:t` children of a run with a single text element.
pub fn set_run_text(run: &mut XmlElement, text: &str) {
    let position = run.child_index("w:t");
    run.remove_children_named("w:t");
    let element = text_element(text);
    match position {
        Some(index) => run.insert(index, element),
        None => run.push(element),
    }
}

/// A span of sibling runs produced by [`isolate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Isolated {
    /// Path from the paragraph to the element holding the runs.
    pub parent: Vec<usize>,
    /// Child positions of the first and last isolated run within `parent`.
    pub first: usize,
    pub last: usize,
}

impl Isolated {
    #[must_use]
    pub const fn range(&self) -> RangeInclusive<usize> {
        self.first..=self.last
    }
}

/// Splits runs so that byte range `start..end` of the paragraph's match text is
/// covered exactly by whole runs, each keeping its `w:rPr`. Returns `None` when
/// the range is empty, out of bounds, or spans runs with different parents.
pub fn isolate(paragraph: &mut XmlElement, start: usize, end: usize) -> Option<Isolated> {
    if start >= end {
        return None;
    }
    let runs = text_runs(paragraph);
    let first = runs.iter().position(|run| start < run.end())?;
    let last = runs.iter().position(|run| end <= run.end())?;
    if last < first || runs[first].start > start {
        return None;
    }
    let parent = runs[first].parent().to_vec();
    if runs[first..=last].iter().any(|run| run.parent() != parent.as_slice()) {
        return None;
    }

    let first_run = &runs[first];
    let last_run = &runs[last];
    let container = paragraph.at_path_mut(&parent)?;
    let mut first_index = first_run.index();
    let mut last_index = last_run.index();

    let tail_split = end - last_run.start;
    if tail_split < last_run.text.len() {
        let mut suffix = container.at_path(&[last_index])?.clone();
        set_run_text(&mut suffix, &last_run.text[tail_split..]);
        let kept = container.at_path_mut(&[last_index])?;
        set_run_text(kept, &last_run.text[..tail_split]);
        container.insert(last_index + 1, suffix);
    }

    let head_split = start - first_run.start;
    if head_split > 0 {
        let current = run_text(container.at_path(&[first_index])?);
        let mut prefix = container.at_path(&[first_index])?.clone();
        set_run_text(&mut prefix, &current[..head_split]);
        let kept = container.at_path_mut(&[first_index])?;
        set_run_text(kept, &current[head_split..]);
        container.insert(first_index, prefix);
        first_index += 1;
        last_index += 1;
    }

    Some(Isolated {
        parent,
        first: first_index,
        last: last_index,
    })
}

/// One isolated occurrence handed to a match callback.
pub struct MatchContext<'a> {
    pub paragraph: &'a mut XmlElement,
    /// Path of the paragraph from the search root.
    pub path: &'a [usize],
    pub site: Isolated,
    pub start: usize,
    pub end: usize,
}

/// How many occurrences [`for_each_match`] visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchLimit {
    First,
    All,
}

/// Finds `needle` in each paragraph at `paths` (relative to `root`), isolates
/// every occurrence, and hands it to `apply`, which returns the byte offset in
/// the updated match text where searching resumes. Occurrences that span runs
/// with different parents are skipped. Returns the number of occurrences applied.
///
/// # Errors
/// Propagates the first error returned by `apply`.
pub fn for_each_match(
    root: &mut XmlElement,
    paths: &[Vec<usize>],
    needle: &str,
    limit: MatchLimit,
    apply: &mut dyn FnMut(MatchContext<'_>) -> Result<usize, ControlError>,
) -> Result<usize, ControlError> {
    if needle.is_empty() {
        return Ok(0);
    }
    let mut count = 0;
    for path in paths {
        let Some(paragraph) = root.at_path_mut(path) else {
            continue;
        };
        let mut cursor = 0;
        loop {
            let text = match_text(paragraph);
            let Some(found) = text.get(cursor..).and_then(|rest| rest.find(needle)) else {
                break;
            };
            let start = cursor + found;
            let end = start + needle.len();
            match isolate(paragraph, start, end) {
                Some(site) => {
                    cursor = apply(MatchContext {
                        paragraph: &mut *paragraph,
                        path,
                        site,
                        start,
                        end,
                    })?;
                    count += 1;
                    if limit == MatchLimit::First {
                        return Ok(count);
                    }
                }
                None => {
                    cursor = start + text[start..].chars().next().map_or(1, char::len_utf8);
                }
            }
        }
    }
    Ok(count)
}

/// Run formatting shared by paragraph, heading, cell, and range operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunFormat {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub color: Option<String>,
    pub font_size: Option<f64>,
    pub font_name: Option<String>,
}

impl RunFormat {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bold.is_none()
            && self.italic.is_none()
            && self.underline.is_none()
            && self.color.is_none()
            && self.font_size.is_none()
            && self.font_name.is_none()
    }

    /// Validates colour and size values.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a malformed colour or a non-positive size.
    pub fn validate(&self) -> Result<(), ControlError> {
        if let Some(color) = &self.color
            && word_ooxml::units::parse_hex_color(color).is_none()
        {
            return Err(ControlError::InvalidInput(format!(
                "Invalid color '{color}'. Use hex format like 'FF0000' or '#FF0000'."
            )));
        }
        if let Some(size) = self.font_size
            && !(size > 0.0 && size <= 1638.0)
        {
            return Err(ControlError::InvalidInput(format!(
                "Invalid font size {size}. Use a value between 1 and 1638 points."
            )));
        }
        Ok(())
    }

    /// Applies the formatting to a `w:r`, creating `w:rPr` when needed.
    pub fn apply_to_run(&self, run: &mut XmlElement) {
        if self.is_empty() {
            return;
        }
        self.apply_to_rpr(run.ensure_first_child("w:rPr"));
    }

    /// Applies the formatting to an `rPr` element (run or style properties).
    pub fn apply_to_rpr(&self, rpr: &mut XmlElement) {
        if let Some(font) = &self.font_name {
            set_ordered(
                rpr,
                XmlElement::new("w:rFonts")
                    .with_attr("w:ascii", font)
                    .with_attr("w:hAnsi", font)
                    .with_attr("w:eastAsia", font)
                    .with_attr("w:cs", font),
                RPR_ORDER,
            );
        }
        if let Some(bold) = self.bold {
            set_toggle(rpr, "w:b", bold);
            set_toggle(rpr, "w:bCs", bold);
        }
        if let Some(italic) = self.italic {
            set_toggle(rpr, "w:i", italic);
            set_toggle(rpr, "w:iCs", italic);
        }
        if let Some(color) = self
            .color
            .as_deref()
            .and_then(word_ooxml::units::parse_hex_color)
        {
            set_ordered(rpr, val("w:color", &color), RPR_ORDER);
        }
        if let Some(size) = self.font_size {
            let half_points = word_ooxml::units::points_to_half_points(size).to_string();
            set_ordered(rpr, val("w:sz", &half_points), RPR_ORDER);
            set_ordered(rpr, val("w:szCs", &half_points), RPR_ORDER);
        }
        if let Some(underline) = self.underline {
            set_ordered(
                rpr,
                val("w:u", if underline { "single" } else { "none" }),
                RPR_ORDER,
            );
        }
    }
}

fn set_toggle(rpr: &mut XmlElement, name: &str, on: bool) {
    let element = if on {
        XmlElement::new(name)
    } else {
        val(name, "0")
    };
    set_ordered(rpr, element, RPR_ORDER);
}

/// `<name w:val="value"/>`.
#[must_use]
pub fn val(name: &str, value: &str) -> XmlElement {
    XmlElement::new(name).with_attr("w:val", value)
}

/// Highest integer value of `attr` among descendants of `root` that satisfy `matches`.
#[must_use]
pub fn max_numeric_attr(
    root: &XmlElement,
    attr: &str,
    matches: &dyn Fn(&XmlElement) -> bool,
) -> Option<i64> {
    root.descendants()
        .filter(|element| matches(element))
        .filter_map(|element| element.attr(attr)?.trim().parse::<i64>().ok())
        .max()
}

/// Splits every run in `paragraph` at char offsets `start..end` of its match
/// text and returns the isolated runs' paths from the paragraph. Unlike
/// [`isolate`], the runs may have different parents.
pub fn isolate_char_range(
    paragraph: &mut XmlElement,
    start: usize,
    end: usize,
) -> Vec<Vec<usize>> {
    let text = match_text(paragraph);
    let byte_at = |chars: usize| {
        text.char_indices()
            .nth(chars)
            .map_or(text.len(), |(byte, _)| byte)
    };
    let (start, end) = (byte_at(start), byte_at(end));

    // Split at the two boundaries one run at a time, then collect covered runs.
    for boundary in [end, start] {
        let runs = text_runs(paragraph);
        if let Some(run) = runs
            .iter()
            .find(|run| run.start < boundary && boundary < run.end())
        {
            let _ = isolate(paragraph, run.start, boundary);
        }
    }
    text_runs(paragraph)
        .into_iter()
        .filter(|run| run.start >= start && run.end() <= end)
        .map(|run| run.path)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use word_ooxml::XmlDocument;

    fn paragraph(xml: &str) -> XmlElement {
        let wrapped = format!(
            r#"<w:body xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">{xml}</w:body>"#
        );
        XmlDocument::parse(&wrapped)
            .expect("fragment parses")
            .root
            .child("w:p")
            .cloned()
            .expect("paragraph present")
    }

    #[test]
    fn isolate_splits_single_run_and_keeps_formatting() {
        let mut p = paragraph(r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Hello brave world</w:t></w:r></w:p>"#);
        let site = isolate(&mut p, 6, 11).expect("isolated");
        assert_eq!(site, Isolated { parent: vec![], first: 1, last: 1 });
        let runs: Vec<_> = p.children_named("w:r").collect();
        assert_eq!(runs.len(), 3);
        assert_eq!(run_text(runs[0]), "Hello ");
        assert_eq!(run_text(runs[1]), "brave");
        assert_eq!(run_text(runs[2]), " world");
        assert!(runs.iter().all(|run| run.child("w:rPr").is_some()));
    }

    #[test]
    fn isolate_spans_runs_with_shared_parent() {
        let mut p = paragraph(r#"<w:p><w:r><w:t>ab</w:t></w:r><w:r><w:t>cd</w:t></w:r><w:r><w:t>ef</w:t></w:r></w:p>"#);
        let site = isolate(&mut p, 1, 5).expect("isolated");
        assert_eq!((site.first, site.last), (1, 3));
        assert_eq!(match_text(&p), "abcdef");
        let texts: Vec<_> = p.children_named("w:r").map(run_text).collect();
        assert_eq!(texts, vec!["a", "b", "cd", "e", "f"]);
    }

    #[test]
    fn isolate_refuses_mixed_parents() {
        let mut p = paragraph(
            r#"<w:p><w:r><w:t>ab</w:t></w:r><w:hyperlink><w:r><w:t>cd</w:t></w:r></w:hyperlink></w:p>"#,
        );
        assert!(isolate(&mut p, 1, 3).is_none());
        assert!(isolate(&mut p, 2, 4).is_some());
    }

    #[test]
    fn deleted_runs_are_invisible() {
        let p = paragraph(
            r#"<w:p><w:r><w:t>keep</w:t></w:r><w:del><w:r><w:delText>gone</w:delText></w:r></w:del><w:ins><w:r><w:t> new</w:t></w:r></w:ins><w:r><w:tab/><w:t>x</w:t></w:r></w:p>"#,
        );
        assert_eq!(match_text(&p), "keep newx");
        assert_eq!(paragraph_text(&p), "keep new\tx");
    }

    #[test]
    fn for_each_match_visits_every_occurrence() {
        let mut body = XmlElement::new("w:body")
            .with_child(new_paragraph("one cat two cat", None))
            .with_child(new_paragraph("cat", None));
        let paths = paragraph_paths(&body);
        let mut seen = Vec::new();
        let count = for_each_match(&mut body, &paths, "cat", MatchLimit::All, &mut |ctx| {
            seen.push((ctx.path.to_vec(), ctx.start));
            Ok(ctx.end)
        })
        .expect("matches");
        assert_eq!(count, 3);
        assert_eq!(seen, vec![(vec![0], 4), (vec![0], 12), (vec![1], 0)]);
    }

    #[test]
    fn heading_levels() {
        assert_eq!(heading_level("Heading2"), Some(2));
        assert_eq!(heading_level("heading 9"), Some(9));
        assert_eq!(heading_level("Title"), Some(0));
        assert_eq!(heading_level("Normal"), None);
    }

    #[test]
    fn set_ordered_respects_schema_order() {
        let mut rpr = XmlElement::new("w:rPr").with_child(val("w:sz", "24"));
        set_ordered(&mut rpr, XmlElement::new("w:b"), RPR_ORDER);
        set_ordered(&mut rpr, val("w:u", "single"), RPR_ORDER);
        set_ordered(&mut rpr, val("w:sz", "30"), RPR_ORDER);
        let names: Vec<_> = rpr.elements().map(|child| child.name.as_str()).collect();
        assert_eq!(names, vec!["w:b", "w:sz", "w:u"]);
        assert_eq!(rpr.child("w:sz").and_then(|sz| sz.attr("w:val")), Some("30"));
    }

    #[test]
    fn isolate_char_range_counts_characters() {
        let mut p = paragraph(r#"<w:p><w:r><w:t>héllo wörld</w:t></w:r></w:p>"#);
        let paths = isolate_char_range(&mut p, 6, 11);
        assert_eq!(paths.len(), 1);
        let run = p.at_path(&paths[0]).expect("run");
        assert_eq!(run_text(run), "wörld");
    }
}
