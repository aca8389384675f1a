//! Blank-document template and built-in style definitions.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::content_types::ContentTypes;
use crate::rels::Relationships;
use crate::schema::{
    CT_CORE_PROPS, CT_EXTENDED_PROPS, CT_MAIN_DOCUMENT, CT_NUMBERING, CT_RELATIONSHIPS,
    CT_SETTINGS, CT_STYLES, CT_XML, NS_A, NS_CORE_PROPS, NS_DC, NS_DCMITYPE, NS_DCTERMS,
    NS_EXTENDED_PROPS, NS_O, NS_PIC, NS_R, NS_V, NS_VT, NS_W, NS_W10, NS_WP, NS_XSI,
    PART_APP_PROPS, PART_CORE_PROPS, PART_DOCUMENT, REL_CORE_PROPS, REL_EXTENDED_PROPS,
    REL_NUMBERING, REL_OFFICE_DOCUMENT, REL_SETTINGS, REL_STYLES,
};
use crate::xml::{XmlDocument, XmlElement};

pub const PART_STYLES: &str = "word/styles.xml";
pub const PART_SETTINGS: &str = "word/settings.xml";
pub const PART_NUMBERING: &str = "word/numbering.xml";

/// Numbering instance used by the `ListBullet` style.
pub const BULLET_NUM_ID: &str = "1";
/// Numbering instance used by the `ListNumber` style.
pub const DECIMAL_NUM_ID: &str = "2";

/// Style ids shipped in the blank template, in definition order.
pub const BUILTIN_STYLE_IDS: &[&str] = &[
    "Normal",
    "Title",
    "Heading1",
    "Heading2",
    "Heading3",
    "Heading4",
    "Heading5",
    "Heading6",
    "Heading7",
    "Heading8",
    "Heading9",
    "ListParagraph",
    "ListBullet",
    "ListNumber",
    "TableGrid",
    "Hyperlink",
    "FootnoteText",
    "FootnoteReference",
    "EndnoteText",
    "EndnoteReference",
    "CommentReference",
    "CommentText",
    "TOCHeading",
];

fn val(name: &str, value: &str) -> XmlElement {
    XmlElement::new(name).with_attr("w:val", value)
}

fn style(kind: &str, id: &str, name: &str) -> XmlElement {
    XmlElement::new("w:style")
        .with_attr("w:type", kind)
        .with_attr("w:styleId", id)
        .with_child(val("w:name", name))
}

fn spacing(before: &str, after: &str) -> XmlElement {
    XmlElement::new("w:spacing")
        .with_attr("w:before", before)
        .with_attr("w:after", after)
}

fn heading_style(level: u8) -> XmlElement {
    let size = match level {
        1 => "32",
        2 => "26",
        3 => "24",
        _ => "22",
    };
    let before = if level == 1 { "480" } else { "200" };
    let mut rpr = XmlElement::new("w:rPr")
        .with_child(XmlElement::new("w:b"))
        .with_child(val("w:color", "2F5496"))
        .with_child(val("w:sz", size))
        .with_child(val("w:szCs", size));
    if level >= 4 {
        rpr.insert(1, XmlElement::new("w:i"));
    }
    style("paragraph", &format!("Heading{level}"), &format!("heading {level}"))
        .with_child(val("w:basedOn", "Normal"))
        .with_child(val("w:next", "Normal"))
        .with_child(val("w:uiPriority", "9"))
        .with_child(XmlElement::new("w:qFormat"))
        .with_child(
            XmlElement::new("w:pPr")
                .with_child(XmlElement::new("w:keepNext"))
                .with_child(XmlElement::new("w:keepLines"))
                .with_child(spacing(before, "0"))
                .with_child(val("w:outlineLvl", &(level - 1).to_string())),
        )
        .with_child(rpr)
}

fn list_style(id: &str, name: &str, num_id: &str) -> XmlElement {
    style("paragraph", id, name)
        .with_child(val("w:basedOn", "Normal"))
        .with_child(
            XmlElement::new("w:pPr")
                .with_child(
                    XmlElement::new("w:numPr")
                        .with_child(val("w:ilvl", "0"))
                        .with_child(val("w:numId", num_id)),
                )
                .with_child(XmlElement::new("w:contextualSpacing")),
        )
}

/// `TOC1` to `TOC9`: the styles Word gives table of contents entries.
fn toc_style(level: u8) -> XmlElement {
    let indent = (u32::from(level - 1) * 220).to_string();
    style("paragraph", &format!("TOC{level}"), &format!("toc {level}"))
        .with_child(val("w:basedOn", "Normal"))
        .with_child(val("w:next", "Normal"))
        .with_child(val("w:uiPriority", "39"))
        .with_child(
            XmlElement::new("w:pPr")
                .with_child(XmlElement::new("w:spacing").with_attr("w:after", "100"))
                .with_child(XmlElement::new("w:ind").with_attr("w:left", indent)),
        )
}

fn note_text_style(id: &str, name: &str) -> XmlElement {
    style("paragraph", id, name)
        .with_child(val("w:basedOn", "Normal"))
        .with_child(
            XmlElement::new("w:pPr").with_child(
                XmlElement::new("w:spacing")
                    .with_attr("w:after", "0")
                    .with_attr("w:line", "240")
                    .with_attr("w:lineRule", "auto"),
            ),
        )
        .with_child(
            XmlElement::new("w:rPr")
                .with_child(val("w:sz", "20"))
                .with_child(val("w:szCs", "20")),
        )
}

fn superscript_style(id: &str, name: &str) -> XmlElement {
    style("character", id, name).with_child(
        XmlElement::new("w:rPr").with_child(val("w:vertAlign", "superscript")),
    )
}

/// Definition of a built-in style by id, used both by the template and to add
/// missing styles to existing documents.
#[must_use]
pub fn builtin_style(style_id: &str) -> Option<XmlElement> {
    let element = match style_id {
        "Normal" => style("paragraph", "Normal", "Normal")
            .with_attr("w:default", "1")
            .with_child(XmlElement::new("w:qFormat"))
            .with_child(XmlElement::new("w:pPr").with_child(
                XmlElement::new("w:spacing")
                    .with_attr("w:after", "160")
                    .with_attr("w:line", "259")
                    .with_attr("w:lineRule", "auto"),
            )),
        "Title" => style("paragraph", "Title", "Title")
            .with_child(val("w:basedOn", "Normal"))
            .with_child(val("w:next", "Normal"))
            .with_child(XmlElement::new("w:qFormat"))
            .with_child(XmlElement::new("w:pPr").with_child(spacing("0", "0")))
            .with_child(
                XmlElement::new("w:rPr")
                    .with_child(val("w:spacing", "-10"))
                    .with_child(val("w:kern", "28"))
                    .with_child(val("w:sz", "56"))
                    .with_child(val("w:szCs", "56")),
            ),
        "ListParagraph" => style("paragraph", "ListParagraph", "List Paragraph")
            .with_child(val("w:basedOn", "Normal"))
            .with_child(
                XmlElement::new("w:pPr")
                    .with_child(XmlElement::new("w:ind").with_attr("w:left", "720"))
                    .with_child(XmlElement::new("w:contextualSpacing")),
            ),
        "ListBullet" => list_style("ListBullet", "List Bullet", BULLET_NUM_ID),
        "ListNumber" => list_style("ListNumber", "List Number", DECIMAL_NUM_ID),
        "TableGrid" => {
            let border = |name: &str| {
                XmlElement::new(name)
                    .with_attr("w:val", "single")
                    .with_attr("w:sz", "4")
                    .with_attr("w:space", "0")
                    .with_attr("w:color", "auto")
            };
            let borders = ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"]
                .into_iter()
                .fold(XmlElement::new("w:tblBorders"), |acc, side| {
                    acc.with_child(border(side))
                });
            style("table", "TableGrid", "Table Grid")
                .with_child(val("w:basedOn", "TableNormal"))
                .with_child(
                    XmlElement::new("w:pPr").with_child(
                        XmlElement::new("w:spacing")
                            .with_attr("w:after", "0")
                            .with_attr("w:line", "240")
                            .with_attr("w:lineRule", "auto"),
                    ),
                )
                .with_child(XmlElement::new("w:tblPr").with_child(borders))
        }
        "Hyperlink" => style("character", "Hyperlink", "Hyperlink").with_child(
            XmlElement::new("w:rPr")
                .with_child(val("w:color", "0563C1"))
                .with_child(val("w:u", "single")),
        ),
        "FootnoteText" => note_text_style("FootnoteText", "footnote text"),
        "EndnoteText" => note_text_style("EndnoteText", "endnote text"),
        "FootnoteReference" => superscript_style("FootnoteReference", "footnote reference"),
        "EndnoteReference" => superscript_style("EndnoteReference", "endnote reference"),
        "CommentReference" => style("character", "CommentReference", "annotation reference")
            .with_child(
                XmlElement::new("w:rPr")
                    .with_child(val("w:sz", "16"))
                    .with_child(val("w:szCs", "16")),
            ),
        "CommentText" => style("paragraph", "CommentText", "annotation text")
            .with_child(val("w:basedOn", "Normal"))
            .with_child(
                XmlElement::new("w:rPr")
                    .with_child(val("w:sz", "20"))
                    .with_child(val("w:szCs", "20")),
            ),
        "TOCHeading" => style("paragraph", "TOCHeading", "TOC Heading")
            .with_child(val("w:basedOn", "Heading1"))
            .with_child(val("w:next", "Normal"))
            .with_child(XmlElement::new("w:qFormat"))
            .with_child(XmlElement::new("w:pPr").with_child(val("w:outlineLvl", "9"))),
        other => {
            if let Some(level) = other.strip_prefix("TOC") {
                let level = level.parse::<u8>().ok().filter(|level| (1..=9).contains(level))?;
                return Some(toc_style(level));
            }
            let level = other.strip_prefix("Heading")?.parse::<u8>().ok()?;
            if !(1..=9).contains(&level) {
                return None;
            }
            heading_style(level)
        }
    };
    Some(element)
}

fn styles_document() -> XmlDocument {
    let defaults = XmlElement::new("w:docDefaults")
        .with_child(
            XmlElement::new("w:rPrDefault").with_child(
                XmlElement::new("w:rPr")
                    .with_child(
                        XmlElement::new("w:rFonts")
                            .with_attr("w:ascii", "Calibri")
                            .with_attr("w:hAnsi", "Calibri")
                            .with_attr("w:eastAsia", "Calibri")
                            .with_attr("w:cs", "Calibri"),
                    )
                    .with_child(val("w:sz", "22"))
                    .with_child(val("w:szCs", "22"))
                    .with_child(
                        XmlElement::new("w:lang")
                            .with_attr("w:val", "en-US")
                            .with_attr("w:eastAsia", "en-US")
                            .with_attr("w:bidi", "ar-SA"),
                    ),
            ),
        )
        .with_child(XmlElement::new("w:pPrDefault"));

    let table_normal = style("table", "TableNormal", "Normal Table")
        .with_attr("w:default", "1")
        .with_child(
            XmlElement::new("w:tblPr")
                .with_child(XmlElement::new("w:tblInd").with_attr("w:w", "0").with_attr("w:type", "dxa"))
                .with_child(
                    XmlElement::new("w:tblCellMar")
                        .with_child(XmlElement::new("w:top").with_attr("w:w", "0").with_attr("w:type", "dxa"))
                        .with_child(XmlElement::new("w:left").with_attr("w:w", "108").with_attr("w:type", "dxa"))
                        .with_child(XmlElement::new("w:bottom").with_attr("w:w", "0").with_attr("w:type", "dxa"))
                        .with_child(XmlElement::new("w:right").with_attr("w:w", "108").with_attr("w:type", "dxa")),
                ),
        );

    let mut root = XmlElement::new("w:styles")
        .with_attr("xmlns:w", NS_W)
        .with_attr("xmlns:r", NS_R)
        .with_child(defaults)
        .with_child(table_normal);
    for id in BUILTIN_STYLE_IDS {
        if let Some(element) = builtin_style(id) {
            root.push(element);
        }
    }
    XmlDocument::new(root)
}

/// A `w:abstractNum` for a single-level-per-depth bullet or decimal list.
#[must_use]
pub fn abstract_numbering(abstract_id: &str, bullet: bool) -> XmlElement {
    const BULLETS: [&str; 3] = ["\u{2022}", "o", "\u{25aa}"];
    let mut element = XmlElement::new("w:abstractNum")
        .with_attr("w:abstractNumId", abstract_id)
        .with_child(val("w:multiLevelType", "hybridMultilevel"));
    for level in 0..9_u32 {
        let (format, text) = if bullet {
            ("bullet", BULLETS[level as usize % 3].to_string())
        } else {
            ("decimal", format!("%{}.", level + 1))
        };
        let indent = 720 * (level + 1);
        let mut lvl = XmlElement::new("w:lvl")
            .with_attr("w:ilvl", level.to_string())
            .with_child(val("w:start", "1"))
            .with_child(val("w:numFmt", format))
            .with_child(val("w:lvlText", &text))
            .with_child(val("w:lvlJc", "left"))
            .with_child(XmlElement::new("w:pPr").with_child(
                XmlElement::new("w:ind")
                    .with_attr("w:left", indent.to_string())
                    .with_attr("w:hanging", "360"),
            ));
        if bullet {
            lvl.push(
                XmlElement::new("w:rPr").with_child(
                    XmlElement::new("w:rFonts")
                        .with_attr("w:ascii", "Symbol")
                        .with_attr("w:hAnsi", "Symbol")
                        .with_attr("w:hint", "default"),
                ),
            );
        }
        element.push(lvl);
    }
    element
}

/// A `w:num` instance pointing at an abstract definition.
#[must_use]
pub fn numbering_instance(num_id: &str, abstract_id: &str) -> XmlElement {
    XmlElement::new("w:num")
        .with_attr("w:numId", num_id)
        .with_child(val("w:abstractNumId", abstract_id))
}

fn numbering_document() -> XmlDocument {
    XmlDocument::new(
        XmlElement::new("w:numbering")
            .with_attr("xmlns:w", NS_W)
            .with_child(abstract_numbering("0", true))
            .with_child(abstract_numbering("1", false))
            .with_child(numbering_instance(BULLET_NUM_ID, "0"))
            .with_child(numbering_instance(DECIMAL_NUM_ID, "1")),
    )
}

fn settings_document() -> XmlDocument {
    XmlDocument::new(
        XmlElement::new("w:settings")
            .with_attr("xmlns:w", NS_W)
            .with_attr("xmlns:r", NS_R)
            .with_child(XmlElement::new("w:zoom").with_attr("w:percent", "100"))
            .with_child(val("w:defaultTabStop", "720"))
            .with_child(val("w:characterSpacingControl", "doNotCompress"))
            .with_child(
                XmlElement::new("w:compat").with_child(
                    XmlElement::new("w:compatSetting")
                        .with_attr("w:name", "compatibilityMode")
                        .with_attr("w:uri", "http://schemas.microsoft.com/office/word")
                        .with_attr("w:val", "15"),
                ),
            ),
    )
}

/// Final section properties of a blank document: US Letter, one-inch margins.
#[must_use]
pub fn default_section_properties() -> XmlElement {
    XmlElement::new("w:sectPr")
        .with_child(
            XmlElement::new("w:pgSz")
                .with_attr("w:w", "12240")
                .with_attr("w:h", "15840"),
        )
        .with_child(
            XmlElement::new("w:pgMar")
                .with_attr("w:top", "1440")
                .with_attr("w:right", "1440")
                .with_attr("w:bottom", "1440")
                .with_attr("w:left", "1440")
                .with_attr("w:header", "720")
                .with_attr("w:footer", "720")
                .with_attr("w:gutter", "0"),
        )
        .with_child(XmlElement::new("w:cols").with_attr("w:space", "720"))
        .with_child(XmlElement::new("w:docGrid").with_attr("w:linePitch", "360"))
}

/// Declares the namespaces document and header parts use for text, drawings, and VML.
#[must_use]
pub fn with_body_namespaces(element: XmlElement) -> XmlElement {
    element
        .with_attr("xmlns:w", NS_W)
        .with_attr("xmlns:r", NS_R)
        .with_attr("xmlns:wp", NS_WP)
        .with_attr("xmlns:a", NS_A)
        .with_attr("xmlns:pic", NS_PIC)
        .with_attr("xmlns:v", NS_V)
        .with_attr("xmlns:o", NS_O)
        .with_attr("xmlns:w10", NS_W10)
}

fn document_document() -> XmlDocument {
    XmlDocument::new(with_body_namespaces(XmlElement::new("w:document")).with_child(
        XmlElement::new("w:body").with_child(default_section_properties()),
    ))
}

fn w3cdtf(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `docProps/core.xml` for a freshly created document.
#[must_use]
pub fn core_properties(title: &str, author: &str, now: DateTime<Utc>) -> XmlDocument {
    let stamp = w3cdtf(now);
    XmlDocument::new(
        XmlElement::new("cp:coreProperties")
            .with_attr("xmlns:cp", NS_CORE_PROPS)
            .with_attr("xmlns:dc", NS_DC)
            .with_attr("xmlns:dcterms", NS_DCTERMS)
            .with_attr("xmlns:dcmitype", NS_DCMITYPE)
            .with_attr("xmlns:xsi", NS_XSI)
            .with_child(XmlElement::new("dc:title").with_text(title))
            .with_child(XmlElement::new("dc:subject"))
            .with_child(XmlElement::new("dc:creator").with_text(author))
            .with_child(XmlElement::new("cp:keywords"))
            .with_child(XmlElement::new("cp:lastModifiedBy").with_text(author))
            .with_child(XmlElement::new("cp:revision").with_text("1"))
            .with_child(
                XmlElement::new("dcterms:created")
                    .with_attr("xsi:type", "dcterms:W3CDTF")
                    .with_text(stamp.clone()),
            )
            .with_child(
                XmlElement::new("dcterms:modified")
                    .with_attr("xsi:type", "dcterms:W3CDTF")
                    .with_text(stamp),
            ),
    )
}

fn app_properties() -> XmlDocument {
    XmlDocument::new(
        XmlElement::new("Properties")
            .with_attr("xmlns", NS_EXTENDED_PROPS)
            .with_attr("xmlns:vt", NS_VT)
            .with_child(XmlElement::new("Application").with_text("word-mcp"))
            .with_child(XmlElement::new("DocSecurity").with_text("0"))
            .with_child(XmlElement::new("AppVersion").with_text("1.0")),
    )
}

/// All parts of a blank document, in the order they are written to the zip.
#[must_use]
pub fn blank_parts(title: &str, author: &str, now: DateTime<Utc>) -> Vec<(String, Vec<u8>)> {
    let mut types = ContentTypes::default();
    types.ensure_default("rels", CT_RELATIONSHIPS);
    types.ensure_default("xml", CT_XML);
    types.ensure_override(PART_DOCUMENT, CT_MAIN_DOCUMENT);
    types.ensure_override(PART_STYLES, CT_STYLES);
    types.ensure_override(PART_SETTINGS, CT_SETTINGS);
    types.ensure_override(PART_NUMBERING, CT_NUMBERING);
    types.ensure_override(PART_CORE_PROPS, CT_CORE_PROPS);
    types.ensure_override(PART_APP_PROPS, CT_EXTENDED_PROPS);

    let mut package_rels = Relationships::new();
    package_rels.add(REL_OFFICE_DOCUMENT, PART_DOCUMENT, false);
    package_rels.add(REL_CORE_PROPS, PART_CORE_PROPS, false);
    package_rels.add(REL_EXTENDED_PROPS, PART_APP_PROPS, false);

    let mut document_rels = Relationships::new();
    document_rels.add(REL_STYLES, "styles.xml", false);
    document_rels.add(REL_SETTINGS, "settings.xml", false);
    document_rels.add(REL_NUMBERING, "numbering.xml", false);

    vec![
        ("[Content_Types].xml".to_string(), types.to_xml().into_bytes()),
        ("_rels/.rels".to_string(), package_rels.to_xml().into_bytes()),
        (PART_DOCUMENT.to_string(), document_document().to_bytes()),
        (
            "word/_rels/document.xml.rels".to_string(),
            document_rels.to_xml().into_bytes(),
        ),
        (PART_STYLES.to_string(), styles_document().to_bytes()),
        (PART_SETTINGS.to_string(), settings_document().to_bytes()),
        (PART_NUMBERING.to_string(), numbering_document().to_bytes()),
        (
            PART_CORE_PROPS.to_string(),
            core_properties(title, author, now).to_bytes(),
        ),
        (PART_APP_PROPS.to_string(), app_properties().to_bytes()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_id_has_a_definition() {
        for id in BUILTIN_STYLE_IDS {
            let element = builtin_style(id).expect("built-in style defined");
            assert_eq!(element.attr("w:styleId"), Some(*id));
        }
        assert!(builtin_style("Heading10").is_none());
        let toc2 = builtin_style("TOC2").expect("toc styles defined");
        assert_eq!(toc2.attr("w:styleId"), Some("TOC2"));
        assert_eq!(
            toc2.child("w:pPr")
                .and_then(|ppr| ppr.child("w:ind"))
                .and_then(|ind| ind.attr("w:left")),
            Some("220")
        );
        assert!(builtin_style("TOC0").is_none());
        assert!(builtin_style("TOC10").is_none());
        assert!(builtin_style("Fancy").is_none());
    }

    #[test]
    fn blank_parts_parse_as_xml() {
        let parts = blank_parts("Report", "Ada", Utc::now());
        for (name, bytes) in &parts {
            if std::path::Path::new(name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xml") || ext.eq_ignore_ascii_case("rels"))
            {
                XmlDocument::parse_bytes(bytes).unwrap_or_else(|err| panic!("{name}: {err}"));
            }
        }
        let styles = parts
            .iter()
            .find(|(name, _)| name == PART_STYLES)
            .map(|(_, bytes)| XmlDocument::parse_bytes(bytes).expect("styles parse"))
            .expect("styles part present");
        assert_eq!(
            styles.root.children_named("w:style").count(),
            BUILTIN_STYLE_IDS.len() + 1
        );
    }
}
