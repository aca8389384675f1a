use std::time::Duration;

use tempfile::TempDir;
use word_core::body::RunFormat;
use word_core::control::{
    ChangeFilter, FormatTextRequest, HeaderFooterRequest, HeadingRequest, HyperlinkAction,
    InsertPosition, NearTextTarget, PageNumberRequest, ParagraphRequest, TextLocation,
};
use word_core::services::DocumentRegistry;
use word_core::store::DocumentStore;
use word_core::{ControlError, DocumentControl};
use word_ooxml::Package;
use word_ooxml::schema::{REL_HYPERLINK, REL_IMAGE, REL_NUMBERING};

/// A 1x1 RGBA PNG.
const PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

fn control() -> (TempDir, DocumentControl) {
    let dir = tempfile::tempdir().expect("tempdir");
    let control = DocumentControl::new(DocumentStore::new(dir.path()), DocumentRegistry::default())
        .with_author("Review Bot", None);
    (dir, control)
}

async fn paragraph(control: &DocumentControl, filename: &str, text: &str) -> usize {
    control
        .add_paragraph(
            filename,
            ParagraphRequest {
                text: text.to_string(),
                ..ParagraphRequest::default()
            },
        )
        .await
        .expect("paragraph added")
        .paragraph_index
}

#[tokio::test]
async fn build_and_read_back_a_report() {
    let (dir, control) = control();
    control
        .create_document("report", Some("Quarterly".into()), None)
        .await
        .expect("created");
    assert!(dir.path().join("report.docx").exists());

    control
        .add_heading(
            "report",
            HeadingRequest {
                text: "Summary".into(),
                level: 1,
                ..HeadingRequest::default()
            },
        )
        .await
        .expect("heading");
    paragraph(&control, "report", "Revenue grew in every region.").await;
    control
        .add_table(
            "report",
            2,
            2,
            Some(vec![
                vec!["Region".into(), "Growth".into()],
                vec!["North".into(), "12%".into()],
            ]),
        )
        .await
        .expect("table");

    let outline = control.get_document_outline("report").await.expect("outline");
    assert!(outline.paragraphs.iter().any(|p| p.text == "Summary" && p.style == "Heading1"));
    assert_eq!(outline.tables.len(), 1);

    let info = control.get_document_info("report").await.expect("info");
    assert_eq!(info.title.as_deref(), Some("Quarterly"));
    assert_eq!(info.table_count, 1);
    assert!(!info.protected);

    let search = control
        .find_text_in_document("report", "north", false, true)
        .await
        .expect("search");
    assert_eq!(search.total_count, 1);
    assert_eq!(
        search.occurrences[0].location,
        TextLocation::TableCell {
            table_index: 0,
            row: 1,
            cell: 0
        }
    );

    let text = control.get_document_text("report").await.expect("text");
    assert!(text.text.contains("Region | Growth"));
}

#[tokio::test]
async fn review_cycle_with_comments_and_tracked_changes() {
    let (_dir, control) = control();
    control.create_document("draft", None, None).await.expect("created");
    let index = paragraph(&control, "draft", "The quick brown fox.").await;

    let comment = control
        .add_comment("draft", "brown fox", "Which fox?", None, None)
        .await
        .expect("comment");
    assert_eq!(comment.author, "Review Bot");
    assert_eq!(comment.initials, "RB");
    assert_eq!(comment.paragraph_index, Some(index));

    let comments = control
        .get_comments_for_paragraph("draft", index)
        .await
        .expect("comments");
    assert_eq!(comments.total_comments, 1);
    assert_eq!(comments.comments[0].anchor_text, "brown fox");

    control
        .track_replace("draft", "quick", "slow", Some("Editor".into()))
        .await
        .expect("tracked");
    let changes = control.list_tracked_changes("draft").await.expect("changes");
    assert_eq!(changes.insertions, 1);
    assert_eq!(changes.deletions, 1);
    assert!(changes.changes.iter().all(|change| change.author == "Editor"));

    let resolved = control
        .accept_tracked_changes(
            "draft",
            ChangeFilter {
                author: Some("Editor".into()),
                ..ChangeFilter::default()
            },
        )
        .await
        .expect("accepted");
    assert!(resolved.count > 0);
    let text = control.get_document_text("draft").await.expect("text");
    assert!(text.text.contains("The slow brown fox."));

    let none_left = control
        .reject_tracked_changes("draft", ChangeFilter::default())
        .await
        .expect("nothing to reject");
    assert_eq!(none_left.count, 0);
}

#[tokio::test]
async fn footnotes_are_added_validated_and_cleaned() {
    let (_dir, control) = control();
    control.create_document("notes", None, None).await.expect("created");
    paragraph(&control, "notes", "Claims need sources.").await;
    let figures = paragraph(&control, "notes", "So do figures.").await;

    let first = control
        .add_footnote_after_text("notes", "sources", "Smith 2020.", None)
        .await
        .expect("footnote");
    assert_eq!(first.note_id, 1);
    let second = control
        .add_footnote_to_document("notes", figures, "Table 3.")
        .await
        .expect("footnote");
    assert_eq!(second.note_id, 2);

    let report = control.validate_document_footnotes("notes").await.expect("report");
    assert!(report.is_valid, "issues: {:?}", report.issues);
    assert_eq!(report.footnote_ids, vec![1, 2]);

    let deleted = control
        .delete_footnote_robust("notes", None, Some("figures"), true)
        .await
        .expect("deleted");
    assert_eq!(deleted.note_id, 2);
    assert!(deleted.orphans_removed.is_empty());

    let missing = control
        .delete_footnote_from_document("notes", Some(9), None, None)
        .await;
    assert!(matches!(missing, Err(ControlError::NotFound(_))));

    let copy = control
        .add_footnote_before_text("notes", "Claims", "Intro.", Some("notes-copy"))
        .await
        .expect("copy written");
    assert_eq!(copy.note_id, 2);
    let original = control.validate_document_footnotes("notes").await.expect("report");
    assert_eq!(original.footnote_ids, vec![1]);
}

#[tokio::test]
async fn protection_and_signature_round_trip() {
    let (_dir, control) = control();
    control.create_document("contract", None, None).await.expect("created");
    paragraph(&control, "contract", "Terms apply.").await;

    control.protect_document("contract", "s3cret").await.expect("protected");
    let report = control
        .verify_document("contract", Some("s3cret"))
        .await
        .expect("verified");
    assert!(report.protected && report.enforced);
    assert_eq!(report.algorithm.as_deref(), Some("SHA-512"));
    assert_eq!(report.password_valid, Some(true));

    let wrong = control.unprotect_document("contract", "guess").await;
    assert!(matches!(wrong, Err(ControlError::PermissionDenied(_))));
    control.unprotect_document("contract", "s3cret").await.expect("unprotected");
    let again = control.unprotect_document("contract", "s3cret").await;
    assert!(matches!(again, Err(ControlError::InvalidInput(_))));

    let signature = control
        .add_digital_signature("contract", "Ada Lovelace", Some("Approval"))
        .await
        .expect("signed");
    let report = control.verify_document("contract", None).await.expect("verified");
    assert_eq!(report.signature.as_ref(), Some(&signature));
    assert_eq!(report.signature_valid, Some(true));
    assert_eq!(report.password_valid, None);

    paragraph(&control, "contract", "Added after signing.").await;
    let report = control.verify_document("contract", None).await.expect("verified");
    assert_eq!(report.signature_valid, Some(false));
}

#[tokio::test]
async fn sections_headers_and_page_numbers() {
    let (dir, control) = control();
    control.create_document("layout", None, None).await.expect("created");
    paragraph(&control, "layout", "Chapter one.").await;

    let headers = control
        .add_header_footer(
            "layout",
            HeaderFooterRequest {
                header_text: Some("Company Confidential".into()),
                header_alignment: "right".into(),
                footer_alignment: "center".into(),
                ..HeaderFooterRequest::default()
            },
        )
        .await
        .expect("header");
    assert_eq!(headers.header_part.as_deref(), Some("word/header1.xml"));
    assert!(headers.footer_part.is_none());

    control
        .add_page_numbers(
            "layout",
            PageNumberRequest {
                prefix: "Page ".into(),
                include_total: true,
                ..PageNumberRequest::default()
            },
        )
        .await
        .expect("page numbers");

    let section = control
        .add_section_break("layout", "continuous")
        .await
        .expect("section break");
    assert_eq!(section.section_count, 2);
    let info = control.get_document_info("layout").await.expect("info");
    assert_eq!(info.section_count, 2);

    let package = Package::open(&dir.path().join("layout.docx")).expect("package");
    let footer = package.xml_part("word/footer1.xml").expect("footer");
    let instructions: Vec<String> = footer
        .root
        .descendants_named("w:instrText")
        .map(|el| el.text().trim().to_string())
        .collect();
    assert_eq!(instructions, vec!["PAGE", "NUMPAGES"]);

    let bad = control.add_section_break("layout", "sideways").await;
    assert!(matches!(bad, Err(ControlError::InvalidInput(_))));
}

async fn heading(control: &DocumentControl, filename: &str, text: &str) {
    control
        .add_heading(
            filename,
            HeadingRequest {
                text: text.to_string(),
                level: 1,
                ..HeadingRequest::default()
            },
        )
        .await
        .expect("heading added");
}

fn field_chars(dir: &TempDir, file: &str, kind: &str) -> usize {
    let package = Package::open(&dir.path().join(file)).expect("package");
    let document = package.xml_part("word/document.xml").expect("document");
    document
        .root
        .descendants_named("w:fldChar")
        .filter(|fc| fc.attr("w:fldCharType") == Some(kind))
        .count()
}

#[tokio::test]
async fn block_replacement_skips_the_table_of_contents() {
    let (dir, control) = control();
    control.create_document("toc", None, None).await.expect("created");
    heading(&control, "toc", "Intro").await;
    paragraph(&control, "toc", "old intro").await;
    heading(&control, "toc", "Results").await;
    paragraph(&control, "toc", "results body").await;

    let toc = control
        .add_table_of_contents("toc", "Contents", 3)
        .await
        .expect("toc");
    assert_eq!(toc.headings, 2);

    let replaced = control
        .replace_paragraph_block_below_header("toc", "Intro", &["new intro".to_string()])
        .await
        .expect("replaced");
    assert_eq!(replaced.removed, 1);
    control
        .replace_block_between_manual_anchors("toc", "Results", &["fresh".to_string()], None, None)
        .await
        .expect("replaced between anchors");

    let text = control.get_document_text("toc").await.expect("text").text;
    assert!(text.contains("new intro"));
    assert!(!text.contains("old intro"));
    assert!(text.contains("fresh"));
    assert!(!text.contains("results body"));
    assert_eq!(field_chars(&dir, "toc.docx", "begin"), 1);
    assert_eq!(field_chars(&dir, "toc.docx", "end"), 1);

    let outline = control.get_document_outline("toc").await.expect("outline");
    let entries: Vec<&str> = outline
        .paragraphs
        .iter()
        .filter(|p| p.style.starts_with("TOC") && p.style != "TOCHeading")
        .map(|p| p.text.as_str())
        .collect();
    assert_eq!(entries, vec!["Intro", "Results"]);
}

#[cfg(unix)]
#[tokio::test]
async fn output_alias_of_the_source_edits_in_place() {
    let (dir, control) = control();
    control.create_document("a", None, None).await.expect("created");
    paragraph(&control, "a", "hello there").await;
    std::os::unix::fs::symlink(dir.path().join("a.docx"), dir.path().join("alias.docx"))
        .expect("symlink");

    let added = tokio::time::timeout(
        Duration::from_secs(5),
        control.add_footnote_after_text("a", "hello", "note", Some("alias")),
    )
    .await
    .expect("edit finishes without waiting on its own lock")
    .expect("footnote");
    assert_eq!(added.note_id, 1);

    let meta = std::fs::symlink_metadata(dir.path().join("alias.docx")).expect("alias");
    assert!(meta.file_type().is_symlink());
    let report = tokio::time::timeout(
        Duration::from_secs(5),
        control.validate_document_footnotes("a"),
    )
    .await
    .expect("lock released")
    .expect("report");
    assert_eq!(report.footnote_ids, vec![1]);
}

#[tokio::test]
async fn merge_relinks_relationships_and_drops_note_markers() {
    let (dir, control) = control();
    std::fs::write(dir.path().join("pixel.png"), PIXEL_PNG).expect("image");
    control.create_document("a", None, None).await.expect("created");
    paragraph(&control, "a", "Part A.").await;
    control.create_document("b", None, None).await.expect("created");
    paragraph(&control, "b", "See the docs.").await;
    control
        .manage_hyperlinks(
            "b",
            HyperlinkAction::Add,
            Some("docs"),
            Some("https://example.com/docs"),
            None,
        )
        .await
        .expect("hyperlink");
    control.add_picture("b", "pixel.png", Some(1.0)).await.expect("picture");
    control
        .add_footnote_after_text("b", "See", "A note.", None)
        .await
        .expect("footnote");

    let report = control
        .merge_documents("merged", &["a".to_string(), "b".to_string()], true)
        .await
        .expect("merged");
    assert_eq!(report.relinked_relationships, 2);

    let package = Package::open(&dir.path().join("merged.docx")).expect("package");
    let document = package.xml_part("word/document.xml").expect("document");
    assert_eq!(document.root.descendants_named("w:footnoteReference").count(), 0);
    let rels = package.relationships("word/document.xml").expect("rels");
    let image = rels.find_by_type(REL_IMAGE).expect("image relationship");
    assert!(package.has_part(&format!("word/{}", image.target)));
    let blip = document.root.descendants_named("a:blip").next().expect("blip");
    assert_eq!(blip.attr("r:embed"), Some(image.id.as_str()));
    let link = rels.find_by_type(REL_HYPERLINK).expect("hyperlink relationship");
    assert!(link.external);
    assert_eq!(link.target, "https://example.com/docs");

    let links = control
        .manage_hyperlinks("merged", HyperlinkAction::List, None, None, None)
        .await
        .expect("links");
    assert_eq!(links.count, 1);
    assert_eq!(links.hyperlinks[0].text, "docs");
    let text = control.get_document_text("merged").await.expect("text").text;
    assert!(text.contains("Part A.") && text.contains("See the docs."));
}

#[tokio::test]
async fn listing_skips_lock_files_and_other_extensions() {
    let (dir, control) = control();
    control.create_document("report", None, None).await.expect("created");
    std::fs::write(dir.path().join("~$report.docx"), b"lock").expect("lock file");
    std::fs::write(dir.path().join("notes.txt"), b"text").expect("text file");

    let listing = control.list_available_documents(".").await.expect("listing");
    let names: Vec<&str> = listing.documents.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["report.docx"]);
    assert!(listing.documents[0].size_bytes > 0);

    let missing = control.list_available_documents("nowhere").await;
    assert!(matches!(missing, Err(ControlError::NotFound(_))));
}

#[tokio::test]
async fn search_and_replace_spans_runs_and_reaches_tables() {
    let (_dir, control) = control();
    control.create_document("edit", None, None).await.expect("created");
    let index = paragraph(&control, "edit", "Hello brave world").await;
    let formatted = control
        .format_text(
            "edit",
            FormatTextRequest {
                paragraph_index: index,
                start_pos: 6,
                end_pos: 11,
                format: RunFormat {
                    bold: Some(true),
                    ..RunFormat::default()
                },
            },
        )
        .await
        .expect("formatted");
    assert_eq!(formatted.formatted_text, "brave");
    control
        .add_table("edit", 1, 1, Some(vec![vec!["old cell".into()]]))
        .await
        .expect("table");

    let spanning = control
        .search_and_replace("edit", "o brave w", "o bold w")
        .await
        .expect("replaced");
    assert_eq!(spanning.replacements, 1);
    let in_table = control
        .search_and_replace("edit", "old cell", "new cell")
        .await
        .expect("replaced");
    assert_eq!(in_table.replacements, 1);

    let text = control.get_document_text("edit").await.expect("text").text;
    assert!(text.contains("Hello bold world"));
    assert!(text.contains("new cell"));
    assert!(!text.contains("old cell"));
}

#[tokio::test]
async fn numbered_list_creates_missing_numbering_part() {
    let (dir, control) = control();
    control.create_document("list", None, None).await.expect("created");
    paragraph(&control, "list", "Steps follow.").await;

    let path = dir.path().join("list.docx");
    let mut package = Package::open(&path).expect("package");
    let mut rels = package.relationships("word/document.xml").expect("rels");
    let numbering_id = rels.find_by_type(REL_NUMBERING).expect("numbering rel").id.clone();
    rels.remove(&numbering_id);
    package.set_relationships("word/document.xml", &rels);
    assert!(package.remove_part("word/numbering.xml"));
    let mut types = package.content_types().expect("types");
    types.remove_override("word/numbering.xml");
    package.set_content_types(&types);
    std::fs::write(&path, package.to_bytes().expect("bytes")).expect("written");

    let inserted = control
        .insert_numbered_list_near_text(
            "list",
            NearTextTarget {
                target_text: Some("Steps".into()),
                target_paragraph_index: None,
            },
            &["first".to_string(), "second".to_string()],
            InsertPosition::After,
            "number",
        )
        .await
        .expect("list inserted");
    assert_eq!(inserted.inserted, 2);

    let package = Package::open(&path).expect("package");
    let rels = package.relationships("word/document.xml").expect("rels");
    assert!(rels.find_by_type(REL_NUMBERING).is_some());
    assert!(package.content_types().expect("types").content_type_of("word/numbering.xml").is_some());
    let numbering = package.xml_part("word/numbering.xml").expect("numbering");
    let document = package.xml_part("word/document.xml").expect("document");
    let num_ids: Vec<String> = document
        .root
        .descendants_named("w:numId")
        .filter_map(|id| id.attr("w:val").map(ToString::to_string))
        .collect();
    assert_eq!(num_ids.len(), 2);
    assert!(numbering
        .root
        .children_named("w:num")
        .any(|num| num.attr("w:numId") == Some(num_ids[0].as_str())));
    let decimal = numbering
        .root
        .descendants_named("w:numFmt")
        .any(|fmt| fmt.attr("w:val") == Some("decimal"));
    assert!(decimal);
}

#[tokio::test]
async fn picture_adds_media_relationship_and_content_type() {
    let (dir, control) = control();
    std::fs::write(dir.path().join("pixel.png"), PIXEL_PNG).expect("image");
    control.create_document("pic", None, None).await.expect("created");

    let added = control.add_picture("pic", "pixel.png", Some(2.0)).await.expect("picture");
    assert_eq!(added.media_part, "word/media/image1.png");
    assert!((added.width_inches - 2.0).abs() < 0.01);
    assert!((added.height_inches - 2.0).abs() < 0.01);

    let package = Package::open(&dir.path().join("pic.docx")).expect("package");
    assert_eq!(package.part("word/media/image1.png"), Some(PIXEL_PNG));
    let types = package.content_types().expect("types");
    assert_eq!(types.content_type_of("word/media/image1.png"), Some("image/png"));
    let rels = package.relationships("word/document.xml").expect("rels");
    let image = rels.find_by_type(REL_IMAGE).expect("image relationship");
    assert_eq!(image.target, "media/image1.png");

    let bad = control.add_picture("pic", "pixel.svg", None).await;
    assert!(bad.is_err());
}

#[tokio::test]
async fn edits_that_change_nothing_leave_the_file_untouched() {
    let (dir, control) = control();
    control.create_document("same", None, None).await.expect("created");
    paragraph(&control, "same", "Nothing to review.").await;
    let path = dir.path().join("same.docx");
    let before = std::fs::read(&path).expect("bytes");
    let modified = std::fs::metadata(&path).expect("meta").modified().expect("mtime");

    let accepted = control
        .accept_tracked_changes("same", ChangeFilter::default())
        .await
        .expect("accept");
    assert_eq!(accepted.count, 0);
    let replaced = control
        .search_and_replace("same", "absent", "present")
        .await
        .expect("replace");
    assert_eq!(replaced.replacements, 0);

    assert_eq!(std::fs::read(&path).expect("bytes"), before);
    assert_eq!(std::fs::metadata(&path).expect("meta").modified().expect("mtime"), modified);
}
