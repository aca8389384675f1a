use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use word_ooxml::rels::resolve_target;
use word_ooxml::schema::{PART_CORE_PROPS, REL_CORE_PROPS};
use word_ooxml::{Package, XmlDocument, XmlElement};

use crate::body::{
    body_paragraph_positions, body_table_positions, page_break_paragraph, paragraph_paths,
    paragraph_style, paragraph_text, table_text_grid,
};
use crate::document::Document;
use crate::sections::section_paths;
use crate::store::StoreError;
use crate::styles::{find_style, styles_part};

use super::protection::is_protected;
use super::{ControlError, DocumentControl};

const PREVIEW_CHARS: usize = 100;
const PDF_CONVERTERS: &[&str] = &[
    "libreoffice",
    "soffice",
    "/Applications/LibreOffice.app/Contents/MacOS/soffice",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentCreated {
    pub path: String,
    pub title: Option<String>,
    pub author: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentCopied {
    pub source: String,
    pub destination: String,
}

/// Core properties plus structural counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub path: String,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub keywords: Option<String>,
    pub last_modified_by: Option<String>,
    pub revision: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub paragraph_count: usize,
    pub table_count: usize,
    pub section_count: usize,
    pub word_count: usize,
    pub file_size_bytes: u64,
    pub protected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentText {
    pub path: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineParagraph {
    pub index: usize,
    pub style: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineTable {
    pub index: usize,
    pub rows: usize,
    pub columns: usize,
    pub preview: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentOutline {
    pub paragraphs: Vec<OutlineParagraph>,
    pub tables: Vec<OutlineTable>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListing {
    pub name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentList {
    pub directory: String,
    pub documents: Vec<DocumentListing>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    pub target: String,
    pub sources: Vec<String>,
    pub page_breaks: bool,
    pub relinked_relationships: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfReport {
    pub source: String,
    pub output: String,
    pub converter: String,
}

impl DocumentControl {
    /// Creates a blank document, replacing any existing file at the path.
    ///
    /// # Errors
    /// Returns `ControlError` if the path is invalid or the file cannot be written.
    pub async fn create_document(
        &self,
        filename: &str,
        title: Option<String>,
        author: Option<String>,
    ) -> Result<DocumentCreated, ControlError> {
        let path = self.resolve(filename)?;
        let author = self.author_or_default(author);
        let _guard = self.registry().lock(&path).await?;
        let package = Package::new_blank(title.as_deref().unwrap_or_default(), &author);
        self.store().save(&path, &package).await?;
        info!(path = %path.display(), "document created");
        Ok(DocumentCreated {
            path: path.display().to_string(),
            title,
            author,
        })
    }

    /// Copies a document; the default destination is `<stem>_copy.docx` beside it.
    ///
    /// # Errors
    /// Returns `NotFound` when the source is missing.
    pub async fn copy_document(
        &self,
        source: &str,
        destination: Option<&str>,
    ) -> Result<DocumentCopied, ControlError> {
        let source_path = self.resolve(source)?;
        let destination_path = match destination.filter(|name| !name.trim().is_empty()) {
            Some(name) => self.resolve(name)?,
            None => default_copy_path(&source_path),
        };
        if tokio::fs::metadata(&source_path).await.is_err() {
            return Err(StoreError::NotFound(source_path).into());
        }
        let _guard = self.registry().lock(&destination_path).await?;
        let bytes = tokio::fs::read(&source_path)
            .await
            .map_err(|err| StoreError::Locked {
                path: source_path.clone(),
                reason: err.to_string(),
            })?;
        self.store().check_writable(&destination_path).await?;
        self.store().write_bytes(&destination_path, bytes).await?;
        info!(source = %source_path.display(), destination = %destination_path.display(), "document copied");
        Ok(DocumentCopied {
            source: source_path.display().to_string(),
            destination: destination_path.display().to_string(),
        })
    }

    /// # Errors
    /// Returns `ControlError` if the document cannot be read.
    pub async fn get_document_info(&self, filename: &str) -> Result<DocumentInfo, ControlError> {
        let path = self.resolve(filename)?;
        let file_size_bytes = tokio::fs::metadata(&path).await.map_or(0, |meta| meta.len());
        self.inspect(filename, "get_document_info", |doc| {
            let mut info = read_core_properties(doc.package())?;
            let body = doc.body()?;
            info.path = doc.path().display().to_string();
            info.paragraph_count = body_paragraph_positions(body).len();
            info.table_count = body_table_positions(body).len();
            info.section_count = section_paths(body).len().max(1);
            info.word_count = paragraph_paths(body)
                .iter()
                .filter_map(|path| body.at_path(path))
                .map(|p| paragraph_text(p).split_whitespace().count())
                .sum();
            info.file_size_bytes = file_size_bytes;
            info.protected = is_protected(doc)?;
            Ok(info)
        })
        .await
    }

    /// Body text in order; table rows are rendered with cells joined by ` | `.
    ///
    /// # Errors
    /// Returns `ControlError` if the document cannot be read.
    pub async fn get_document_text(&self, filename: &str) -> Result<DocumentText, ControlError> {
        self.inspect(filename, "get_document_text", |doc| {
            let mut lines = Vec::new();
            push_block_text(doc.body()?, &mut lines);
            Ok(DocumentText {
                path: doc.path().display().to_string(),
                text: lines.join("\n"),
            })
        })
        .await
    }

    /// # Errors
    /// Returns `ControlError` if the document cannot be read.
    pub async fn get_document_outline(
        &self,
        filename: &str,
    ) -> Result<DocumentOutline, ControlError> {
        self.inspect(filename, "get_document_outline", |doc| {
            let body = doc.body()?;
            let paragraphs = body
                .children_named("w:p")
                .enumerate()
                .map(|(index, p)| OutlineParagraph {
                    index,
                    style: paragraph_style(p).unwrap_or("Normal").to_string(),
                    text: truncate_chars(&paragraph_text(p), PREVIEW_CHARS),
                })
                .collect();
            let tables = body
                .children_named("w:tbl")
                .enumerate()
                .map(|(index, table)| {
                    let grid = table_text_grid(table);
                    OutlineTable {
                        index,
                        rows: grid.len(),
                        columns: grid.iter().map(Vec::len).max().unwrap_or(0),
                        preview: grid.first().cloned().unwrap_or_default(),
                    }
                })
                .collect();
            Ok(DocumentOutline { paragraphs, tables })
        })
        .await
    }

    /// Lists `.docx` files in a directory, skipping `~$` lock files.
    ///
    /// # Errors
    /// Returns `NotFound` when the directory does not exist.
    pub async fn list_available_documents(
        &self,
        directory: &str,
    ) -> Result<DocumentList, ControlError> {
        let directory = if directory.trim().is_empty() { "." } else { directory };
        let dir = self.store().resolve_any(directory);
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|_| {
            ControlError::NotFound(format!("Directory {} does not exist", dir.display()))
        })?;
        let mut documents = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(StoreError::Io)? {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_docx = Path::new(&name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));
            if !is_docx || name.starts_with("~$") {
                continue;
            }
            let size_bytes = entry.metadata().await.map_or(0, |meta| meta.len());
            documents.push(DocumentListing { name, size_bytes });
        }
        documents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(DocumentList {
            directory: dir.display().to_string(),
            documents,
        })
    }

    /// Raw XML of the main document part.
    ///
    /// # Errors
    /// Returns `ControlError` if the document cannot be read.
    pub async fn get_document_xml(&self, filename: &str) -> Result<String, ControlError> {
        let path = self.resolve(filename)?;
        let package = self.store().load(&path).await?;
        let main = package.main_document_part();
        let bytes = package
            .part(&main)
            .ok_or_else(|| ControlError::Unsupported(format!("package has no {main} part")))?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Concatenates documents into `target`, starting from a copy of the first source.
    ///
    /// # Errors
    /// Returns `InvalidInput` without sources and `NotFound` for a missing source.
    pub async fn merge_documents(
        &self,
        target: &str,
        sources: &[String],
        add_page_breaks: bool,
    ) -> Result<MergeReport, ControlError> {
        let Some((first, rest)) = sources.split_first() else {
            return Err(ControlError::InvalidInput(
                "at least one source document is required".to_string(),
            ));
        };
        let target_path = self.resolve(target)?;
        let mut merged = self.open(first).await?;
        let mut relinked = 0;
        for source in rest {
            let appended = self.open(source).await?;
            relinked += append_document(&mut merged, &appended, add_page_breaks)?;
        }

        let _guard = self.registry().lock(&target_path).await?;
        self.store()
            .save(&target_path, &merged.into_package())
            .await?;
        info!(path = %target_path.display(), sources = sources.len(), "documents merged");
        Ok(MergeReport {
            target: target_path.display().to_string(),
            sources: sources.to_vec(),
            page_breaks: add_page_breaks,
            relinked_relationships: relinked,
        })
    }

    /// Converts a document to PDF with LibreOffice.
    ///
    /// # Errors
    /// Returns `External` listing every converter attempt when none succeeds.
    pub async fn convert_to_pdf(
        &self,
        filename: &str,
        output: Option<&str>,
    ) -> Result<PdfReport, ControlError> {
        let source = self.resolve(filename)?;
        if tokio::fs::metadata(&source).await.is_err() {
            return Err(StoreError::NotFound(source).into());
        }
        let plan = PdfPlan::new(&source, output.map(|name| self.store().resolve_any(name)));
        let mut failures = Vec::new();
        for converter in PDF_CONVERTERS {
            match run_converter(converter, &plan, self.pdf_timeout()).await {
                Ok(()) => {
                    if plan.produced != plan.output {
                        tokio::fs::rename(&plan.produced, &plan.output)
                            .await
                            .map_err(StoreError::Io)?;
                    }
                    info!(source = %source.display(), output = %plan.output.display(), converter, "converted to PDF");
                    return Ok(PdfReport {
                        source: source.display().to_string(),
                        output: plan.output.display().to_string(),
                        converter: (*converter).to_string(),
                    });
                }
                Err(reason) => {
                    warn!(converter, %reason, "PDF converter failed");
                    failures.push(format!("{converter}: {reason}"));
                }
            }
        }
        Err(ControlError::External(format!(
            "PDF conversion failed. Install LibreOffice to enable conversion. Attempts: {}",
            failures.join("; ")
        )))
    }
}

fn default_copy_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    source.with_file_name(format!("{stem}_copy.docx"))
}

pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push_str("...");
    truncated
}

fn push_block_text(container: &XmlElement, lines: &mut Vec<String>) {
    for child in container.elements() {
        match child.name.as_str() {
            "w:p" => lines.push(paragraph_text(child)),
            "w:tbl" => {
                for row in table_text_grid(child) {
                    lines.push(row.join(" | "));
                }
            }
            "w:sdt" => {
                if let Some(content) = child.child("w:sdtContent") {
                    push_block_text(content, lines);
                }
            }
            _ => {}
        }
    }
}

fn core_text(root: &XmlElement, local: &str) -> Option<String> {
    root.elements()
        .find(|child| child.local_name() == local)
        .map(XmlElement::text)
        .filter(|text| !text.is_empty())
}

/// Reads `docProps/core.xml`, located through the package relationships.
pub(crate) fn read_core_properties(package: &Package) -> Result<DocumentInfo, ControlError> {
    let part = core_properties_part(package)?;
    let Some(part) = part else {
        return Ok(DocumentInfo::default());
    };
    let core = package.xml_part(&part)?;
    let root = &core.root;
    Ok(DocumentInfo {
        title: core_text(root, "title"),
        subject: core_text(root, "subject"),
        author: core_text(root, "creator"),
        keywords: core_text(root, "keywords"),
        last_modified_by: core_text(root, "lastModifiedBy"),
        revision: core_text(root, "revision"),
        created: core_text(root, "created"),
        modified: core_text(root, "modified"),
        ..DocumentInfo::default()
    })
}

pub(crate) fn core_properties_part(package: &Package) -> Result<Option<String>, ControlError> {
    let rels = package.relationships("")?;
    let name = rels
        .find_by_type(REL_CORE_PROPS)
        .map_or_else(|| PART_CORE_PROPS.to_string(), |rel| resolve_target("", &rel.target));
    Ok(package.has_part(&name).then_some(name))
}

const RELATIONSHIP_ATTRS: &[&str] = &["r:id", "r:embed", "r:link", "r:pict", "r:href"];
const DROPPED_MARKERS: &[&str] = &[
    "w:footnoteReference",
    "w:endnoteReference",
    "w:commentRangeStart",
    "w:commentRangeEnd",
    "w:commentReference",
];

/// Appends the body of `source` to `target` before its final section
/// properties. Returns the number of relationships re-created in `target`.
fn append_document(
    target: &mut Document,
    source: &Document,
    page_break: bool,
) -> Result<usize, ControlError> {
    let mut blocks: Vec<XmlElement> = source
        .body()?
        .elements()
        .filter(|child| !child.is("w:sectPr"))
        .cloned()
        .collect();

    for block in &mut blocks {
        block.remove_descendants(&|element| DROPPED_MARKERS.contains(&element.name.as_str()));
    }

    let source_rels = source.main_relationships()?;
    let source_types = source.package().content_types()?;
    let mut target_rels = target.main_relationships()?;
    let mut target_types = target.package().content_types()?;
    let mut id_map: HashMap<String, String> = HashMap::new();

    for block in &mut blocks {
        let mut failure = None;
        block.walk_mut(&mut |element| {
            for (name, value) in &mut element.attributes {
                if !RELATIONSHIP_ATTRS.contains(&name.as_str()) {
                    continue;
                }
                if let Some(mapped) = id_map.get(value.as_str()) {
                    value.clone_from(mapped);
                    continue;
                }
                let Some(rel) = source_rels.get(value) else {
                    continue;
                };
                let new_id = if rel.external {
                    target_rels.add(&rel.rel_type, &rel.target, true)
                } else {
                    let part = resolve_target(source.main_part(), &rel.target);
                    let Some(bytes) = source.package().part(&part) else {
                        failure = Some(part);
                        continue;
                    };
                    let new_part = copied_part_name(target.package(), &part);
                    target.package_mut().set_part(&new_part, bytes.to_vec());
                    match source_types.content_type_of(&part) {
                        Some(ct) if !source_types.has_default(extension(&part)) => {
                            target_types.ensure_override(&new_part, ct);
                        }
                        Some(ct) => target_types.ensure_default(extension(&part), ct),
                        None => {}
                    }
                    let relative =
                        word_ooxml::rels::relative_target(target.main_part(), &new_part);
                    target_rels.add(&rel.rel_type, &relative, false)
                };
                id_map.insert(value.clone(), new_id.clone());
                *value = new_id;
            }
        });
        if let Some(part) = failure {
            warn!(part, "merge source references a missing part");
        }
    }

    copy_missing_styles(target, source, &blocks)?;

    let relinked = id_map.len();
    target.set_main_relationships(&target_rels);
    target.package_mut().set_content_types(&target_types);

    let body = target.body_mut()?;
    let mut insert_at = body.child_index("w:sectPr").unwrap_or(body.children.len());
    if page_break {
        body.insert(insert_at, page_break_paragraph());
        insert_at += 1;
    }
    for block in blocks {
        body.insert(insert_at, block);
        insert_at += 1;
    }
    Ok(relinked)
}

fn extension(part: &str) -> &str {
    part.rsplit_once('.').map_or("", |(_, ext)| ext)
}

fn copied_part_name(package: &Package, part: &str) -> String {
    let (stem, ext) = part.rsplit_once('.').unwrap_or((part, "bin"));
    let prefix = stem.trim_end_matches(|ch: char| ch.is_ascii_digit());
    package.next_part_name(prefix, ext)
}

fn copy_missing_styles(
    target: &mut Document,
    source: &Document,
    blocks: &[XmlElement],
) -> Result<(), ControlError> {
    let mut used = Vec::new();
    for block in blocks {
        for element in std::iter::once(block).chain(block.descendants()) {
            if matches!(element.name.as_str(), "w:pStyle" | "w:rStyle" | "w:tblStyle")
                && let Some(id) = element.attr("w:val")
                && !used.iter().any(|seen: &String| seen == id)
            {
                used.push(id.to_string());
            }
        }
    }
    if used.is_empty() {
        return Ok(());
    }
    let Some((_, source_styles)) = source.load_related(word_ooxml::schema::REL_STYLES)? else {
        return Ok(());
    };
    let (part, mut target_styles): (String, XmlDocument) = styles_part(target)?;
    let mut changed = false;
    for id in used {
        if find_style(&target_styles.root, &id).is_none()
            && let Some(definition) = find_style(&source_styles.root, &id)
        {
            target_styles.root.push(definition.clone());
            changed = true;
        }
    }
    if changed {
        target.set_part_xml(&part, &target_styles);
    }
    Ok(())
}

/// Paths used by one PDF conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPlan {
    pub source: PathBuf,
    pub out_dir: PathBuf,
    /// Where LibreOffice writes the file: `<out_dir>/<source stem>.pdf`.
    pub produced: PathBuf,
    pub output: PathBuf,
}

impl PdfPlan {
    #[must_use]
    pub fn new(source: &Path, output: Option<PathBuf>) -> Self {
        let output = output.map_or_else(
            || source.with_extension("pdf"),
            |path| {
                let is_pdf = path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
                if is_pdf {
                    path
                } else {
                    let mut name = path.into_os_string();
                    name.push(".pdf");
                    PathBuf::from(name)
                }
            },
        );
        let out_dir = output
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let stem = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        let produced = out_dir.join(format!("{stem}.pdf"));
        Self {
            source: source.to_path_buf(),
            out_dir,
            produced,
            output,
        }
    }

    #[must_use]
    pub fn converter_args(&self) -> Vec<String> {
        vec![
            "--headless".to_string(),
            "--convert-to".to_string(),
            "pdf".to_string(),
            "--outdir".to_string(),
            self.out_dir.display().to_string(),
            self.source.display().to_string(),
        ]
    }
}

async fn run_converter(
    converter: &str,
    plan: &PdfPlan,
    timeout: std::time::Duration,
) -> Result<(), String> {
    let mut command = tokio::process::Command::new(converter);
    command.args(plan.converter_args()).kill_on_drop(true);
    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| format!("timed out after {}s", timeout.as_secs()))?
        .map_err(|err| err.to_string())?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(format!("exited with {}: {stderr}", output.status));
    }
    if tokio::fs::metadata(&plan.produced).await.is_err() {
        return Err(format!("no output at {}", plan.produced.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_plan_appends_extension_and_targets_output_dir() {
        let plan = PdfPlan::new(
            Path::new("/docs/report.docx"),
            Some(PathBuf::from("/out/final")),
        );
        assert_eq!(plan.output, PathBuf::from("/out/final.pdf"));
        assert_eq!(plan.out_dir, PathBuf::from("/out"));
        assert_eq!(plan.produced, PathBuf::from("/out/report.pdf"));
        assert_eq!(
            plan.converter_args(),
            vec!["--headless", "--convert-to", "pdf", "--outdir", "/out", "/docs/report.docx"]
        );
    }

    #[test]
    fn pdf_plan_defaults_beside_source() {
        let plan = PdfPlan::new(Path::new("/docs/report.docx"), None);
        assert_eq!(plan.output, PathBuf::from("/docs/report.pdf"));
        assert_eq!(plan.produced, plan.output);
    }

    #[test]
    fn copy_path_defaults_to_stem_copy() {
        assert_eq!(
            default_copy_path(Path::new("/a/b/plan.docx")),
            PathBuf::from("/a/b/plan_copy.docx")
        );
    }

    #[test]
    fn truncation_counts_chars() {
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("héllo", 2), "hé...");
    }

    #[test]
    fn copied_part_names_do_not_collide() {
        let mut package = Package::new_blank("", "");
        package.set_part("word/media/image1.png", vec![1]);
        assert_eq!(
            copied_part_name(&package, "word/media/image1.png"),
            "word/media/image2.png"
        );
    }
}
