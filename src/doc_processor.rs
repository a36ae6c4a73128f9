use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::ocr::{OcrEngine, OcrError};

const MIME_PDF: &str = "application/pdf";
const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const MIME_OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("The following files are invalid: {}", names.join(", "))]
    InvalidFileType { names: Vec<String> },
    #[error("No documents were uploaded.")]
    EmptyBatch,
    /// A file that never went through validation; the caller is misconfigured.
    #[error("unsupported file type reached extraction: {name}")]
    Unsupported { name: String },
    #[error("PDF parse error: {0}")]
    Pdf(String),
    #[error("DOCX parse error: {0}")]
    Docx(String),
    #[error("file is not valid UTF-8 text: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),
}

/// The upload formats the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
    Markdown,
    Jpeg,
    Png,
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Text),
            "md" => Some(Self::Markdown),
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            MIME_PDF => Some(Self::Pdf),
            MIME_DOCX => Some(Self::Docx),
            "text/plain" => Some(Self::Text),
            "text/markdown" | "text/x-markdown" => Some(Self::Markdown),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Resolve the kind of an upload. A declared MIME type wins; the file name
    /// suffix is only consulted when the MIME type is missing or generic.
    pub fn detect(name: &str, mime: &str) -> Option<Self> {
        let mime = mime.trim();
        if !mime.is_empty() && !mime.eq_ignore_ascii_case(MIME_OCTET_STREAM) {
            return Self::from_mime(mime);
        }
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Pdf => MIME_PDF,
            Self::Docx => MIME_DOCX,
            Self::Text => "text/plain",
            Self::Markdown => "text/markdown",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// A file handed over by the UI. Lives only for one processing action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub name: String,
    #[serde(default)]
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, declaring its MIME type from the suffix.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let mime = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(DocumentKind::from_extension)
            .map(|k| k.mime())
            .unwrap_or(MIME_OCTET_STREAM);
        let bytes = fs::read(path)?;
        Ok(Self::new(name, mime, bytes))
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        DocumentKind::detect(&self.name, &self.mime)
    }
}

/// Text pulled out of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedDocument {
    pub name: String,
    pub text: String,
}

/// Text of the most recently processed batch, kept in session memory only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedText {
    pub documents: Vec<ExtractedDocument>,
}

impl ExtractedText {
    pub fn is_empty(&self) -> bool {
        self.documents.iter().all(|d| d.text.trim().is_empty())
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }

    /// All document texts in upload order, separated by a blank line.
    pub fn combined(&self) -> String {
        self.documents
            .iter()
            .map(|d| d.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A document left out of a batch because its text could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDocument {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct BatchExtraction {
    pub extracted: ExtractedText,
    pub failed: Vec<FailedDocument>,
}

pub fn validate(doc: &UploadedDocument) -> bool {
    doc.kind().is_some()
}

/// Accept the batch only if it is non-empty and every file is supported.
pub fn validate_batch(docs: &[UploadedDocument]) -> Result<(), ExtractError> {
    if docs.is_empty() {
        return Err(ExtractError::EmptyBatch);
    }
    let names: Vec<String> = docs
        .iter()
        .filter(|d| !validate(d))
        .map(|d| d.name.clone())
        .collect();
    if names.is_empty() {
        Ok(())
    } else {
        tracing::warn!(?names, "rejecting upload batch");
        Err(ExtractError::InvalidFileType { names })
    }
}

/// Parse one uploaded document into plain text.
pub async fn extract(doc: &UploadedDocument, ocr: &impl OcrEngine) -> Result<String, ExtractError> {
    let kind = doc.kind().ok_or_else(|| ExtractError::Unsupported {
        name: doc.name.clone(),
    })?;

    match kind {
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(&doc.bytes)
            .map_err(|e| ExtractError::Pdf(e.to_string())),
        DocumentKind::Docx => docx_text(&doc.bytes),
        DocumentKind::Text | DocumentKind::Markdown => Ok(String::from_utf8(doc.bytes.clone())?),
        DocumentKind::Jpeg | DocumentKind::Png => Ok(ocr.recognize(&doc.bytes).await?),
    }
}

/// Validate a batch, then extract every document in it. Documents whose
/// extraction fails or yields no text are reported and left out of the result.
pub async fn extract_all(
    docs: &[UploadedDocument],
    ocr: &impl OcrEngine,
) -> Result<BatchExtraction, ExtractError> {
    validate_batch(docs)?;

    let mut batch = BatchExtraction::default();
    for doc in docs {
        match extract(doc, ocr).await {
            Ok(text) if text.trim().is_empty() => {
                tracing::warn!(name = %doc.name, "document has no text");
                batch.failed.push(FailedDocument {
                    name: doc.name.clone(),
                    reason: "no text found".into(),
                });
            }
            Ok(text) => {
                tracing::info!(name = %doc.name, chars = text.len(), "document extracted");
                batch.extracted.documents.push(ExtractedDocument {
                    name: doc.name.clone(),
                    text,
                });
            }
            Err(e @ ExtractError::Unsupported { .. }) => return Err(e),
            Err(e) => {
                tracing::warn!(name = %doc.name, error = %e, "document extraction failed");
                batch.failed.push(FailedDocument {
                    name: doc.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(batch)
}

fn docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    use docx_rs::DocumentChild;

    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            let mut line = String::new();
            push_paragraph_text(&paragraph.children, &mut line);
            paragraphs.push(line);
        }
    }
    Ok(paragraphs.join("\n"))
}

/// Text of runs directly in the paragraph, inside hyperlinks and inside
/// tracked insertions, in document order.
fn push_paragraph_text(children: &[docx_rs::ParagraphChild], out: &mut String) {
    use docx_rs::{InsertChild, ParagraphChild};

    for item in children {
        match item {
            ParagraphChild::Run(run) => push_run_text(run, out),
            ParagraphChild::Hyperlink(link) => push_paragraph_text(&link.children, out),
            ParagraphChild::Insert(insert) => {
                for child in &insert.children {
                    if let InsertChild::Run(run) = child {
                        push_run_text(run, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_run_text(run: &docx_rs::Run, out: &mut String) {
    use docx_rs::RunChild;

    for child in &run.children {
        match child {
            RunChild::Text(t) => out.push_str(&t.text),
            RunChild::Tab(_) => out.push('\t'),
            RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{BreakType, Docx, Hyperlink, HyperlinkType, Paragraph, Run};
    use std::io::Cursor;

    struct FakeOcr(Result<&'static str, ()>);

    impl OcrEngine for FakeOcr {
        async fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
            self.0.map(str::to_string).map_err(|_| OcrError::Failed {
                status: "exit status: 1".into(),
                stderr: "Error in pixReadMem".into(),
            })
        }
    }

    fn text_doc(name: &str, body: &str) -> UploadedDocument {
        UploadedDocument::new(name, "text/plain", body.as_bytes().to_vec())
    }

    fn pack(docx: Docx) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        docx.build().pack(&mut buf).unwrap();
        buf.into_inner()
    }

    fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
        let mut docx = Docx::new();
        for p in paragraphs {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*p)));
        }
        pack(docx)
    }

    /// Minimal PDF with one Helvetica text line per page.
    fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
        let page_ids: Vec<usize> = (0..pages.len()).map(|i| 4 + 2 * i).collect();
        let kids = page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");

        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, pages.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];
        for (page, id) in pages.iter().zip(&page_ids) {
            let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", page);
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                id + 1
            ));
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                content.len(),
                content
            ));
        }

        let mut out = String::from("%PDF-1.4\n");
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
        }
        let xref = out.len();
        out.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
        for offset in offsets {
            out.push_str(&format!("{:010} 00000 n \n", offset));
        }
        out.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        ));
        out.into_bytes()
    }

    #[test]
    fn test_detect_accepts_exactly_the_supported_suffixes() {
        for name in ["a.pdf", "b.docx", "c.txt", "d.md", "e.jpeg", "f.jpg", "g.PNG"] {
            assert!(DocumentKind::detect(name, "").is_some(), "{name}");
        }
        for name in ["a.gif", "b.doc", "c.exe", "d.markdown", "noext"] {
            assert!(DocumentKind::detect(name, "").is_none(), "{name}");
        }
    }

    #[test]
    fn test_declared_mime_wins_over_suffix() {
        assert_eq!(
            DocumentKind::detect("scan.pdf", "image/png"),
            Some(DocumentKind::Png)
        );
        assert_eq!(DocumentKind::detect("notes.txt", "image/gif"), None);
        assert_eq!(
            DocumentKind::detect("notes.md", "application/octet-stream"),
            Some(DocumentKind::Markdown)
        );
        assert_eq!(
            DocumentKind::detect("x", "text/plain; charset=utf-8"),
            Some(DocumentKind::Text)
        );
    }

    #[test]
    fn test_batch_with_invalid_file_is_rejected_whole() {
        let docs = vec![
            text_doc("ok.txt", "fine"),
            UploadedDocument::new("cat.gif", "image/gif", vec![0x47, 0x49, 0x46]),
            UploadedDocument::new("run.exe", "", vec![0x4d, 0x5a]),
        ];
        let err = validate_batch(&docs).unwrap_err();
        match &err {
            ExtractError::InvalidFileType { names } => {
                assert_eq!(names, &vec!["cat.gif".to_string(), "run.exe".to_string()])
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "The following files are invalid: cat.gif, run.exe"
        );
    }

    #[tokio::test]
    async fn test_extract_all_extracts_nothing_from_rejected_batch() {
        let docs = vec![
            text_doc("ok.txt", "fine"),
            UploadedDocument::new("bad.gif", "image/gif", Vec::new()),
        ];
        let result = extract_all(&docs, &FakeOcr(Ok("unused"))).await;
        assert!(matches!(result, Err(ExtractError::InvalidFileType { .. })));
    }

    #[tokio::test]
    async fn test_plain_text_and_markdown_decode_verbatim() {
        let ocr = FakeOcr(Ok("unused"));
        let txt = text_doc("a.txt", "line one\nline two  \n");
        assert_eq!(extract(&txt, &ocr).await.unwrap(), "line one\nline two  \n");

        let md = UploadedDocument::new("b.md", "", b"# Title\n\n- item".to_vec());
        assert_eq!(extract(&md, &ocr).await.unwrap(), "# Title\n\n- item");
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_decode_error() {
        let doc = UploadedDocument::new("a.txt", "text/plain", vec![0xff, 0xfe, 0x00]);
        let err = extract(&doc, &FakeOcr(Ok(""))).await.unwrap_err();
        assert!(matches!(err, ExtractError::Decode(_)));
    }

    #[tokio::test]
    async fn test_docx_paragraphs_are_newline_separated_in_order() {
        let doc = UploadedDocument::new(
            "memo.docx",
            "",
            docx_bytes(&["First paragraph.", "Second one.", "Third."]),
        );
        let ocr = FakeOcr(Ok(""));
        let text = extract(&doc, &ocr).await.unwrap();
        assert_eq!(text, "First paragraph.\nSecond one.\nThird.");
        assert_eq!(extract(&doc, &ocr).await.unwrap(), text);
    }

    #[tokio::test]
    async fn test_docx_keeps_hyperlink_text_and_line_breaks() {
        let link = Hyperlink::new("https://example.com/contract", HyperlinkType::External)
            .add_run(Run::new().add_text("the contract"));
        let docx = Docx::new()
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text("See "))
                    .add_hyperlink(link)
                    .add_run(Run::new().add_text(" for details.")),
            )
            .add_paragraph(
                Paragraph::new().add_run(
                    Run::new()
                        .add_text("line one")
                        .add_break(BreakType::TextWrapping)
                        .add_text("line two"),
                ),
            );
        let doc = UploadedDocument::new("links.docx", "", pack(docx));

        let text = extract(&doc, &FakeOcr(Ok(""))).await.unwrap();

        assert_eq!(text, "See the contract for details.\nline one\nline two");
    }

    #[tokio::test]
    async fn test_pdf_pages_extract_in_order() {
        let doc = UploadedDocument::new(
            "report.pdf",
            "application/pdf",
            pdf_bytes(&["Quarterly revenue grew", "Costs stayed flat"]),
        );
        let ocr = FakeOcr(Ok(""));

        let text = extract(&doc, &ocr).await.unwrap();

        let first = text.find("Quarterly revenue grew").expect("first page text");
        let second = text.find("Costs stayed flat").expect("second page text");
        assert!(first < second);
        assert_eq!(extract(&doc, &ocr).await.unwrap(), text);
    }

    #[tokio::test]
    async fn test_blank_extraction_is_reported_as_failure() {
        let docs = vec![
            UploadedDocument::new("blank.png", "image/png", vec![0x89]),
            text_doc("empty.txt", ""),
        ];
        let batch = extract_all(&docs, &FakeOcr(Ok("  \n"))).await.unwrap();

        assert!(batch.extracted.documents.is_empty());
        assert_eq!(
            batch.failed,
            vec![
                FailedDocument {
                    name: "blank.png".into(),
                    reason: "no text found".into()
                },
                FailedDocument {
                    name: "empty.txt".into(),
                    reason: "no text found".into()
                },
            ]
        );
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let err = validate_batch(&[]).unwrap_err();
        assert!(matches!(err, ExtractError::EmptyBatch));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_and_docx_are_errors() {
        let ocr = FakeOcr(Ok(""));
        let pdf = UploadedDocument::new("x.pdf", "application/pdf", b"not a pdf".to_vec());
        assert!(matches!(
            extract(&pdf, &ocr).await.unwrap_err(),
            ExtractError::Pdf(_)
        ));
        let docx = UploadedDocument::new("x.docx", "", b"not a zip".to_vec());
        assert!(matches!(
            extract(&docx, &ocr).await.unwrap_err(),
            ExtractError::Docx(_)
        ));
    }

    #[tokio::test]
    async fn test_image_goes_through_ocr() {
        let doc = UploadedDocument::new("scan.png", "image/png", vec![0x89, 0x50]);
        let text = extract(&doc, &FakeOcr(Ok("Invoice total: 42"))).await.unwrap();
        assert_eq!(text, "Invoice total: 42");
    }

    #[tokio::test]
    async fn test_ocr_failure_excludes_document_from_batch() {
        let docs = vec![
            text_doc("notes.txt", "Meeting at noon."),
            UploadedDocument::new("scan.jpg", "image/jpeg", vec![0xff, 0xd8]),
        ];
        let batch = extract_all(&docs, &FakeOcr(Err(()))).await.unwrap();

        assert_eq!(batch.extracted.documents.len(), 1);
        assert_eq!(batch.extracted.combined(), "Meeting at noon.");
        assert_eq!(batch.failed.len(), 1);
        assert_eq!(batch.failed[0].name, "scan.jpg");
        assert!(batch.failed[0].reason.starts_with("OCR failed"));
    }

    #[tokio::test]
    async fn test_unvalidated_file_is_fatal() {
        let doc = UploadedDocument::new("a.gif", "image/gif", Vec::new());
        let err = extract(&doc, &FakeOcr(Ok(""))).await.unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported { .. }));
    }

    #[test]
    fn test_extracted_text_emptiness() {
        let mut text = ExtractedText::default();
        assert!(text.is_empty());
        text.documents.push(ExtractedDocument {
            name: "blank.txt".into(),
            text: "  \n".into(),
        });
        assert!(text.is_empty());
        text.documents.push(ExtractedDocument {
            name: "a.txt".into(),
            text: "Alpha".into(),
        });
        text.documents.push(ExtractedDocument {
            name: "b.txt".into(),
            text: "Beta\n".into(),
        });
        assert!(!text.is_empty());
        assert_eq!(text.combined(), "Alpha\n\nBeta");
        text.clear();
        assert!(text.is_empty());
    }

    #[test]
    fn test_from_path_declares_mime_from_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        fs::write(&path, "# Report").unwrap();
        let doc = UploadedDocument::from_path(&path).unwrap();
        assert_eq!(doc.name, "report.md");
        assert_eq!(doc.mime, "text/markdown");
        assert_eq!(doc.kind(), Some(DocumentKind::Markdown));
    }
}
