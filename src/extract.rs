//! Text extraction for uploaded files.
//!
//! Supported extensions: `.txt` (UTF-8) and `.pdf` (via lopdf, page by page).
//! Anything else, and any corrupt input, is an [`AppError::Extraction`] —
//! the upload boundary catches it and degrades to a rejected upload.

use tracing::warn;

use crate::error::AppError;

/// Extract plain text from `bytes` according to `file_name`'s extension.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, AppError> {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".txt") {
        extract_txt(file_name, bytes)
    } else if lower.ends_with(".pdf") {
        extract_pdf(file_name, bytes)
    } else {
        Err(AppError::Extraction(format!(
            "unsupported file type: {file_name} (expected .pdf or .txt)"
        )))
    }
}

fn extract_txt(file_name: &str, bytes: &[u8]) -> Result<String, AppError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| AppError::Extraction(format!("{file_name} is not valid UTF-8: {e}")))?;
    Ok(text.to_string())
}

/// Extract text from every page, skipping pages whose content cannot be
/// decoded. A document that fails to parse at all is an extraction error.
fn extract_pdf(file_name: &str, bytes: &[u8]) -> Result<String, AppError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| AppError::Extraction(format!("cannot parse {file_name}: {e}")))?;

    let mut text = String::new();
    for (page_no, _) in doc.get_pages() {
        match doc.extract_text(&[page_no]) {
            Ok(page_text) if !page_text.trim().is_empty() => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Ok(_) => {}
            Err(e) => {
                warn!(file = %file_name, page = page_no, error = %e, "pdf page extraction failed, skipping");
            }
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    /// Build a minimal single-page PDF containing `text`.
    fn pdf_bytes(text: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save pdf");
        bytes
    }

    #[test]
    fn txt_roundtrips() {
        let text = extract_text("notes.txt", "plain audit notes".as_bytes()).expect("extract");
        assert_eq!(text, "plain audit notes");
    }

    #[test]
    fn txt_rejects_invalid_utf8() {
        let err = extract_text("bad.txt", &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = extract_text("sheet.xlsx", b"whatever").unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let text = extract_text("NOTES.TXT", b"upper case name").expect("extract");
        assert_eq!(text, "upper case name");
    }

    #[test]
    fn pdf_text_is_extracted() {
        let bytes = pdf_bytes("Compliance summary for Q3");
        let text = extract_text("report.pdf", &bytes).expect("extract");
        assert!(text.contains("Compliance summary for Q3"));
    }

    #[test]
    fn corrupt_pdf_is_rejected() {
        let err = extract_text("broken.pdf", b"%PDF-not really").unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }
}
