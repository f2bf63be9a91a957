use thiserror::Error;
use tracing::debug;

const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("not a PDF file")]
    NotPdf,
    #[error("PDF extraction error: {0}")]
    Extraction(#[from] pdf_extract::OutputError),
}

/// Content sniff: a real PDF starts with the `%PDF-` marker.
pub fn is_pdf(head: &[u8]) -> bool {
    head.starts_with(b"%PDF-")
}

/// Extracts plain text from PDF bytes held fully in memory.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    if !is_pdf(bytes) {
        return Err(ExtractError::NotPdf);
    }

    let text = pdf_extract::extract_text_from_mem(bytes)?;
    debug!("Extracted {} chars of text from PDF", text.len());

    Ok(text)
}

/// First 500 characters of the extracted text, with an ellipsis when the
/// text continues. Cuts on char boundaries.
pub fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf_magic_bytes() {
        assert!(is_pdf(b"%PDF-1.7\n..."));
        assert!(!is_pdf(b"\x89PNG\r\n"));
        assert!(!is_pdf(b""));
    }

    #[test]
    fn test_extract_rejects_non_pdf_bytes() {
        let result = extract_text(b"plain text, not a pdf");
        assert!(matches!(result, Err(ExtractError::NotPdf)));
    }

    #[test]
    fn test_extract_rejects_corrupted_pdf() {
        // Valid magic bytes but garbage structure.
        let result = extract_text(b"%PDF-1.4 garbage that is not a document");
        assert!(matches!(result, Err(ExtractError::Extraction(_))));
    }

    #[test]
    fn test_preview_short_text_unchanged() {
        assert_eq!(preview("short text"), "short text");
    }

    #[test]
    fn test_preview_long_text_gets_ellipsis() {
        let long_text = "a".repeat(600);
        let result = preview(&long_text);

        assert_eq!(result.len(), 503);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_preview_exact_length_no_ellipsis() {
        let text = "b".repeat(500);
        assert_eq!(preview(&text), text);
    }

    #[test]
    fn test_preview_multibyte_text() {
        let text = "é".repeat(600);
        let result = preview(&text);

        assert_eq!(result.chars().count(), 503);
        assert!(result.ends_with("..."));
    }
}
