//! Upload validation and text extraction for `.txt` and `.pdf` files.
//!
//! Transcriptions arrive as plain text (UTF-8, or Latin-1 from older
//! dictation apps); receipts arrive as PDFs. This module turns either into
//! a `String` for the extraction collaborator.

use larder_core::models::ItemSource;
use larder_core::providers::ExtractionKind;

use crate::error::{ServiceError, ServiceResult};

/// Kind of an accepted upload, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// `.txt` voice-memo transcription.
    Transcription,
    /// `.pdf` shopping receipt.
    Receipt,
}

impl UploadKind {
    /// Accepts `txt` and `pdf`, case-insensitively.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(UploadKind::Transcription),
            "pdf" => Some(UploadKind::Receipt),
            _ => None,
        }
    }

    pub fn extraction_kind(&self) -> ExtractionKind {
        match self {
            UploadKind::Transcription => ExtractionKind::Transcription,
            UploadKind::Receipt => ExtractionKind::Receipt,
        }
    }

    pub fn item_source(&self) -> ItemSource {
        match self {
            UploadKind::Transcription => ItemSource::Transcription,
            UploadKind::Receipt => ItemSource::Receipt,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UploadKind::Transcription => "transcription",
            UploadKind::Receipt => "receipt",
        }
    }
}

/// Check name, extension and size of an upload before anything is read.
pub fn validate_upload(filename: &str, size: usize, max_bytes: usize) -> ServiceResult<UploadKind> {
    if filename.trim().is_empty() {
        return Err(ServiceError::validation("No file selected"));
    }
    let kind = UploadKind::from_filename(filename).ok_or_else(|| {
        ServiceError::validation("Invalid file type. Only .txt and .pdf files are allowed")
    })?;
    if size > max_bytes {
        return Err(ServiceError::TooLarge { limit: max_bytes });
    }
    Ok(kind)
}

#[derive(Debug)]
pub enum ExtractError {
    Pdf(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract plain text from an upload of the given kind.
pub fn extract_text(bytes: &[u8], kind: UploadKind) -> Result<String, ExtractError> {
    match kind {
        UploadKind::Transcription => Ok(decode_text(bytes)),
        UploadKind::Receipt => extract_pdf(bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// UTF-8 with a Latin-1 fallback. Latin-1 maps every byte to the code
/// point of the same value, so decoding cannot fail.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.trim_start_matches('\u{feff}').to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert_eq!(UploadKind::from_filename("memo.TXT"), Some(UploadKind::Transcription));
        assert_eq!(UploadKind::from_filename("receipt.Pdf"), Some(UploadKind::Receipt));
        assert_eq!(UploadKind::from_filename("photo.jpg"), None);
        assert_eq!(UploadKind::from_filename("noext"), None);
    }

    #[test]
    fn validation_rejects_before_reading() {
        assert!(matches!(
            validate_upload("", 10, 100),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            validate_upload("list.docx", 10, 100),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            validate_upload("list.txt", 101, 100),
            Err(ServiceError::TooLarge { limit: 100 })
        ));
        assert_eq!(validate_upload("list.txt", 100, 100).unwrap(), UploadKind::Transcription);
    }

    #[test]
    fn text_falls_back_to_latin1() {
        let latin1 = b"cr\xe8me fra\xeeche";
        let text = extract_text(latin1, UploadKind::Transcription).unwrap();
        assert_eq!(text, "crème fraîche");
    }

    #[test]
    fn utf8_bom_is_dropped() {
        let text = extract_text("\u{feff}milk".as_bytes(), UploadKind::Transcription).unwrap();
        assert_eq!(text, "milk");
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf", UploadKind::Receipt).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }
}
