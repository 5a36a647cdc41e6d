use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Best-effort extraction of page text from PDF bytes.
///
/// Layout fidelity is not guaranteed, and an empty string is a valid result
/// for image-only documents. Errors only when the bytes are not a readable
/// PDF at all.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .context("failed to read PDF content")?;

    if text.trim().is_empty() {
        warn!("PDF contained no extractable text");
    }
    debug!(extracted_chars = text.len(), "Extracted text from PDF");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_rejects_non_pdf_bytes() {
        assert!(extract_text(b"this is not a pdf").is_err());
    }
}
