//! PDF text extraction.
//!
//! Advisories arrive as PDFs; this module turns one into the plain UTF-8
//! text the rest of the pipeline operates on. The PDF parser itself is
//! opaque to the pipeline.

use std::path::Path;

use anyhow::{anyhow, Result};

/// Extract the text of a PDF file.
pub fn extract_text(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path)
        .map_err(|e| anyhow!("failed to extract text from {}: {}", path.display(), e))
}
