//! PDF text extraction.
//!
//! Two backends: lopdf walks the page tree and extracts each page on its own;
//! pdf-extract renders the whole document and pages are recovered from form feeds.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use lopdf::Document;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfLoader {
    Lopdf,
    PdfExtract,
}

impl PdfLoader {
    pub fn name(self) -> &'static str {
        match self {
            Self::Lopdf => "lopdf",
            Self::PdfExtract => "pdf-extract",
        }
    }

    /// Extract every page of `path`. Pages without text come back with an empty
    /// `text`; the chunker skips them.
    pub fn load(self, path: &Path) -> Result<Vec<Page>> {
        if !path.is_file() {
            return Err(Error::Ingestion(format!("PDF not found: {}", path.display())));
        }
        debug!(loader = self.name(), path = %path.display(), "loading PDF");

        let pages = match self {
            Self::Lopdf => load_with_lopdf(path)?,
            Self::PdfExtract => load_with_pdf_extract(path)?,
        };

        if pages.iter().all(|p| p.text.trim().is_empty()) {
            warn!(path = %path.display(), "PDF contains no extractable text");
        }
        Ok(pages)
    }
}

impl fmt::Display for PdfLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PdfLoader {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lopdf" | "pypdf" => Ok(Self::Lopdf),
            "pdf-extract" | "pdf_extract" | "pymupdf" | "pdfplumber" => Ok(Self::PdfExtract),
            other => Err(Error::UnsupportedLoader(other.to_string())),
        }
    }
}

fn load_with_lopdf(path: &Path) -> Result<Vec<Page>> {
    let doc = Document::load(path).map_err(|e| Error::Ingestion(format!("{}: {e}", path.display())))?;

    let mut pages = Vec::new();
    for number in doc.get_pages().into_keys() {
        let text = match doc.extract_text(&[number]) {
            Ok(text) => text,
            Err(e) => {
                debug!("no text on page {}: {}", number, e);
                String::new()
            }
        };
        pages.push(Page { number, text });
    }
    Ok(pages)
}

fn load_with_pdf_extract(path: &Path) -> Result<Vec<Page>> {
    let text = pdf_extract::extract_text(path).map_err(|e| Error::Ingestion(format!("{}: {e}", path.display())))?;
    Ok(split_pages(&text))
}

/// Split rendered document text on form feeds; text with none is a single page.
fn split_pages(text: &str) -> Vec<Page> {
    text.split('\x0C')
        .zip(1u32..)
        .map(|(text, number)| Page { number, text: text.to_string() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_names_and_aliases_parse() {
        assert_eq!("lopdf".parse::<PdfLoader>().unwrap(), PdfLoader::Lopdf);
        assert_eq!("PyPDF".parse::<PdfLoader>().unwrap(), PdfLoader::Lopdf);
        assert_eq!("pdf-extract".parse::<PdfLoader>().unwrap(), PdfLoader::PdfExtract);
        assert_eq!("pymupdf".parse::<PdfLoader>().unwrap(), PdfLoader::PdfExtract);
        assert_eq!("pdfplumber".parse::<PdfLoader>().unwrap(), PdfLoader::PdfExtract);
    }

    #[test]
    fn unknown_loader_is_rejected() {
        let err = "docx".parse::<PdfLoader>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedLoader(ref name) if name == "docx"));
    }

    #[test]
    fn form_feeds_delimit_pages() {
        let pages = split_pages("first\x0Csecond\x0C");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], Page { number: 1, text: "first".into() });
        assert_eq!(pages[1].number, 2);
        assert!(pages[2].text.is_empty());
        assert_eq!(split_pages("only").len(), 1);
    }

    #[test]
    fn missing_file_is_an_ingestion_error() {
        let err = PdfLoader::Lopdf.load(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, Error::Ingestion(_)));
    }
}
