//! Fixed-size character windows with overlap.
//!
//! Window `i` of a page covers chars `[i * step, i * step + size)` where
//! `step = size - overlap`; the last window ends at the page end.

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::types::{Chunk, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 || overlap >= size {
            return Err(Error::InvalidChunking { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    /// Windows over `text`, measured in chars. Blank text yields nothing.
    pub fn windows<'a>(&self, text: &'a str) -> Windows<'a> {
        let boundaries = if text.trim().is_empty() {
            Vec::new()
        } else {
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect()
        };
        Windows { text, boundaries, start: 0, size: self.size, step: self.size - self.overlap, done: false }
    }

    /// Chunk every page of `source` in order. `chunk_index` runs across the whole
    /// document, so identical input always yields identical chunks.
    pub fn chunk_pages<'a>(&self, source: &'a str, pages: &'a [Page]) -> impl Iterator<Item = Chunk> + 'a {
        let chunker = *self;
        pages
            .iter()
            .flat_map(move |page| chunker.windows(&page.text).map(move |text| (page.number, text)))
            .enumerate()
            .map(move |(index, (page, text))| Chunk::new(source, page, index, text))
    }
}

/// Iterator returned by [`Chunker::windows`].
pub struct Windows<'a> {
    text: &'a str,
    // byte offset of every char start plus the end of the text
    boundaries: Vec<usize>,
    start: usize,
    size: usize,
    step: usize,
    done: bool,
}

impl<'a> Iterator for Windows<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.boundaries.is_empty() {
            return None;
        }
        let chars = self.boundaries.len() - 1;
        let end = (self.start + self.size).min(chars);
        let window = &self.text[self.boundaries[self.start]..self.boundaries[end]];
        if end == chars {
            self.done = true;
        } else {
            self.start += self.step;
        }
        Some(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: u32, text: &str) -> Page {
        Page { number, text: text.to_string() }
    }

    #[test]
    fn rejects_overlap_not_below_size() {
        assert!(matches!(Chunker::new(100, 100), Err(Error::InvalidChunking { size: 100, overlap: 100 })));
        assert!(Chunker::new(100, 150).is_err());
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(100, 99).is_ok());
    }

    #[test]
    fn windows_step_by_size_minus_overlap() {
        let text = "x".repeat(1000);
        let chunker = Chunker::new(500, 50).unwrap();
        let lens: Vec<usize> = chunker.windows(&text).map(str::len).collect();
        assert_eq!(lens, vec![500, 500, 100]);
    }

    #[test]
    fn consecutive_windows_share_overlap() {
        let text: String = (0..300).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunker = Chunker::new(100, 20).unwrap();
        let windows: Vec<&str> = chunker.windows(&text).collect();
        for pair in windows.windows(2) {
            assert_eq!(&pair[0][80..], &pair[1][..20]);
        }
    }

    #[test]
    fn two_long_pages_give_three_chunks_each() {
        let pages = vec![page(1, &"a".repeat(1000)), page(2, &"b".repeat(1000))];
        let chunker = Chunker::new(500, 50).unwrap();
        let chunks: Vec<Chunk> = chunker.chunk_pages("doc.pdf", &pages).collect();
        assert_eq!(chunks.len(), 6);
        assert_eq!(chunks.iter().filter(|c| c.page == 1).count(), 3);
        assert_eq!(chunks[3].page, 2);
        assert_eq!(chunks[3].chunk_index, 3);
        assert_eq!(chunks[5].id, "doc.pdf:5");
        assert!(chunks.iter().all(|c| c.source == "doc.pdf"));
    }

    #[test]
    fn short_page_is_one_chunk_and_blank_page_is_none() {
        let pages = vec![page(1, "Payment terms: net 30."), page(2, "   \n "), page(3, "")];
        let chunks: Vec<Chunk> = Chunker::new(1024, 100).unwrap().chunk_pages("c.pdf", &pages).collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Payment terms: net 30.");
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "é".repeat(15);
        let windows: Vec<&str> = Chunker::new(10, 2).unwrap().windows(&text).collect();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].chars().count(), 10);
        assert_eq!(windows[1].chars().count(), 7);
    }

    #[test]
    fn chunking_is_deterministic() {
        let pages = vec![page(1, &"lorem ipsum ".repeat(200))];
        let chunker = Chunker::new(256, 32).unwrap();
        let a: Vec<Chunk> = chunker.chunk_pages("x.pdf", &pages).collect();
        let b: Vec<Chunk> = chunker.chunk_pages("x.pdf", &pages).collect();
        assert_eq!(a, b);
    }
}
