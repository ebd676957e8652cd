//! Text and JSON renderings of command results.
//!
//! Text goes to stdout in the layout people read; JSON is one pretty-printed
//! document per command for scripting.

use std::fmt::Write as _;
use std::path::Path;

use clap::ValueEnum;
use serde::Serialize;

use contracts_core::CollectionStats;
use contracts_rag::{CollectionInfo, IngestReport, RagAnswer, Retrieved};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn ingest_text(report: &IngestReport) -> String {
    format!(
        "Ingestion complete: collection '{}' holds {} chunks from {} ({} pages).",
        report.collection, report.chunks, report.source, report.pages
    )
}

pub fn collections_text(persist_dir: &Path, collections: &[CollectionStats]) -> String {
    if collections.is_empty() {
        return format!("No collections found in: {}", persist_dir.display());
    }
    let mut out = String::from("Collections:");
    for c in collections {
        let _ = write!(out, "\n- {}\n  Items: {}", c.name, c.count);
        if !c.sample_sources.is_empty() {
            let _ = write!(out, "\n  Sample sources: {}", c.sample_sources.join(", "));
        }
    }
    out
}

pub fn info_text(info: &CollectionInfo) -> String {
    let model = info.stats.model.as_deref().unwrap_or("unknown");
    format!(
        "Collection: {}\nNumber of chunks: {}\nVector dimension: {}\nDatabase size: {} (shared across all collections)\nEmbedding model: {}\nPersist directory: {}",
        info.stats.name,
        info.stats.count,
        info.stats.dimension,
        info.disk_size,
        model,
        info.persist_dir.display()
    )
}

pub fn retrieved_text(rows: &[Retrieved]) -> String {
    if rows.is_empty() {
        return "No results.".to_string();
    }
    rows.iter()
        .map(|r| format!("Result #{}\nScore: {:.4}\nSource: {} (page {})\n{}", r.rank, r.score, r.source, r.page, r.snippet))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The answer followed by the sources it drew on.
pub fn answer_text(answer: &RagAnswer) -> String {
    let mut out = format!("Answer:\n{}", answer.answer.trim());
    if answer.context.is_empty() {
        out.push_str("\n\nNo context found in the collection; the answer is not grounded in the document.");
    } else {
        out.push_str("\n\nSources:");
        for (i, hit) in answer.context.iter().enumerate() {
            let _ = write!(out, "\n{}. {} (page {}, score {:.4})", i + 1, hit.chunk.source, hit.chunk.page, hit.score);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts_core::{Chunk, ScoredChunk};
    use contracts_rag::IngestMode;

    #[test]
    fn empty_listing_names_the_directory() {
        assert_eq!(collections_text(Path::new("vector_db"), &[]), "No collections found in: vector_db");
    }

    #[test]
    fn listing_shows_counts_and_sources() {
        let stats = CollectionStats {
            name: "contract".into(),
            count: 6,
            dimension: 384,
            model: None,
            sample_sources: vec!["contract.pdf".into()],
        };
        let text = collections_text(Path::new("vector_db"), &[stats]);
        assert_eq!(text, "Collections:\n- contract\n  Items: 6\n  Sample sources: contract.pdf");
    }

    #[test]
    fn results_are_numbered_from_one() {
        let hits = vec![ScoredChunk { chunk: Chunk::new("c.pdf", 2, 0, "net 30 days"), score: 0.5 }];
        let text = retrieved_text(&Retrieved::rows(&hits));
        assert!(text.starts_with("Result #1\nScore: 0.5000\nSource: c.pdf (page 2)\nnet 30 days"), "{text}");
        assert_eq!(retrieved_text(&[]), "No results.");
    }

    #[test]
    fn answer_lists_sources() {
        let answer = RagAnswer {
            answer: "Net 30.\n".into(),
            context: vec![ScoredChunk { chunk: Chunk::new("c.pdf", 3, 1, "text"), score: 0.25 }],
        };
        assert_eq!(answer_text(&answer), "Answer:\nNet 30.\n\nSources:\n1. c.pdf (page 3, score 0.2500)");
    }

    #[test]
    fn answer_without_context_says_so() {
        let answer = RagAnswer { answer: "I don't know.".into(), context: Vec::new() };
        assert!(answer_text(&answer).ends_with("No context found in the collection; the answer is not grounded in the document."));
    }

    #[test]
    fn ingest_report_json_uses_lowercase_mode() {
        let report = IngestReport { collection: "c".into(), source: "c.pdf".into(), mode: IngestMode::Rebuild, pages: 2, chunks: 6 };
        let value: serde_json::Value = serde_json::from_str(&json(&report).unwrap()).unwrap();
        assert_eq!(value["mode"], "rebuild");
        assert_eq!(value["chunks"], 6);
    }
}
