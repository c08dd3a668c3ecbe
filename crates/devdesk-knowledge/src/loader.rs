//! Markdown document loading and chunking.
//!
//! Documents are split at `##`/`###` headings so each chunk stays a
//! coherent unit. Subsection chunks are prefixed with the nearest `#`
//! heading above them so retrieval keeps the document context. Files
//! without headings fall back to paragraph splitting.

use std::path::Path;

use tracing::{info, warn};

use devdesk_core::error::DevDeskError;
use devdesk_core::types::DocChunk;

/// Load every `.md` file under `kb_dir` as a list of chunks.
///
/// A missing directory is not an error; it just yields no chunks.
pub fn load_documents(kb_dir: &Path) -> Result<Vec<DocChunk>, DevDeskError> {
    if !kb_dir.is_dir() {
        warn!("Knowledge base directory {} does not exist", kb_dir.display());
        return Ok(Vec::new());
    }

    let mut chunks = Vec::new();
    let mut paths: Vec<_> = std::fs::read_dir(kb_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
        .collect();
    paths.sort();

    for path in &paths {
        let content = std::fs::read_to_string(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.md")
            .to_string();
        let stem = path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let title = first_h1(&content).unwrap_or_else(|| stem.clone());

        for (i, text) in split_document(&content).into_iter().enumerate() {
            chunks.push(DocChunk {
                id: format!("{}_{}", stem, i),
                filename: filename.clone(),
                title: title.clone(),
                content: text,
            });
        }
    }

    info!("Loaded {} chunks from {} knowledge files", chunks.len(), paths.len());
    Ok(chunks)
}

fn first_h1(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        line.strip_prefix("# ")
            .map(|rest| rest.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Split a markdown document into chunks.
///
/// The preamble before the first `##`/`###` heading is one chunk; every
/// subsection becomes its own chunk prefixed with the most recent `#`
/// title. Headingless documents split on blank lines instead.
pub fn split_document(content: &str) -> Vec<String> {
    let mut sections: Vec<(Option<String>, Vec<&str>)> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_parent: Option<String> = None;
    let mut last_h1: Option<String> = None;

    for line in content.lines() {
        if let Some(title) = subsection_title(line) {
            if !current.iter().all(|l| l.trim().is_empty()) {
                sections.push((current_parent.clone(), current));
            }
            current = vec![title];
            current_parent = last_h1.clone();
            continue;
        }
        if let Some(rest) = line.strip_prefix("# ") {
            let title = rest.trim();
            if !title.is_empty() {
                last_h1 = Some(title.to_string());
            }
        }
        current.push(line);
    }
    if !current.iter().all(|l| l.trim().is_empty()) {
        sections.push((current_parent, current));
    }

    let mut chunks: Vec<String> = sections
        .into_iter()
        .filter_map(|(parent, lines)| {
            let body = normalize_whitespace(&lines.join("\n"));
            if body.is_empty() {
                return None;
            }
            match parent {
                Some(p) => Some(format!("{}\n\n{}", p, body)),
                None => Some(body),
            }
        })
        .collect();

    // Fallback: no headings at all means one big section; split it into
    // paragraphs so chunks stay embeddable.
    if chunks.len() <= 1 && !content.contains("\n## ") && !content.contains("\n### ") {
        let paragraphs: Vec<String> = content
            .split("\n\n")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if paragraphs.len() > 1 {
            chunks = paragraphs;
        }
    }

    chunks
}

/// Returns the heading text (without hashes) for `##`/`###` lines.
fn subsection_title(line: &str) -> Option<&str> {
    for prefix in ["### ", "## "] {
        if let Some(rest) = line.strip_prefix(prefix) {
            let title = rest.trim();
            if !title.is_empty() {
                return Some(title);
            }
        }
    }
    None
}

/// Collapse runs of blank lines down to a single blank line and trim.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line.trim_end());
    }
    out.trim().to_string()
}
