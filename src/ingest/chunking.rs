//! Recursive boundary-preferring text splitting.
//!
//! Text is cut at the coarsest separator that occurs in it (blank lines, then newlines, then
//! spaces, then between characters). Pieces smaller than the target are merged back together up
//! to the target size, and the tail of each emitted chunk (up to the overlap) is carried into the
//! start of the next one. Pieces still too large are split again with the finer separators.
//!
//! Sizes are measured in characters. Every chunk is an exact substring of the input: separators
//! stay attached to the start of the piece that follows them and no whitespace is trimmed, which
//! keeps chunk boundaries addressable as byte ranges.

use crate::config::Config;
use crate::ingest::types::{Chunk, ChunkFailure, ChunkOutcome, ChunkingError, Document};
use std::collections::VecDeque;
use std::ops::Range;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
struct Piece {
    span: Range<usize>,
    chars: usize,
}

impl Piece {
    fn new(text: &str, span: Range<usize>) -> Self {
        let chars = text[span.clone()].chars().count();
        Self { span, chars }
    }
}

/// Splits documents into overlapping chunks with run-unique identifiers.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Build a chunker with the target size and overlap, both in characters.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap: chunk_overlap,
                chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Build a chunker from `TEXT_SPLITTER_CHUNK_SIZE` / `TEXT_SPLITTER_CHUNK_OVERLAP`.
    pub fn from_config(config: &Config) -> Result<Self, ChunkingError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split every document, numbering chunks across the whole run.
    ///
    /// Documents that cannot be split are reported in [`ChunkOutcome::failures`]; the rest
    /// continue.
    pub fn split(&self, documents: &[Document]) -> ChunkOutcome {
        let mut outcome = ChunkOutcome::default();
        let mut running = 0usize;

        for (document_index, document) in documents.iter().enumerate() {
            match self.chunk_document(document_index, document, &mut running) {
                Ok(chunks) => {
                    tracing::debug!(
                        source = %document.source_path.display(),
                        document_index,
                        chunks = chunks.len(),
                        "Chunked document"
                    );
                    outcome.chunks.extend(chunks);
                }
                Err(error) => {
                    tracing::warn!(
                        source = %document.source_path.display(),
                        document_index,
                        error = %error,
                        "Skipping document that could not be chunked"
                    );
                    outcome.failures.push(ChunkFailure {
                        document_index,
                        source_path: document.source_path.clone(),
                        error,
                    });
                }
            }
        }

        outcome
    }

    /// Split one document. `running` is the number of chunks already produced in this run and is
    /// advanced past the new chunks.
    pub fn chunk_document(
        &self,
        document_index: usize,
        document: &Document,
        running: &mut usize,
    ) -> Result<Vec<Chunk>, ChunkingError> {
        if document.content.trim().is_empty() {
            return Err(ChunkingError::NoContent {
                source_path: document.source_path.clone(),
            });
        }

        let source = document.source_path.display().to_string();
        let chunks = self
            .split_text(&document.content)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| {
                let id = format!("{document_index}_{chunk_index}_{running}");
                *running += 1;
                Chunk {
                    id,
                    content,
                    title: document.title.clone(),
                    source: source.clone(),
                    chunk_index,
                }
            })
            .collect();
        Ok(chunks)
    }

    /// Split raw text into chunk strings, dropping whitespace-only chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_spans(text)
            .into_iter()
            .map(|span| &text[span])
            .filter(|chunk| !chunk.trim().is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Byte ranges of each chunk within `text`, in order. Consecutive ranges either touch or
    /// overlap, so together they cover the whole input.
    pub fn split_spans(&self, text: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        self.split_recursive(text, 0..text.len(), &SEPARATORS, &mut spans);
        spans
    }

    fn split_recursive(
        &self,
        text: &str,
        span: Range<usize>,
        separators: &[&str],
        out: &mut Vec<Range<usize>>,
    ) {
        let slice = &text[span.clone()];
        let position = separators
            .iter()
            .position(|separator| separator.is_empty() || slice.contains(separator))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let finer = separators.get(position + 1..).unwrap_or(&[]);

        let mut pending: Vec<Piece> = Vec::new();
        for piece in split_keeping_separator(text, span, separator) {
            if piece.chars < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                self.merge(&pending, out);
                pending.clear();
            }
            if finer.is_empty() {
                out.push(piece.span);
            } else {
                self.split_recursive(text, piece.span, finer, out);
            }
        }
        if !pending.is_empty() {
            self.merge(&pending, out);
        }
    }

    /// Merge contiguous pieces into chunks no longer than the target size, carrying up to the
    /// overlap into each following chunk.
    fn merge(&self, pieces: &[Piece], out: &mut Vec<Range<usize>>) {
        let mut window: VecDeque<&Piece> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            if total + piece.chars > self.chunk_size {
                if let (Some(first), Some(last)) = (window.front(), window.back()) {
                    out.push(first.span.start..last.span.end);
                }
                while total > self.chunk_overlap
                    || (total > 0 && total + piece.chars > self.chunk_size)
                {
                    match window.pop_front() {
                        Some(dropped) => total -= dropped.chars,
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += piece.chars;
        }

        if let (Some(first), Some(last)) = (window.front(), window.back()) {
            out.push(first.span.start..last.span.end);
        }
    }
}

/// Split `span` of `text` on `separator`, keeping each separator at the start of the piece that
/// follows it. An empty separator yields one piece per character. Empty pieces are dropped.
fn split_keeping_separator(text: &str, span: Range<usize>, separator: &str) -> Vec<Piece> {
    let slice = &text[span.clone()];
    let offset = span.start;

    if separator.is_empty() {
        return slice
            .char_indices()
            .map(|(index, ch)| Piece {
                span: offset + index..offset + index + ch.len_utf8(),
                chars: 1,
            })
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0usize;
    for (index, _) in slice.match_indices(separator) {
        if index > start {
            pieces.push(Piece::new(text, offset + start..offset + index));
        }
        start = index;
    }
    if slice.len() > start {
        pieces.push(Piece::new(text, offset + start..offset + slice.len()));
    }
    pieces
}
