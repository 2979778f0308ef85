//! Structure-aware chunker (C4, SPEC_FULL §4.3).

use ingest_core::{Block, BlockKind, Chunk, ChunkKind};
use tracing::warn;

use crate::metadata::generate_chunk_metadata;
use crate::tokenizer::Tokenizer;

/// Token budgets controlling the chunker. See SPEC_FULL §6 for defaults.
#[derive(Debug, Clone, Copy)]
pub struct ChunkParams {
    pub target: u32,
    pub min: u32,
    pub max: u32,
    pub hard_cap: u32,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self { target: 450, min: 350, max: 500, hard_cap: 800 }
    }
}

/// A chunk in progress, before token counts and ordinals are finalized.
struct Draft {
    kind: ChunkKind,
    text: String,
    heading_path: Vec<String>,
}

/// Walks `blocks` and assembles them into token-bounded chunks honoring the
/// heading-boundary, overflow, and table-packing rules of SPEC_FULL §4.3.
#[must_use]
pub fn chunk_blocks(blocks: &[Block], tok: Tokenizer, params: ChunkParams) -> Vec<Chunk> {
    let mut drafts: Vec<Draft> = Vec::new();

    let mut heading_stack: Vec<(u8, String)> = Vec::new();
    let mut buffer = String::new();
    let mut buffer_path: Vec<String> = Vec::new();

    let flush = |buffer: &mut String, buffer_path: &mut Vec<String>, drafts: &mut Vec<Draft>| {
        if !buffer.trim().is_empty() {
            drafts.push(Draft {
                kind: ChunkKind::Text,
                text: std::mem::take(buffer),
                heading_path: buffer_path.clone(),
            });
        }
        buffer.clear();
    };

    let append = |buffer: &mut String, text: &str| {
        if !buffer.is_empty() {
            buffer.push_str("\n\n");
        }
        buffer.push_str(text);
    };

    for block in blocks {
        match &block.kind {
            BlockKind::Heading { level } => {
                // Rule 1: a heading flushes the buffer before being placed
                // in the new group, unless the buffer is already empty.
                flush(&mut buffer, &mut buffer_path, &mut drafts);

                let truncate_to = (*level as usize).saturating_sub(1);
                heading_stack.truncate(truncate_to);
                heading_stack.push((*level, block.text.clone()));
                buffer_path = heading_stack.iter().map(|(_, t)| t.clone()).collect();

                append(&mut buffer, &block.text);
                // A lone heading never flushes itself on "reached target";
                // headings are short, so the target check below still runs
                // harmlessly on the next iteration's state.
            }
            BlockKind::Table { .. } => {
                // Tables are never mixed with prose: close out the buffer
                // first, emit the table as its own chunk(s), then resume
                // prose accumulation under the same heading path.
                flush(&mut buffer, &mut buffer_path, &mut drafts);
                let path = buffer_path.clone();
                chunk_table(&block.text, tok, params, &path, &mut drafts);
            }
            BlockKind::Paragraph | BlockKind::List | BlockKind::Code { .. } => {
                let block_tokens = tok.count(&block.text);

                if block_tokens > params.max {
                    // Rule 3: a single oversized block flushes the buffer,
                    // then is split at sentence boundaries.
                    flush(&mut buffer, &mut buffer_path, &mut drafts);
                    split_oversized_block(&block.text, tok, params, &buffer_path, &mut drafts);
                    continue;
                }

                // Rule 2: adding this block would overflow `max` — flush first.
                let prospective = if buffer.is_empty() {
                    block_tokens
                } else {
                    tok.count(&buffer) + block_tokens
                };
                if prospective > params.max {
                    flush(&mut buffer, &mut buffer_path, &mut drafts);
                }

                append(&mut buffer, &block.text);

                // Rule 5: once the target is reached, flush.
                if tok.count(&buffer) >= params.target {
                    flush(&mut buffer, &mut buffer_path, &mut drafts);
                }
            }
        }
    }

    // Rule 6: flush whatever remains at end of stream.
    flush(&mut buffer, &mut buffer_path, &mut drafts);

    finalize(drafts, tok)
}

/// Rule 3/4: sentence-split a block whose own token count exceeds `max`,
/// greedily filling each output chunk; a sentence that alone exceeds
/// `hard_cap` is kept as its own chunk with a logged warning (I3 exception).
fn split_oversized_block(
    text: &str,
    tok: Tokenizer,
    params: ChunkParams,
    heading_path: &[String],
    drafts: &mut Vec<Draft>,
) {
    let sentences = split_sentences(text);
    let mut buffer = String::new();

    for sentence in sentences {
        let sentence_tokens = tok.count(&sentence);
        if sentence_tokens > params.hard_cap {
            if !buffer.trim().is_empty() {
                drafts.push(Draft {
                    kind: ChunkKind::Text,
                    text: std::mem::take(&mut buffer),
                    heading_path: heading_path.to_vec(),
                });
            }
            warn!(tokens = sentence_tokens, hard_cap = params.hard_cap, "sentence exceeds hard cap; emitting as its own oversized chunk");
            drafts.push(Draft {
                kind: ChunkKind::Text,
                text: sentence,
                heading_path: heading_path.to_vec(),
            });
            continue;
        }

        let prospective =
            if buffer.is_empty() { sentence_tokens } else { tok.count(&buffer) + sentence_tokens };
        if prospective > params.max && !buffer.trim().is_empty() {
            drafts.push(Draft {
                kind: ChunkKind::Text,
                text: std::mem::take(&mut buffer),
                heading_path: heading_path.to_vec(),
            });
        }
        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(&sentence);
    }

    if !buffer.trim().is_empty() {
        drafts.push(Draft { kind: ChunkKind::Text, text: buffer, heading_path: heading_path.to_vec() });
    }
}

/// Split on whitespace that follows `.`, `!`, or `?` — the punctuation stays
/// attached to the preceding sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();

    for (i, &ch) in chars.iter().enumerate() {
        current.push(ch);
        let ends_sentence = matches!(ch, '.' | '!' | '?');
        let next_is_whitespace = chars.get(i + 1).is_some_and(|c| c.is_whitespace());
        if ends_sentence && next_is_whitespace {
            sentences.push(std::mem::take(&mut current).trim().to_string());
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }
    sentences
}

/// Table chunking (§4.3 table rule): header + separator replicated into
/// every output chunk, greedy row-packing bounded by `hard_cap`.
fn chunk_table(
    markdown: &str,
    tok: Tokenizer,
    params: ChunkParams,
    heading_path: &[String],
    drafts: &mut Vec<Draft>,
) {
    let lines: Vec<&str> = markdown.lines().collect();
    if lines.len() < 2 {
        // Degenerate table (no rows beyond header+separator, or malformed);
        // emit as-is rather than panic on index access below.
        drafts.push(Draft {
            kind: ChunkKind::Table,
            text: markdown.to_string(),
            heading_path: heading_path.to_vec(),
        });
        return;
    }

    let header = lines[0];
    let separator = lines[1];
    let rows = &lines[2..];
    let header_block = format!("{header}\n{separator}");
    let header_tokens = tok.count(&header_block);

    let total_tokens = tok.count(markdown);
    if total_tokens <= params.hard_cap {
        drafts.push(Draft {
            kind: ChunkKind::Table,
            text: markdown.to_string(),
            heading_path: heading_path.to_vec(),
        });
        return;
    }

    let mut current_rows: Vec<&str> = Vec::new();
    let mut current_tokens = header_tokens;

    let emit = |rows: &mut Vec<&str>, drafts: &mut Vec<Draft>| {
        if rows.is_empty() {
            return;
        }
        let text = format!("{header_block}\n{}", rows.join("\n"));
        drafts.push(Draft { kind: ChunkKind::Table, text, heading_path: heading_path.to_vec() });
        rows.clear();
    };

    for &row in rows {
        let row_tokens = tok.count(row);

        if header_tokens + row_tokens > params.hard_cap {
            // A single row that alone overflows the cap with the header:
            // emit whatever was accumulated, then this row stands alone.
            emit(&mut current_rows, drafts);
            current_tokens = header_tokens;
            warn!(
                tokens = header_tokens + row_tokens,
                hard_cap = params.hard_cap,
                "table row exceeds hard cap even alone with header; emitting as its own oversized chunk"
            );
            drafts.push(Draft {
                kind: ChunkKind::Table,
                text: format!("{header_block}\n{row}"),
                heading_path: heading_path.to_vec(),
            });
            continue;
        }

        if current_tokens + row_tokens > params.hard_cap {
            emit(&mut current_rows, drafts);
            current_tokens = header_tokens;
        }

        current_rows.push(row);
        current_tokens += row_tokens;
    }

    emit(&mut current_rows, drafts);
}

/// Compute final token counts, metadata, and dense ordinals (I4) across the
/// combined prose+table stream in emission order.
fn finalize(drafts: Vec<Draft>, tok: Tokenizer) -> Vec<Chunk> {
    drafts
        .into_iter()
        .enumerate()
        .map(|(ordinal, draft)| {
            let token_count = tok.count(&draft.text);
            let is_table = matches!(draft.kind, ChunkKind::Table);
            Chunk {
                kind: draft.kind,
                metadata: generate_chunk_metadata(&draft.text, is_table),
                token_count,
                heading_path: draft.heading_path,
                ordinal: u32::try_from(ordinal).unwrap_or(u32::MAX),
                text: draft.text,
            }
        })
        .collect()
}
