//! Word-processor (.docx) extractor (SPEC_FULL §4.1).
//!
//! A `.docx` is a zip archive; the document body lives at
//! `word/document.xml` as a flat-ish sequence of `w:p` (paragraph) and
//! `w:tbl` (table) elements in source order. We walk that sequence with a
//! streaming XML reader rather than building a DOM, mirroring how the
//! original extractor walks `doc.element.body` children in order.

use std::io::{Cursor, Read};
use std::path::Path;

use ingest_core::Block;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::ExtractError;
use crate::table::rows_to_markdown;

/// Extract an ordered block stream from a `.docx` file at `path`.
///
/// # Errors
///
/// Returns [`ExtractError::InputNotFound`] if the path doesn't exist,
/// [`ExtractError::Malformed`] if the container or its XML isn't well
/// formed, and [`ExtractError::ExtractEmpty`] if no non-empty blocks result.
pub fn extract(path: &Path) -> Result<Vec<Block>, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::InputNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::Malformed(format!("not a valid docx container: {e}")))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Malformed(format!("missing word/document.xml: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Malformed(e.to_string()))?;

    let blocks = parse_document_xml(&xml)?;
    if blocks.is_empty() {
        return Err(ExtractError::ExtractEmpty(path.to_path_buf()));
    }
    Ok(blocks)
}

fn local_name(full: &[u8]) -> &[u8] {
    match full.iter().position(|&b| b == b':') {
        Some(i) => &full[i + 1..],
        None => full,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_document_xml(xml: &str) -> Result<Vec<Block>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut blocks = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| ExtractError::Malformed(e.to_string()))? {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"tbl" => {
                    let grid = parse_table(&mut reader)?;
                    let (md, rows, cols) = rows_to_markdown(&grid);
                    if !md.trim().is_empty() {
                        blocks.push(Block::table(md, rows, cols, None));
                    }
                }
                b"p" => {
                    let para = parse_paragraph(&mut reader)?;
                    if let Some(block) = classify_paragraph(para) {
                        blocks.push(block);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(blocks)
}

struct ParagraphInfo {
    style: Option<String>,
    has_num_pr: bool,
    text: String,
}

fn parse_paragraph(reader: &mut Reader<&[u8]>) -> Result<ParagraphInfo, ExtractError> {
    let mut depth = 0u32;
    let mut style = None;
    let mut has_num_pr = false;
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| ExtractError::Malformed(e.to_string()))? {
            Event::Start(e) => {
                if local_name(e.name().as_ref()) == b"numPr" {
                    has_num_pr = true;
                }
                depth += 1;
            }
            Event::Empty(e) => {
                let local = local_name(e.name().as_ref());
                if local == b"numPr" {
                    has_num_pr = true;
                }
                if local == b"pStyle" {
                    for attr in e.attributes().flatten() {
                        if local_name(attr.key.as_ref()) == b"val" {
                            style = Some(String::from_utf8_lossy(&attr.value).to_string());
                        }
                    }
                }
            }
            Event::Text(t) => {
                text.push_str(&t.unescape().unwrap_or_default());
                text.push(' ');
            }
            Event::End(e) => {
                if local_name(e.name().as_ref()) == b"p" && depth == 0 {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(ParagraphInfo { style, has_num_pr, text: collapse_whitespace(&text) })
}

fn classify_paragraph(p: ParagraphInfo) -> Option<Block> {
    if p.text.trim().is_empty() {
        return None;
    }
    if let Some(style) = &p.style
        && let Some(level) = heading_level_from_style(style)
    {
        return Some(Block::heading(level, p.text));
    }
    if let Some(style) = &p.style {
        let lower = style.to_lowercase();
        if ["list", "bullet", "number"].iter().any(|k| lower.contains(k)) {
            return Some(Block::list_item(p.text));
        }
    }
    if p.has_num_pr {
        return Some(Block::list_item(p.text));
    }
    Some(Block::paragraph(p.text))
}

fn heading_level_from_style(style: &str) -> Option<u8> {
    let lower = style.to_lowercase();
    lower
        .strip_prefix("heading")
        .and_then(|rest| rest.trim().parse::<u8>().ok())
        .filter(|level| (1..=6).contains(level))
}

fn parse_table(reader: &mut Reader<&[u8]>) -> Result<Vec<Vec<String>>, ExtractError> {
    let mut rows = Vec::new();
    let mut depth = 0u32;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| ExtractError::Malformed(e.to_string()))? {
            Event::Start(e) => {
                if local_name(e.name().as_ref()) == b"tr" {
                    rows.push(parse_table_row(reader)?);
                } else {
                    depth += 1;
                }
            }
            Event::End(e) => {
                if local_name(e.name().as_ref()) == b"tbl" && depth == 0 {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

fn parse_table_row(reader: &mut Reader<&[u8]>) -> Result<Vec<String>, ExtractError> {
    let mut cells = Vec::new();
    let mut depth = 0u32;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| ExtractError::Malformed(e.to_string()))? {
            Event::Start(e) => {
                if local_name(e.name().as_ref()) == b"tc" {
                    cells.push(parse_table_cell(reader)?);
                } else {
                    depth += 1;
                }
            }
            Event::End(e) => {
                if local_name(e.name().as_ref()) == b"tr" && depth == 0 {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(cells)
}

fn parse_table_cell(reader: &mut Reader<&[u8]>) -> Result<String, ExtractError> {
    let mut parts = Vec::new();
    let mut depth = 0u32;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| ExtractError::Malformed(e.to_string()))? {
            Event::Start(_) => depth += 1,
            Event::Text(t) => parts.push(t.unescape().unwrap_or_default().to_string()),
            Event::End(e) => {
                if local_name(e.name().as_ref()) == b"tc" && depth == 0 {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(collapse_whitespace(&parts.join(" ")))
}
