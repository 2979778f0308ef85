//! Portable-document (.pdf) extractor (SPEC_FULL §4.1).
//!
//! Two passes per page, mirroring the original pdfplumber+pymupdf split:
//! first a low-level scan of the content stream's path-painting operators
//! to guess table bounding boxes from ruling lines, then a scan of the text
//! operators that classifies runs by font size/weight and drops anything
//! whose origin falls inside a detected table box. Text blocks for a page
//! are emitted before that page's table blocks, matching the source
//! extractor's two-step `blocks.extend(text); blocks.append(tables)` order.

use std::path::Path;

use ingest_core::Block;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::ExtractError;
use crate::table::rows_to_markdown;

const H1_FONT_SIZE: f64 = 18.0;
const HEADING_FONT_SIZE: f64 = 14.0;
const H2_FONT_SIZE: f64 = 16.0;
const BOLD_HEADING_MAX_LEN: usize = 200;
/// A cluster of at least this many ruled-line rectangles is treated as a table grid.
const MIN_RULES_FOR_TABLE: usize = 6;
const ROW_CLUSTER_TOLERANCE: f64 = 3.0;

pub fn extract(path: &Path) -> Result<Vec<Block>, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::InputNotFound(path.to_path_buf()));
    }
    let doc = Document::load(path).map_err(|e| ExtractError::Malformed(e.to_string()))?;

    let mut blocks = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        blocks.extend(extract_page(&doc, page_id, page_number)?);
    }

    if blocks.is_empty() {
        return Err(ExtractError::ExtractEmpty(path.to_path_buf()));
    }
    Ok(blocks)
}

fn object_as_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

struct Rect {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

struct TextSpan {
    x: f64,
    y: f64,
    font_size: f64,
    bold: bool,
    text: String,
}

struct TextRun {
    y: f64,
    max_font_size: f64,
    bold: bool,
    text: String,
}

fn extract_page(doc: &Document, page_id: ObjectId, page_number: u32) -> Result<Vec<Block>, ExtractError> {
    let data = doc.get_page_content(page_id).map_err(|e| ExtractError::Malformed(e.to_string()))?;
    let content = Content::decode(&data).map_err(|e| ExtractError::Malformed(e.to_string()))?;
    let fonts = doc.get_page_fonts(page_id);

    // First pass: gather ruling-line rectangles so table bboxes are known
    // before we decide, span by span, whether text belongs to a table.
    let mut rects = Vec::new();
    for op in &content.operations {
        if op.operator == "re"
            && let [x, y, w, h] = op.operands.as_slice()
            && let (Some(x), Some(y), Some(w), Some(h)) =
                (object_as_f64(x), object_as_f64(y), object_as_f64(w), object_as_f64(h))
        {
            rects.push(Rect { x, y, w, h });
        }
    }
    let table_bboxes = cluster_table_rects(&rects);

    let mut runs: Vec<TextRun> = Vec::new();
    let mut table_spans: Vec<TextSpan> = Vec::new();

    let mut cursor = (0.0f64, 0.0f64);
    let mut font_size = 0.0f64;
    let mut font_bold = false;
    let mut in_text_object = false;
    let mut run_spans: Vec<TextSpan> = Vec::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "BT" => {
                in_text_object = true;
                cursor = (0.0, 0.0);
                run_spans.clear();
            }
            "ET" => {
                in_text_object = false;
                flush_run(&mut run_spans, &mut runs, &mut table_spans, &table_bboxes);
            }
            "Tf" => {
                if let [Object::Name(name), size] = op.operands.as_slice() {
                    font_size = object_as_f64(size).unwrap_or(font_size);
                    font_bold = font_name_for(&fonts, name).is_some_and(|n| n.to_lowercase().contains("bold"));
                }
            }
            "Td" | "TD" => {
                if let [tx, ty] = op.operands.as_slice()
                    && let (Some(tx), Some(ty)) = (object_as_f64(tx), object_as_f64(ty))
                {
                    cursor.0 += tx;
                    cursor.1 += ty;
                }
            }
            "Tm" => {
                if let [_, _, _, _, e, f] = op.operands.as_slice()
                    && let (Some(e), Some(f)) = (object_as_f64(e), object_as_f64(f))
                {
                    cursor = (e, f);
                }
            }
            "Tj" => {
                if let [text] = op.operands.as_slice()
                    && let Some(s) = string_operand(text)
                    && in_text_object
                    && !s.trim().is_empty()
                {
                    run_spans.push(TextSpan { x: cursor.0, y: cursor.1, font_size, bold: font_bold, text: s });
                }
            }
            "TJ" => {
                if let [Object::Array(items)] = op.operands.as_slice() {
                    let mut joined = String::new();
                    for item in items {
                        if let Some(s) = string_operand(item) {
                            joined.push_str(&s);
                        }
                    }
                    if in_text_object && !joined.trim().is_empty() {
                        run_spans.push(TextSpan {
                            x: cursor.0,
                            y: cursor.1,
                            font_size,
                            bold: font_bold,
                            text: joined,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    Ok(build_blocks(runs, table_spans, page_number))
}

fn flush_run(
    run_spans: &mut Vec<TextSpan>,
    runs: &mut Vec<TextRun>,
    table_spans: &mut Vec<TextSpan>,
    table_bboxes: &[(f64, f64, f64, f64)],
) {
    if run_spans.is_empty() {
        return;
    }
    let spans = std::mem::take(run_spans);
    let first = &spans[0];
    if point_in_any(first.x, first.y, table_bboxes) {
        table_spans.extend(spans);
        return;
    }
    let max_font_size = spans.iter().fold(0.0f64, |acc, s| acc.max(s.font_size));
    let bold = spans.iter().any(|s| s.bold);
    let text = collapse_whitespace(&spans.iter().map(|s| s.text.clone()).collect::<Vec<_>>().join(" "));
    if !text.is_empty() {
        runs.push(TextRun { y: first.y, max_font_size, bold, text });
    }
}

fn point_in_any(x: f64, y: f64, bboxes: &[(f64, f64, f64, f64)]) -> bool {
    bboxes.iter().any(|&(x0, y0, x1, y1)| x >= x0 - 1.0 && x <= x1 + 1.0 && y >= y0 - 1.0 && y <= y1 + 1.0)
}

fn cluster_table_rects(rects: &[Rect]) -> Vec<(f64, f64, f64, f64)> {
    if rects.len() < MIN_RULES_FOR_TABLE {
        return Vec::new();
    }
    let mut boxes: Vec<(f64, f64, f64, f64, usize)> =
        rects.iter().map(|r| (r.x, r.y, r.x + r.w, r.y + r.h, 1usize)).collect();
    loop {
        let mut merged = false;
        'outer: for i in 0..boxes.len() {
            for j in (i + 1)..boxes.len() {
                if overlaps_or_touches(boxes[i], boxes[j]) {
                    let (x0, y0, x1, y1, count) = boxes[j];
                    boxes[i].0 = boxes[i].0.min(x0);
                    boxes[i].1 = boxes[i].1.min(y0);
                    boxes[i].2 = boxes[i].2.max(x1);
                    boxes[i].3 = boxes[i].3.max(y1);
                    boxes[i].4 += count;
                    boxes.remove(j);
                    merged = true;
                    break 'outer;
                }
            }
        }
        if !merged {
            break;
        }
    }
    boxes
        .into_iter()
        .filter(|&(.., count)| count >= MIN_RULES_FOR_TABLE)
        .map(|(x0, y0, x1, y1, _)| (x0, y0, x1, y1))
        .collect()
}

fn overlaps_or_touches(a: (f64, f64, f64, f64, usize), b: (f64, f64, f64, f64, usize)) -> bool {
    // Generous margin: ruling lines of the same table grid are typically a
    // row height apart (tens of points), not touching.
    let margin = 50.0;
    a.0 - margin <= b.2 && b.0 - margin <= a.2 && a.1 - margin <= b.3 && b.1 - margin <= a.3
}

fn build_blocks(mut runs: Vec<TextRun>, table_spans: Vec<TextSpan>, page_number: u32) -> Vec<Block> {
    let mut blocks = Vec::new();
    runs.sort_by(|a, b| b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal));
    for run in runs {
        blocks.push(classify(run));
    }

    if !table_spans.is_empty() {
        let grid = spans_to_grid(table_spans);
        let (md, rows, cols) = rows_to_markdown(&grid);
        if !md.trim().is_empty() {
            blocks.push(Block::table(md, rows, cols, Some(page_number)));
        }
    }
    blocks
}

fn classify(run: TextRun) -> Block {
    if run.max_font_size >= H1_FONT_SIZE {
        return Block::heading(1, run.text);
    }
    if run.max_font_size >= HEADING_FONT_SIZE || (run.bold && run.text.len() < BOLD_HEADING_MAX_LEN) {
        let level = if run.max_font_size >= H2_FONT_SIZE { 2 } else { 3 };
        return Block::heading(level, run.text);
    }
    Block::paragraph(run.text)
}

fn spans_to_grid(mut spans: Vec<TextSpan>) -> Vec<Vec<String>> {
    spans.sort_by(|a, b| b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal));
    let mut rows: Vec<Vec<TextSpan>> = Vec::new();
    for span in spans {
        match rows.last_mut() {
            Some(row) if (row[0].y - span.y).abs() <= ROW_CLUSTER_TOLERANCE => row.push(span),
            _ => rows.push(vec![span]),
        }
    }
    rows.into_iter()
        .map(|mut row| {
            row.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
            row.into_iter().map(|s| s.text).collect()
        })
        .collect()
}

fn font_name_for(fonts: &std::collections::BTreeMap<Vec<u8>, &Dictionary>, name: &[u8]) -> Option<String> {
    let dict = fonts.get(name)?;
    let base_font = dict.get(b"BaseFont").ok()?;
    match base_font {
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).to_string()),
        _ => None,
    }
}

fn string_operand(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).to_string()),
        _ => None,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use lopdf::content::{Content, Operation};
    use lopdf::{Stream, StringFormat, dictionary};
    use tempfile::TempDir;

    use super::*;

    fn write_pdf(tmp: &TempDir, name: &str) -> std::path::PathBuf {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::String(b"Report Title".to_vec(), StringFormat::Literal)]),
                Operation::new("ET", vec![]),
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), 12.into()]),
                Operation::new("Td", vec![72.into(), 650.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(b"Body paragraph text.".to_vec(), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let path = tmp.path().join(name);
        doc.save(&path).unwrap();
        path
    }

    #[test]
    fn extract_reads_a_pdf_fixture_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let path = write_pdf(&tmp, "sample.pdf");
        let blocks = extract(&path).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].heading_level(), Some(1));
        assert_eq!(blocks[1].text, "Body paragraph text.");
    }

    #[test]
    fn extract_rejects_a_missing_path() {
        let err = extract(Path::new("/tmp/does-not-exist-ingest-extract-test.pdf")).unwrap_err();
        assert!(matches!(err, ExtractError::InputNotFound(_)));
    }

    #[test]
    fn classifies_h1_by_font_size() {
        let run = TextRun { y: 0.0, max_font_size: 20.0, bold: false, text: "Title".into() };
        assert_eq!(classify(run).heading_level(), Some(1));
    }

    #[test]
    fn classifies_h2_vs_h3_by_sixteen_point_boundary() {
        let h2 = TextRun { y: 0.0, max_font_size: 16.0, bold: false, text: "Section".into() };
        let h3 = TextRun { y: 0.0, max_font_size: 14.0, bold: false, text: "Sub".into() };
        assert_eq!(classify(h2).heading_level(), Some(2));
        assert_eq!(classify(h3).heading_level(), Some(3));
    }

    #[test]
    fn bold_short_run_below_threshold_becomes_heading() {
        let run = TextRun { y: 0.0, max_font_size: 10.0, bold: true, text: "Label".into() };
        assert_eq!(classify(run).heading_level(), Some(3));
    }

    #[test]
    fn plain_run_is_paragraph() {
        let run = TextRun { y: 0.0, max_font_size: 10.0, bold: false, text: "Body copy.".into() };
        let block = classify(run);
        assert!(!block.is_heading());
    }

    #[test]
    fn clusters_ruling_lines_into_one_table_bbox() {
        let rects: Vec<Rect> = (0..8).map(|i| Rect { x: 0.0, y: i as f64 * 10.0, w: 100.0, h: 1.0 }).collect();
        let boxes = cluster_table_rects(&rects);
        assert_eq!(boxes.len(), 1);
    }

    #[test]
    fn few_rects_do_not_form_a_table() {
        let rects = vec![Rect { x: 0.0, y: 0.0, w: 10.0, h: 10.0 }];
        assert!(cluster_table_rects(&rects).is_empty());
    }
}
