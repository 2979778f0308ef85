//! Hypertext (.html/.htm) extractor (SPEC_FULL §4.1).

use std::collections::HashSet;
use std::path::Path;

use ingest_core::Block;
use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractError;
use crate::table::rows_to_markdown;

const SKIP_TAGS: &[&str] = &["script", "style", "nav", "footer", "header", "aside", "noscript", "meta", "link"];

pub fn extract(path: &Path) -> Result<Vec<Block>, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::InputNotFound(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path)?;
    let document = Html::parse_document(&raw);
    let root = content_root(&document);

    let mut seen = HashSet::new();
    let mut blocks = Vec::new();
    walk(root, &mut blocks, &mut seen);

    if blocks.is_empty() {
        return Err(ExtractError::ExtractEmpty(path.to_path_buf()));
    }
    Ok(blocks)
}

fn content_root(document: &Html) -> ElementRef<'_> {
    for sel_str in ["main", "article", "body"] {
        if let Some(sel) = Selector::parse(sel_str).ok()
            && let Some(el) = document.select(&sel).next()
        {
            return el;
        }
    }
    document.root_element()
}

fn walk(element: ElementRef, blocks: &mut Vec<Block>, seen: &mut HashSet<String>) {
    for child in element.children() {
        let Some(child_el) = ElementRef::wrap(child) else { continue };
        let tag = child_el.value().name().to_lowercase();
        if SKIP_TAGS.contains(&tag.as_str()) {
            continue;
        }

        if let Some(level) = heading_level(&tag) {
            push_unique(blocks, seen, text_of(child_el).map(|t| Block::heading(level, t)));
            continue;
        }

        match tag.as_str() {
            "table" => {
                let (md, rows, cols) = table_to_markdown(child_el);
                if !md.trim().is_empty() && seen.insert(md.clone()) {
                    blocks.push(Block::table(md, rows, cols, None));
                }
            }
            "ul" | "ol" => {
                for item in list_items(child_el) {
                    if seen.insert(item.clone()) {
                        blocks.push(Block::list_item(item));
                    }
                }
            }
            "pre" => push_unique(blocks, seen, code_block(child_el)),
            "p" => push_unique(blocks, seen, text_of(child_el).map(Block::paragraph)),
            _ => walk(child_el, blocks, seen),
        }
    }
}

fn push_unique(blocks: &mut Vec<Block>, seen: &mut HashSet<String>, block: Option<Block>) {
    if let Some(block) = block
        && seen.insert(block.text.clone())
    {
        blocks.push(block);
    }
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn text_of(element: ElementRef) -> Option<String> {
    let text = collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "));
    (!text.is_empty()).then_some(text)
}

fn list_items(list_el: ElementRef) -> Vec<String> {
    list_el
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name().eq_ignore_ascii_case("li"))
        .filter_map(text_of)
        .collect()
}

fn code_block(pre_el: ElementRef) -> Option<Block> {
    let code_el = Selector::parse("code").ok().and_then(|sel| pre_el.select(&sel).next());
    let text = match code_el {
        Some(c) => c.text().collect::<Vec<_>>().join(""),
        None => pre_el.text().collect::<Vec<_>>().join(""),
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        return None;
    }
    let language = code_el.and_then(|c| c.value().attr("class")).and_then(|classes| {
        classes
            .split_whitespace()
            .find_map(|cls| cls.strip_prefix("language-").or_else(|| cls.strip_prefix("lang-")).map(String::from))
    });
    Some(Block::code(text, language))
}

fn table_to_markdown(table_el: ElementRef) -> (String, usize, usize) {
    let Some(tr_sel) = Selector::parse("tr").ok() else { return (String::new(), 0, 0) };
    let Some(cell_sel) = Selector::parse("th, td").ok() else { return (String::new(), 0, 0) };

    let grid: Vec<Vec<String>> = table_el
        .select(&tr_sel)
        .map(|tr| tr.select(&cell_sel).map(|cell| collapse_whitespace(&cell.text().collect::<Vec<_>>().join(" "))).collect())
        .filter(|row: &Vec<String>| !row.is_empty())
        .collect();

    rows_to_markdown(&grid)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn blocks_of(html: &str) -> Vec<Block> {
        let document = Html::parse_document(html);
        let root = content_root(&document);
        let mut seen = HashSet::new();
        let mut blocks = Vec::new();
        walk(root, &mut blocks, &mut seen);
        blocks
    }

    #[test]
    fn extracts_headings_paragraphs_and_skips_nav() {
        let html = r#"<html><body>
            <nav>skip me</nav>
            <h1>Title</h1>
            <p>Body text.</p>
        </body></html>"#;
        let blocks = blocks_of(html);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].heading_level(), Some(1));
        assert_eq!(blocks[1].text, "Body text.");
    }

    #[test]
    fn converts_table_with_thead_and_tbody() {
        let html = r#"<html><body><table>
            <thead><tr><th>a</th><th>b</th></tr></thead>
            <tbody><tr><td>1</td><td>2</td></tr></tbody>
        </table></body></html>"#;
        let blocks = blocks_of(html);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].is_table());
        assert!(blocks[0].text.starts_with("| a | b |"));
    }

    #[test]
    fn one_list_block_per_item() {
        let html = r#"<html><body><ul><li>one</li><li>two</li></ul></body></html>"#;
        let blocks = blocks_of(html);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "one");
        assert_eq!(blocks[1].text, "two");
    }

    #[test]
    fn code_block_parses_language_class() {
        let html = r#"<html><body><pre><code class="language-rust">fn main() {}</code></pre></body></html>"#;
        let blocks = blocks_of(html);
        assert_eq!(blocks.len(), 1);
        match &blocks[0].kind {
            ingest_core::BlockKind::Code { language } => assert_eq!(language.as_deref(), Some("rust")),
            _ => panic!("expected code block"),
        }
    }

    #[test]
    fn duplicate_text_across_nested_containers_is_deduped() {
        let html = r#"<html><body><div><p>same</p></div><p>same</p></body></html>"#;
        let blocks = blocks_of(html);
        assert_eq!(blocks.len(), 1);
    }
}
