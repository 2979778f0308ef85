//! Best-effort extracted-block artifact snapshot (§4.6 "Artifact writing").
//!
//! Writing the artifact happens after the persistence transaction commits
//! and never fails the run: a write failure here is logged and swallowed,
//! matching the source pipeline's `_save_artifact` behavior.

use std::path::Path;

use ingest_core::Block;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ArtifactBlock<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
    meta: serde_json::Value,
}

fn block_kind_str(block: &Block) -> &'static str {
    use ingest_core::BlockKind;
    match block.kind {
        BlockKind::Heading { .. } => "heading",
        BlockKind::Paragraph => "paragraph",
        BlockKind::List => "list",
        BlockKind::Table { .. } => "table",
        BlockKind::Code { .. } => "code",
    }
}

fn block_meta(block: &Block) -> serde_json::Value {
    serde_json::to_value(&block.kind).unwrap_or(serde_json::Value::Null)
}

/// Render `blocks` as the JSON array artifact shape: `[{type, text, meta}]`.
fn to_artifact_json(blocks: &[Block]) -> serde_json::Result<String> {
    let rows: Vec<ArtifactBlock<'_>> = blocks
        .iter()
        .map(|b| ArtifactBlock { kind: block_kind_str(b), text: b.text.as_str(), meta: block_meta(b) })
        .collect();
    serde_json::to_string_pretty(&rows)
}

/// Write `blocks` to `{artifact_base}/{tenant}/{doc_id}/{version_label}.json`,
/// returning its `file://` URI on success and `None` on any failure — this
/// is explicitly best-effort, never a reason to fail the run.
pub fn save(
    artifact_base: &Path,
    tenant: &str,
    doc_id: &str,
    version_label: &str,
    blocks: &[Block],
) -> Option<String> {
    let dir = artifact_base.join(tenant).join(doc_id);
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(error = %e, dir = %dir.display(), "failed to create artifact directory");
        return None;
    }

    let path = dir.join(format!("{version_label}.json"));
    let json = match to_artifact_json(blocks) {
        Ok(j) => j,
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize artifact");
            return None;
        }
    };

    if let Err(e) = std::fs::write(&path, json) {
        tracing::warn!(error = %e, path = %path.display(), "failed to write artifact");
        return None;
    }

    let uri = format!("file://{}", path.display());
    tracing::info!(uri = uri.as_str(), "saved artifact");
    Some(uri)
}

#[cfg(test)]
mod tests {
    use ingest_core::Block;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn saves_artifact_and_returns_its_uri() {
        let tmp = TempDir::new().unwrap();
        let blocks = vec![Block::heading(1, "Intro"), Block::paragraph("hello world")];

        let uri = save(tmp.path(), "t1", "doc-1", "v1", &blocks).unwrap();
        assert!(uri.starts_with("file://"));

        let path = tmp.path().join("t1").join("doc-1").join("v1.json");
        assert!(path.exists());
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.contains("\"heading\""));
        assert!(contents.contains("hello world"));
    }
}
