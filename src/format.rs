//! Result files and debug document dumps.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::{debug, info};

use docload_core::{codec, Value};

/// Truncation width for debug document dumps
const DEBUG_TRUNCATE: usize = 64;

/// Write a document to `<dst>/<doc_id>.json`, UTF-8, 4-space indent.
///
/// Keys come out sorted because document objects are ordered maps all the
/// way down.
pub fn save_json_doc(dst: &Path, doc_id: &str, doc: &Value) -> Result<()> {
    let path = dst.join(format!("{doc_id}.json"));
    let json = serde_json::Value::from(doc.clone());

    let file =
        File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let mut ser = Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    json.serialize(&mut ser)
        .with_context(|| format!("writing {}", path.display()))?;
    writer.flush()?;

    info!(
        "document with doc_id={doc_id} was written into {} file.",
        path.display()
    );
    Ok(())
}

/// In debug mode, log the document with long values truncated.
pub fn log_debug_doc(debug_mode: bool, doc: &Value) {
    if !debug_mode {
        return;
    }
    let mut display = doc.clone();
    codec::deep_truncate(&mut display, DEBUG_TRUNCATE);
    let json = serde_json::Value::from(display);
    let pretty = serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string());
    debug!("\n{pretty}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_json_doc_layout() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Value::from(serde_json::json!({
            "zeta": 1,
            "alpha": {"nested": true}
        }));
        save_json_doc(dir.path(), "13901", &doc).unwrap();

        let written = std::fs::read_to_string(dir.path().join("13901.json")).unwrap();
        // 4-space indent, sorted keys
        assert!(written.starts_with("{\n    \"alpha\""));
        assert!(written.contains("\n        \"nested\": true"));
        let alpha = written.find("alpha").unwrap();
        let zeta = written.find("zeta").unwrap();
        assert!(alpha < zeta);
    }
}
