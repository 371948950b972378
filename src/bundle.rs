use crate::export::{Artifact, ExportSnapshot};
use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const SNAPSHOT_ENTRY: &str = "snapshot.json";
pub const BUNDLE_FORMAT_V1: &str = "classroom-results-v1";

#[derive(Debug, Clone)]
pub struct BundleSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub entries: Vec<String>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Writes a results bundle: manifest, the snapshot as JSON, and every
/// rendered artifact. The manifest records a digest per entry.
pub fn export_results_bundle(
    snapshot: &ExportSnapshot,
    artifacts: &[Artifact],
    out_path: &Path,
) -> anyhow::Result<BundleSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let snapshot_bytes =
        serde_json::to_vec_pretty(snapshot).context("failed to serialize snapshot")?;
    let mut payload: Vec<(String, &[u8])> =
        vec![(SNAPSHOT_ENTRY.to_string(), snapshot_bytes.as_slice())];
    for a in artifacts {
        if a.file_name == MANIFEST_ENTRY || a.file_name == SNAPSHOT_ENTRY {
            return Err(anyhow!("artifact name collides with {}", a.file_name));
        }
        payload.push((a.file_name.clone(), a.bytes.as_slice()));
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let entries: Vec<serde_json::Value> = payload
        .iter()
        .map(|(name, bytes)| {
            json!({
                "name": name,
                "size": bytes.len(),
                "sha256": sha256_hex(bytes),
            })
        })
        .collect();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "classId": snapshot.class.id,
        "examName": snapshot.exam_name,
        "entries": entries,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    for (name, bytes) in &payload {
        zip.start_file(name.as_str(), opts)
            .with_context(|| format!("failed to start entry {}", name))?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write entry {}", name))?;
    }

    zip.finish().context("failed to finalize zip bundle")?;

    tracing::info!(
        path = %out_path.to_string_lossy(),
        entries = payload.len() + 1,
        "results bundle written"
    );
    Ok(BundleSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: payload.len() + 1,
        entries: std::iter::once(MANIFEST_ENTRY.to_string())
            .chain(payload.iter().map(|(n, _)| n.clone()))
            .collect(),
    })
}

/// Re-reads a bundle and checks every manifest digest against its entry.
pub fn verify_results_bundle(in_path: &Path) -> anyhow::Result<BundleSummary> {
    if !is_zip_file(in_path)? {
        return Err(anyhow!("not a zip bundle: {}", in_path.to_string_lossy()));
    }
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let listed = manifest
        .get("entries")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("manifest has no entries"))?;
    let mut names = vec![MANIFEST_ENTRY.to_string()];
    for e in listed {
        let name = e
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("manifest entry without name"))?;
        let expected = e.get("sha256").and_then(|v| v.as_str()).unwrap_or("");
        let mut bytes = Vec::new();
        archive
            .by_name(name)
            .with_context(|| format!("bundle missing {}", name))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read {}", name))?;
        if sha256_hex(&bytes) != expected {
            return Err(anyhow!("digest mismatch for {}", name));
        }
        names.push(name.to_string());
    }

    Ok(BundleSummary {
        bundle_format: format.to_string(),
        entry_count: names.len(),
        entries: names,
    })
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::sample_snapshot;
    use crate::export::{ExportFormat, Renderer, SpreadsheetRenderer};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("{}-{}", prefix, nanos));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn bundle_round_trips_through_verify() {
        let dir = temp_dir("classroomd-bundle");
        let snap = sample_snapshot();
        let csv = SpreadsheetRenderer
            .render(&snap, ExportFormat::Spreadsheet)
            .expect("csv");
        let out = dir.join("out").join("results.zip");
        let written = export_results_bundle(&snap, &[csv], &out).expect("export");
        assert_eq!(written.entry_count, 3);

        let checked = verify_results_bundle(&out).expect("verify");
        assert_eq!(checked.entries, written.entries);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn verify_rejects_non_zip_files() {
        let dir = temp_dir("classroomd-bundle-bad");
        let path = dir.join("x.zip");
        std::fs::write(&path, b"hello").expect("write");
        assert!(verify_results_bundle(&path).is_err());
        let _ = std::fs::remove_dir_all(dir);
    }
}
