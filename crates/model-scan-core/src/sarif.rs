//! SARIF export.
//!
//! The service reports artifact locations using whatever scheme the model
//! came from (`https://`, `s3://`, bare paths). Code scanning UIs only resolve
//! `file://` locations, so every artifact URI is rewritten before writing.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};
use url::{Position, Url};

use crate::error::{Result, TaskError};

const ARTIFACT_URI_POINTER: &str = "/physicalLocation/artifactLocation/uri";

/// `file://` form of a single artifact URI. Never fails.
pub fn portable_uri(original: &str) -> String {
    match Url::parse(original) {
        Ok(url) if url.scheme() == "file" => original.to_string(),
        // swap only the scheme; authority, path, query and fragment stay
        Ok(url) => format!("file{}", &url[Position::AfterScheme..]),
        Err(_) => format!("file://{original}"),
    }
}

/// Rewrite every `runs[].results[].locations[]` artifact URI in place.
/// Returns the number of URIs rewritten.
pub fn make_portable(doc: &mut Value) -> usize {
    let mut rewritten = 0;
    let Some(runs) = doc.get_mut("runs").and_then(Value::as_array_mut) else {
        return 0;
    };
    for run in runs {
        let Some(results) = run.get_mut("results").and_then(Value::as_array_mut) else {
            continue;
        };
        for result in results {
            let Some(locations) = result.get_mut("locations").and_then(Value::as_array_mut) else {
                continue;
            };
            for location in locations {
                let Some(uri) = location.pointer_mut(ARTIFACT_URI_POINTER) else {
                    continue;
                };
                let Some(original) = uri.as_str().filter(|s| !s.is_empty()) else {
                    continue;
                };
                let portable = portable_uri(original);
                *uri = Value::String(portable);
                rewritten += 1;
            }
        }
    }
    rewritten
}

/// Parse the raw document, normalise it and write it to `dest` as JSON.
pub fn export(raw: &str, dest: &Path) -> Result<usize> {
    let mut doc: Value = serde_json::from_str(raw)?;
    let rewritten = make_portable(&mut doc);
    let json = serde_json::to_string(&doc)?;
    fs::write(dest, json).map_err(|e| TaskError::fs(dest, e))?;
    info!(path = %dest.display(), locations = rewritten, "wrote SARIF results");
    Ok(rewritten)
}

/// Make sure the SARIF file can be written before any scan starts.
///
/// Creates missing parent directories, or checks an existing parent for
/// write access. Returns the absolute destination path.
pub fn prepare_destination(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| destination_error(path, e))?
            .join(path)
    };
    let parent = absolute.parent().unwrap_or(Path::new("/"));

    if !parent.exists() {
        debug!(dir = %parent.display(), "creating SARIF output directory");
        fs::create_dir_all(parent).map_err(|e| destination_error(&absolute, e))?;
    } else {
        check_writable(parent).map_err(|e| destination_error(&absolute, e))?;
    }
    Ok(absolute)
}

fn check_writable(dir: &Path) -> std::io::Result<()> {
    let marker = dir.join(format!(".model-scan-write-check-{}", std::process::id()));
    OpenOptions::new().write(true).create_new(true).open(&marker)?;
    fs::remove_file(&marker)
}

fn destination_error(path: &Path, source: std::io::Error) -> TaskError {
    TaskError::SarifDestination {
        path: path.to_path_buf(),
        source,
    }
}
