//! Packs attachments for delivery.
//!
//! The SMTP handler gzips each attachment on its own; the SendGrid handler
//! wraps each one in a zip archive so whole directories can travel too.

use crate::core::Attachment;
use crate::error::HandlerError;
use flate2::{Compression, GzBuilder};
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A compressed attachment ready to be placed in an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packed {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Gzips a single attachment as `<name>.gz`.
///
/// Returns `Ok(None)` when the attachment is skipped: the path does not exist
/// or is a directory.
pub fn gzip_attachment(attachment: &Attachment) -> Result<Option<Packed>, HandlerError> {
    let name = attachment.name();
    let contents = match attachment {
        Attachment::Text { contents, .. } => contents.as_bytes().to_vec(),
        Attachment::Path(path) => {
            if !path.exists() {
                warn!(path = %path.display(), "Attachment not found, skipping");
                return Ok(None);
            }
            if path.is_dir() {
                warn!(path = %path.display(), "Directories cannot be gzipped, skipping");
                return Ok(None);
            }
            fs::read(path).map_err(|source| attachment_error(path, source))?
        }
    };

    let bytes = gzip(&name, &contents).map_err(|source| attachment_error(&name, source))?;
    debug!(attachment = %name, size = bytes.len(), "Gzipped attachment");
    Ok(Some(Packed {
        filename: format!("{name}.gz"),
        bytes,
    }))
}

/// Wraps a single attachment in a zip archive named `<stem>.zip`.
///
/// Directories are archived recursively with paths relative to the directory.
/// Returns `Ok(None)` when the path does not exist.
pub fn zip_attachment(attachment: &Attachment) -> Result<Option<Packed>, HandlerError> {
    let name = attachment.name();
    let stem = Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.clone());

    let bytes = match attachment {
        Attachment::Text { contents, .. } => {
            zip_entries(vec![(name.clone(), contents.as_bytes().to_vec())])
                .map_err(|source| attachment_error(&name, source))?
        }
        Attachment::Path(path) => {
            if !path.exists() {
                warn!(path = %path.display(), "Attachment not found, skipping");
                return Ok(None);
            }
            let entries = if path.is_dir() {
                let mut entries = Vec::new();
                collect_dir(path, path, &mut entries)
                    .map_err(|source| attachment_error(path, source))?;
                entries
            } else {
                let contents = fs::read(path).map_err(|source| attachment_error(path, source))?;
                vec![(name.clone(), contents)]
            };
            zip_entries(entries).map_err(|source| attachment_error(path, source))?
        }
    };

    debug!(attachment = %name, size = bytes.len(), "Zipped attachment");
    Ok(Some(Packed {
        filename: format!("{stem}.zip"),
        bytes,
    }))
}

fn attachment_error(path: impl AsRef<Path>, source: io::Error) -> HandlerError {
    HandlerError::Attachment {
        path: path.as_ref().to_path_buf(),
        source,
    }
}

fn gzip(name: &str, contents: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzBuilder::new()
        .filename(name)
        .write(Vec::new(), Compression::default());
    encoder.write_all(contents)?;
    encoder.finish()
}

fn zip_entries(entries: Vec<(String, Vec<u8>)>) -> io::Result<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer.start_file(name, options).map_err(io::Error::other)?;
        writer.write_all(&contents)?;
    }
    let cursor = writer.finish().map_err(io::Error::other)?;
    Ok(cursor.into_inner())
}

/// Collects every file below `dir` as (relative path, contents), in a stable order.
fn collect_dir(root: &Path, dir: &Path, entries: &mut Vec<(String, Vec<u8>)>) -> io::Result<()> {
    let mut children: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<_>>()?;
    children.sort();

    for child in children {
        if child.is_dir() {
            collect_dir(root, &child, entries)?;
        } else {
            let relative = child
                .strip_prefix(root)
                .map_err(io::Error::other)?
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            entries.push((relative, fs::read(&child)?));
        }
    }
    Ok(())
}
