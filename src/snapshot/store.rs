//! Persisted form of a snapshot.
//!
//! A directory is a YAML mapping keyed by `"<type code>/<name>"`. `D` entries
//! hold the nested directory mapping, `F` entries a `{size, mtime}` mapping.
//! The root is always a directory. `Absent` nodes are never written.

use std::borrow::Cow;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml, YamlEmitter};
use snafu::prelude::*;
use tempfile::Builder;
use tracing::{debug, info};

use crate::ext::PathExt;
use crate::snapshot::SnapshotNode;

const FILE_CODE: &str = "F";
const DIRECTORY_CODE: &str = "D";
const SIZE_KEY: &str = "size";
const MTIME_KEY: &str = "mtime";

fn key(text: &str) -> Yaml<'static> {
    Yaml::Value(Scalar::String(Cow::Owned(text.to_owned())))
}

/// Renders `root` (a directory) as the persisted document, trailing newline
/// included.
pub fn to_document(root: &SnapshotNode) -> Result<String, SnapshotStoreError> {
    let yaml = to_yaml(root)?;
    let mut out = String::new();
    YamlEmitter::new(&mut out)
        .dump(&yaml)
        .map_err(|err| SnapshotStoreError::EmitError {
            message: format!("{err:?}"),
        })?;
    out.push('\n');
    Ok(out)
}

fn to_yaml(node: &SnapshotNode) -> Result<Yaml<'static>, SnapshotStoreError> {
    match node {
        SnapshotNode::File { size, mtime } => {
            let size = i64::try_from(*size).context(SizeOverflowSnafu { size: *size })?;
            let mut attributes = LinkedHashMap::new();
            attributes.insert(key(SIZE_KEY), Yaml::Value(Scalar::Integer(size)));
            attributes.insert(key(MTIME_KEY), Yaml::Value(Scalar::Integer(*mtime)));
            Ok(Yaml::Mapping(attributes))
        }
        SnapshotNode::Directory { children } => {
            let mut mapping = LinkedHashMap::new();
            for (name, child) in children {
                let code = match child {
                    SnapshotNode::File { .. } => FILE_CODE,
                    SnapshotNode::Directory { .. } => DIRECTORY_CODE,
                    SnapshotNode::Absent => continue,
                };
                mapping.insert(key(&format!("{code}/{name}")), to_yaml(child)?);
            }
            Ok(Yaml::Mapping(mapping))
        }
        SnapshotNode::Absent => Ok(Yaml::Mapping(LinkedHashMap::new())),
    }
}

/// Parses a persisted document back into a root directory node.
pub fn from_document(contents: &str) -> Result<SnapshotNode, SnapshotStoreError> {
    let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
    let document = documents
        .first()
        .ok_or(SnapshotStoreError::MalformedSnapshot)?;
    directory_from_yaml(document, "")
}

fn directory_from_yaml(yaml: &Yaml, location: &str) -> Result<SnapshotNode, SnapshotStoreError> {
    let mapping = yaml.as_mapping().context(NotAMappingSnafu {
        location: display_location(location),
    })?;

    let mut children = LinkedHashMap::new();
    for (raw_key, value) in mapping {
        let Yaml::Value(Scalar::String(raw_key)) = raw_key else {
            return InvalidKeySnafu {
                location: display_location(location),
                key: format!("{raw_key:?}"),
            }
            .fail();
        };
        let (code, name) = raw_key.split_once('/').context(InvalidKeySnafu {
            location: display_location(location),
            key: raw_key.to_string(),
        })?;
        let child_location = format!("{location}/{name}");

        let child = match code {
            FILE_CODE => file_from_yaml(value, &child_location)?,
            DIRECTORY_CODE => directory_from_yaml(value, &child_location)?,
            _ => {
                return UnknownTypeCodeSnafu {
                    location: child_location,
                    code,
                }
                .fail();
            }
        };
        children.insert(name.to_owned(), child);
    }
    Ok(SnapshotNode::Directory { children })
}

fn file_from_yaml(yaml: &Yaml, location: &str) -> Result<SnapshotNode, SnapshotStoreError> {
    let attributes = yaml.as_mapping().context(NotAMappingSnafu { location })?;
    let attribute = |name: &'static str| match attributes.get(&key(name)) {
        Some(Yaml::Value(Scalar::Integer(value))) => Ok(*value),
        _ => MissingAttributeSnafu { location, name }.fail(),
    };

    let size = attribute(SIZE_KEY)?;
    let mtime = attribute(MTIME_KEY)?;
    let size = u64::try_from(size)
        .ok()
        .context(MissingAttributeSnafu {
            location,
            name: SIZE_KEY,
        })?;
    Ok(SnapshotNode::file(size, mtime))
}

fn display_location(location: &str) -> String {
    if location.is_empty() {
        "/".to_owned()
    } else {
        location.to_owned()
    }
}

/// Loads the snapshot at `path`, or `None` when there is no such file.
pub async fn read(path: &Path) -> Result<Option<SnapshotNode>, SnapshotStoreError> {
    debug!("Reading snapshot from {}", path.best_effort_path_display());
    let bytes = match compio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!("No existing snapshot found, starting fresh");
            return Ok(None);
        }
        Err(err) => {
            return Err(err).context(ReadSnafu {
                file_path: path.best_effort_path_display(),
            });
        }
    };

    let contents = String::from_utf8(bytes).context(Utf8Snafu {
        file_path: path.best_effort_path_display(),
    })?;
    let root = from_document(&contents)?;
    debug!("Loaded snapshot with {} entries", root.count_recursive() - 1);
    Ok(Some(root))
}

/// Atomically replaces `path` with `root`.
///
/// The document goes to a temporary file next to `path`, is synced, then
/// renamed over `path`. On any failure before the rename the temporary file
/// is removed and `path` is left untouched.
pub fn write(path: &Path, root: &SnapshotNode) -> Result<(), SnapshotStoreError> {
    let document = to_document(root)?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&directory).context(CreateDirSnafu {
        directory: directory.best_effort_path_display(),
    })?;

    let write_context = || WriteSnafu {
        file_path: path.best_effort_path_display(),
    };
    let mut temp = Builder::new()
        .prefix(&format!(".{}.", path.file_name_lossy()))
        .suffix(".tmp")
        .tempfile_in(&directory)
        .with_context(|_| write_context())?;
    temp.write_all(document.as_bytes())
        .with_context(|_| write_context())?;
    temp.flush().with_context(|_| write_context())?;
    temp.as_file()
        .sync_all()
        .with_context(|_| write_context())?;

    temp.persist(path)
        .map_err(|err| err.error)
        .context(PersistSnafu {
            file_path: path.best_effort_path_display(),
        })?;
    debug!(
        "Saved snapshot with {} entries to {}",
        root.count_recursive() - 1,
        path.best_effort_path_display()
    );
    Ok(())
}

#[derive(Debug, Snafu)]
pub enum SnapshotStoreError {
    #[snafu(display("Failed to read the snapshot file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("The snapshot file {} is not valid UTF-8", file_path))]
    Utf8Error {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the snapshot file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted snapshot file"))]
    MalformedSnapshot,
    #[snafu(display("Snapshot entry {} should be a map", location))]
    NotAMapping { location: String },
    #[snafu(display("Snapshot entry {} has an invalid key {}", location, key))]
    InvalidKey { location: String, key: String },
    #[snafu(display("Snapshot entry {} has unknown type code '{}'", location, code))]
    UnknownTypeCode { location: String, code: String },
    #[snafu(display("Snapshot file {} lacks a valid '{}' attribute", location, name))]
    MissingAttribute { location: String, name: String },
    #[snafu(display("File size {} cannot be persisted", size))]
    SizeOverflow {
        size: u64,
        source: std::num::TryFromIntError,
    },
    #[snafu(display("Failed to render the snapshot: {}", message))]
    EmitError { message: String },
    #[snafu(display("Failed to create snapshot directory {}", directory))]
    CreateDirError {
        directory: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to write the snapshot file: {}", file_path))]
    WriteError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to move the new snapshot into place: {}", file_path))]
    PersistError {
        file_path: String,
        source: std::io::Error,
    },
}
