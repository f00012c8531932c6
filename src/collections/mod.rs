//! # Descriptor discovery
//!
//! Each `.json` or `.toml` file under the tests directory holds one endpoint
//! descriptor. Files are visited recursively in path order so the execution
//! order of a run never depends on the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::error::SchemaError;
use crate::testing::EndpointDescriptor;

/// A descriptor together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedDescriptor {
    pub path: PathBuf,
    pub descriptor: EndpointDescriptor,
}

/// Everything found under a tests directory.
#[derive(Debug, Default)]
pub struct Collection {
    pub descriptors: Vec<LoadedDescriptor>,
    pub errors: Vec<SchemaError>,
}

impl Collection {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Keep only descriptors whose uri contains `pattern`.
    pub fn retain_matching(&mut self, pattern: &str) {
        self.descriptors
            .retain(|loaded| loaded.descriptor.uri.contains(pattern));
    }

    pub fn into_descriptors(self) -> Vec<EndpointDescriptor> {
        self.descriptors.into_iter().map(|d| d.descriptor).collect()
    }
}

/// Load every descriptor below `dir`. Malformed files are collected as
/// errors rather than stopping discovery, so they can all be reported at once.
pub fn discover(dir: &Path) -> Result<Collection, SchemaError> {
    if !dir.is_dir() {
        return Err(SchemaError::new(dir, "tests directory does not exist"));
    }

    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    let mut collection = Collection::default();
    for path in files {
        match load_file(&path) {
            Ok(descriptor) => {
                debug!(path = %path.display(), uri = %descriptor.uri, "loaded descriptor");
                collection.descriptors.push(LoadedDescriptor { path, descriptor });
            }
            Err(err) => {
                error!(error = %err, "invalid descriptor");
                collection.errors.push(err);
            }
        }
    }

    Ok(collection)
}

/// Parse and check one descriptor file.
pub fn load_file(path: &Path) -> Result<EndpointDescriptor, SchemaError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| SchemaError::new(path, format!("failed to read file: {e}")))?;

    let descriptor: EndpointDescriptor = match extension(path) {
        Some(DescriptorFormat::Json) => serde_json::from_str(&raw)
            .map_err(|e| SchemaError::new(path, format!("invalid descriptor: {e}")))?,
        Some(DescriptorFormat::Toml) => toml::from_str(&raw)
            .map_err(|e| SchemaError::new(path, format!("invalid descriptor: {e}")))?,
        None => return Err(SchemaError::new(path, "unsupported descriptor format")),
    };

    let problems = descriptor.problems();
    if !problems.is_empty() {
        return Err(SchemaError::new(path, problems.join("; ")));
    }

    Ok(descriptor)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DescriptorFormat {
    Json,
    Toml,
}

fn extension(path: &Path) -> Option<DescriptorFormat> {
    match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
        "json" => Some(DescriptorFormat::Json),
        "toml" => Some(DescriptorFormat::Toml),
        _ => None,
    }
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), SchemaError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| SchemaError::new(dir, format!("failed to read directory: {e}")))?;

    for entry in entries {
        let path = entry
            .map_err(|e| SchemaError::new(dir, format!("failed to read directory entry: {e}")))?
            .path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if extension(&path).is_some() {
            files.push(path);
        }
    }

    Ok(())
}
