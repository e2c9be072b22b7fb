//! File-backed structure set.
//!
//! A structure set is stored as YAML (`.yaml`/`.yml`) or JSON (`.json`):
//!
//! ```yaml
//! structures:
//!   - id: PTV_70
//!     is_high_resolution: false
//!     is_approved: false
//!     can_convert: true
//!     dicom_type: PTV
//!   - id: Rectum
//!     is_high_resolution: false
//!     is_approved: false
//!     can_convert: true
//!     dicom_type: ORGAN
//!     conversion_fault: contour self-intersects on slice 42
//! ```
//!
//! `conversion_fault` is the error the host raises when asked to convert that structure.
//! Conversions are applied in memory and written back with [`FileDocument::save`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use hires_core::{ConversionFault, HostError, Structure, StructureDocument};
use hires_types::NonEmptyText;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("unsupported document extension for {path} (expected .yaml, .yml or .json)", path = .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("failed to read structure set: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write structure set: {0}")]
    FileWrite(std::io::Error),
    #[error("invalid YAML structure set: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON structure set: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    fn from_path(path: &Path) -> DocumentResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(DocumentFormat::Yaml),
            Some("json") => Ok(DocumentFormat::Json),
            _ => Err(DocumentError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StructureSetFile {
    #[serde(default)]
    structures: Vec<StructureEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StructureEntry {
    id: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_high_resolution: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_approved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    can_convert: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dicom_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    conversion_fault: Option<String>,
}

impl StructureEntry {
    fn snapshot(&self) -> Structure {
        Structure {
            id: self.id.to_string(),
            is_high_resolution: self.is_high_resolution,
            is_approved: self.is_approved,
            can_convert: self.can_convert,
            dicom_type: self.dicom_type.clone(),
        }
    }
}

/// Structure set loaded from a file on disk.
#[derive(Debug)]
pub struct FileDocument {
    path: PathBuf,
    format: DocumentFormat,
    contents: StructureSetFile,
    modifying: bool,
    /// Entry positions already handed to a conversion attempt.
    attempted: HashSet<usize>,
    dirty: bool,
}

impl FileDocument {
    /// Loads the structure set at `path`.
    ///
    /// Returns `Ok(None)` if no file exists there, so the caller can report that no structure
    /// set is available.
    pub fn open(path: &Path) -> DocumentResult<Option<Self>> {
        let format = DocumentFormat::from_path(path)?;
        if !path.is_file() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path).map_err(DocumentError::FileRead)?;
        let contents = match format {
            DocumentFormat::Yaml => serde_yaml::from_str(&raw)?,
            DocumentFormat::Json => serde_json::from_str(&raw)?,
        };

        Ok(Some(Self {
            path: path.to_path_buf(),
            format,
            contents,
            modifying: false,
            attempted: HashSet::new(),
            dirty: false,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether any structure has been converted since loading.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Writes converted state back to the file. No-op when nothing changed.
    pub fn save(&mut self) -> DocumentResult<()> {
        if !self.dirty {
            return Ok(());
        }

        let serialized = match self.format {
            DocumentFormat::Yaml => serde_yaml::to_string(&self.contents)?,
            DocumentFormat::Json => serde_json::to_string_pretty(&self.contents)?,
        };
        std::fs::write(&self.path, serialized).map_err(DocumentError::FileWrite)?;
        self.dirty = false;

        tracing::info!(path = %self.path.display(), "saved structure set");
        Ok(())
    }
}

impl StructureDocument for FileDocument {
    fn structures(&self) -> Vec<Structure> {
        self.contents
            .structures
            .iter()
            .map(StructureEntry::snapshot)
            .collect()
    }

    fn begin_modifications(&mut self) -> Result<(), HostError> {
        let metadata = std::fs::metadata(&self.path).map_err(|e| {
            HostError::new(format!(
                "cannot open {} for modification: {e}",
                self.path.display()
            ))
        })?;
        if metadata.permissions().readonly() {
            return Err(HostError::new(format!(
                "{} is read-only",
                self.path.display()
            )));
        }

        self.modifying = true;
        Ok(())
    }

    fn convert_to_high_resolution(&mut self, structure: &Structure) -> Result<(), ConversionFault> {
        if !self.modifying {
            return Err(ConversionFault::new("modifications have not been started"));
        }

        // Ids need not be unique: match the whole snapshot, and never the same entry twice.
        let attempted = &self.attempted;
        let (position, entry) = self
            .contents
            .structures
            .iter_mut()
            .enumerate()
            .find(|(i, e)| !attempted.contains(i) && e.snapshot() == *structure)
            .ok_or_else(|| ConversionFault::new("structure not found in structure set"))?;
        self.attempted.insert(position);

        if let Some(fault) = &entry.conversion_fault {
            return Err(ConversionFault::new(fault.clone()));
        }

        entry.is_high_resolution = Some(true);
        self.dirty = true;
        Ok(())
    }
}
