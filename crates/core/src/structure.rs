//! Structure snapshots and the handle for the host's structure set.

use crate::error::{ConversionFault, HostError};
use serde::{Deserialize, Serialize};

/// Read-only snapshot of one structure's attributes.
///
/// Every attribute other than `id` is optional: a host read that returns nothing is kept as
/// `None` and resolved by the classifier to the nearest ineligible outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub id: String,
    #[serde(default)]
    pub is_high_resolution: Option<bool>,
    #[serde(default)]
    pub is_approved: Option<bool>,
    #[serde(default)]
    pub can_convert: Option<bool>,
    #[serde(default)]
    pub dicom_type: Option<String>,
}

impl Structure {
    /// Snapshot of a fully readable structure.
    pub fn new(
        id: impl Into<String>,
        is_high_resolution: bool,
        is_approved: bool,
        can_convert: bool,
        dicom_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            is_high_resolution: Some(is_high_resolution),
            is_approved: Some(is_approved),
            can_convert: Some(can_convert),
            dicom_type: Some(dicom_type.into()),
        }
    }
}

/// Handle to the host's structure set.
///
/// The workflow borrows the document for the duration of one run and is the only writer while
/// it does.
pub trait StructureDocument {
    /// Snapshot of every structure, in document order.
    fn structures(&self) -> Vec<Structure>;

    /// Tells the host that modifications are about to be made.
    fn begin_modifications(&mut self) -> Result<(), HostError>;

    /// Converts one structure to high resolution. Irreversible on success.
    fn convert_to_high_resolution(&mut self, structure: &Structure) -> Result<(), ConversionFault>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_attributes_deserialize_as_none() {
        let structure: Structure = serde_json::from_str(r#"{"id": "BODY"}"#).unwrap();
        assert_eq!(structure.id, "BODY");
        assert_eq!(structure.is_high_resolution, None);
        assert_eq!(structure.is_approved, None);
        assert_eq!(structure.can_convert, None);
        assert_eq!(structure.dicom_type, None);
    }

    #[test]
    fn document_trait_is_object_safe() {
        fn _assert_document(_: &dyn StructureDocument) {}
    }
}
