//! Constants used throughout the high-resolution conversion core.
//!
//! Report wording lives here so the classifier, converter and report stay
//! consistent with one another and with the presentation layer.

/// DICOM types that cannot be converted when no override is configured.
pub const DEFAULT_UNSUPPORTED_DICOM_TYPES: [&str; 2] = ["SUPPORT", "MARKER"];

/// Id substring marking ETD structures under the `exclude-derived` policy.
pub const ETD_ID_MARKER: &str = "ETD";

/// Id substring marking zOrig structures under the `exclude-derived` policy.
pub const ZORIG_ID_MARKER: &str = "zOrig";

/// Fixed warning shown by the confirmation gate.
pub const CANNOT_BE_UNDONE_WARNING: &str = "This operation cannot be undone.";

/// Report line suffix for a structure that converted successfully.
pub const CONVERTED_SUFFIX: &str = "Successfully converted";

/// Report line prefix for a structure whose conversion failed.
pub const FAILED_PREFIX: &str = "FAILED - ";

/// Report title used when no structure was eligible.
pub const NOTHING_TO_CONVERT_TITLE: &str = "No structures need conversion:";

/// Report title used after a batch has run.
pub const CONVERSION_COMPLETE_TITLE: &str = "Conversion complete:";
