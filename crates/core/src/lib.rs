//! # HiRes Core
//!
//! Core logic for converting a structure set's structures to high resolution.
//!
//! This crate contains the decision logic and failure handling only:
//! - Eligibility classification through an ordered rule table (`classify`)
//! - Sequential, fault-isolated batch conversion (`batch`)
//! - Ordered report assembly (`report`)
//! - The confirm-then-convert workflow wiring them together (`workflow`)
//!
//! **No host concerns**: loading structure sets, asking the user, rendering progress and showing
//! reports belong to the caller, which plugs in through the `StructureDocument`,
//! `ConfirmationGate`, `ProgressObserver` and `ReportSink` traits.

pub mod batch;
pub mod classify;
pub mod config;
pub mod constants;
pub mod error;
pub mod report;
pub mod structure;
pub mod workflow;

pub use batch::{BatchConverter, BatchProgress, NoProgress, ProgressObserver};
pub use classify::{Classification, ClassificationOutcome, RuleSet, SkipReason, SkippedStructure};
pub use config::{CoreConfig, IdPolicy};
pub use error::{ConversionFault, HiResError, HiResResult, HostError};
pub use report::{BatchReport, ConversionRecord, ConversionStatus, ReportTitle};
pub use structure::{Structure, StructureDocument};
pub use workflow::{
    ConfirmationGate, ConfirmationRequest, HighResWorkflow, ReportSink, WorkflowOutcome,
};
