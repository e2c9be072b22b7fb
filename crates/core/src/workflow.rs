//! The classify, confirm, convert and report workflow.

use crate::batch::{BatchConverter, ProgressObserver};
use crate::classify::{Classification, RuleSet};
use crate::config::CoreConfig;
use crate::constants::CANNOT_BE_UNDONE_WARNING;
use crate::error::{HiResError, HiResResult, HostError};
use crate::report::{render_text, BatchReport, ReportTitle};
use crate::structure::{Structure, StructureDocument};

/// What the confirmation gate is asked to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    structure_ids: Vec<String>,
}

impl ConfirmationRequest {
    pub fn new(structure_ids: Vec<String>) -> Self {
        Self { structure_ids }
    }

    pub fn count(&self) -> usize {
        self.structure_ids.len()
    }

    pub fn structure_ids(&self) -> &[String] {
        &self.structure_ids
    }

    pub fn warning(&self) -> &'static str {
        CANNOT_BE_UNDONE_WARNING
    }

    /// Full prompt text: count, one id per line, then the warning.
    pub fn message(&self) -> String {
        format!(
            "{} structures will be converted to high resolution:\n\n{}\n\n{} Proceed?",
            self.count(),
            render_text(&self.structure_ids),
            self.warning()
        )
    }
}

/// Asks for a yes/no decision before anything is modified.
pub trait ConfirmationGate {
    /// `Ok(true)` only for an explicit yes.
    fn confirm(&mut self, request: &ConfirmationRequest) -> Result<bool, HostError>;
}

/// Presents a finished report.
pub trait ReportSink {
    fn present(&mut self, title: ReportTitle, lines: &[String]) -> Result<(), HostError>;
}

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// Nothing was eligible; the report holds skip reasons only.
    NothingToConvert(BatchReport),
    /// The gate said no; nothing was modified.
    Declined,
    /// The batch ran; the report covers every input structure.
    Completed(BatchReport),
}

/// Drives one conversion run against a structure document.
#[derive(Debug, Clone)]
pub struct HighResWorkflow {
    rules: RuleSet,
}

impl HighResWorkflow {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            rules: RuleSet::from_config(&config),
        }
    }

    /// Classifies without touching any document.
    pub fn dry_run(&self, structures: &[Structure]) -> Classification {
        self.rules.classify(structures)
    }

    /// Runs the workflow.
    ///
    /// # Errors
    ///
    /// - `HiResError::Unavailable` if `document` is `None`.
    /// - `HiResError::Unexpected` if the gate or `begin_modifications` fails, or the sink fails
    ///   when nothing was converted.
    /// - `HiResError::ReportDelivery` if the sink fails after the batch ran; the error carries
    ///   the full report.
    pub fn run(
        &self,
        document: Option<&mut dyn StructureDocument>,
        gate: &mut dyn ConfirmationGate,
        sink: &mut dyn ReportSink,
        progress: &mut dyn ProgressObserver,
    ) -> HiResResult<WorkflowOutcome> {
        let document = document.ok_or(HiResError::Unavailable)?;

        let structures = document.structures();
        let classification = self.rules.classify(&structures);
        tracing::info!(
            total = structures.len(),
            eligible = classification.eligible.len(),
            skipped = classification.skipped.len(),
            "classified structures"
        );

        let skip_reasons = classification.skip_reasons();

        if !classification.has_eligible() {
            let report = BatchReport::skipped_only(skip_reasons);
            sink.present(ReportTitle::NothingToConvert, &report.lines())?;
            return Ok(WorkflowOutcome::NothingToConvert(report));
        }

        let request = ConfirmationRequest::new(classification.eligible_ids());
        if !gate.confirm(&request)? {
            tracing::info!(count = request.count(), "conversion declined");
            return Ok(WorkflowOutcome::Declined);
        }

        document.begin_modifications()?;

        let converter = BatchConverter::new();
        let report =
            converter.convert_all(document, &classification.eligible, skip_reasons, progress);

        if let Err(source) = sink.present(ReportTitle::ConversionComplete, &report.lines()) {
            tracing::error!(error = %source, "failed to present conversion report");
            return Err(HiResError::ReportDelivery {
                report: Box::new(report),
                source,
            });
        }

        Ok(WorkflowOutcome::Completed(report))
    }
}
