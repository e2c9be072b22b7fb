//! Batch conversion of eligible structures.
//!
//! Conversions run one at a time in eligible order. A fault for one structure is recorded and
//! the loop moves on; nothing is rolled back, so every structure converted before a fault
//! stays converted.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::report::{BatchReport, ConversionRecord};
use crate::structure::{Structure, StructureDocument};

/// Progress of a running batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub attempted: usize,
    pub converted: usize,
    pub total: usize,
}

/// Receives progress while a batch runs.
pub trait ProgressObserver {
    fn on_progress(&mut self, progress: BatchProgress);
}

/// Observer that ignores progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _progress: BatchProgress) {}
}

/// Applies the conversion primitive to each eligible structure.
#[derive(Debug, Clone)]
pub struct BatchConverter {
    batch_id: String,
}

impl Default for BatchConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchConverter {
    pub fn new() -> Self {
        Self {
            batch_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Attempts every structure in `eligible` exactly once and returns the merged report.
    ///
    /// `skip_reasons` are carried into the report unchanged, ahead of the conversion results.
    pub fn convert_all(
        &self,
        document: &mut dyn StructureDocument,
        eligible: &[Structure],
        skip_reasons: Vec<String>,
        progress: &mut dyn ProgressObserver,
    ) -> BatchReport {
        let span = tracing::info_span!("batch", batch_id = self.batch_id.as_str());
        let _guard = span.enter();

        let start = Instant::now();
        let total = eligible.len();
        let mut records = Vec::with_capacity(total);
        let mut converted = 0usize;

        tracing::info!(total, "starting high resolution conversion");
        progress.on_progress(BatchProgress {
            attempted: 0,
            converted,
            total,
        });

        for structure in eligible {
            let record = convert_one(document, structure);
            if record.is_converted() {
                converted += 1;
            }
            records.push(record);

            progress.on_progress(BatchProgress {
                attempted: records.len(),
                converted,
                total,
            });
        }

        tracing::info!(
            converted,
            total,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "high resolution conversion finished"
        );

        BatchReport::from_records(skip_reasons, records)
    }
}

fn convert_one(document: &mut dyn StructureDocument, structure: &Structure) -> ConversionRecord {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        document.convert_to_high_resolution(structure)
    }));

    match outcome {
        Ok(Ok(())) => {
            tracing::debug!(structure_id = structure.id.as_str(), "converted");
            ConversionRecord::converted(&structure.id)
        }
        Ok(Err(fault)) => {
            tracing::warn!(
                structure_id = structure.id.as_str(),
                error = %fault,
                "conversion failed, continuing with next structure"
            );
            ConversionRecord::failed(&structure.id, fault.message())
        }
        Err(payload) => {
            let message = format!("unexpected failure: {}", panic_message(payload.as_ref()));
            tracing::error!(
                structure_id = structure.id.as_str(),
                error = message.as_str(),
                "conversion panicked, continuing with next structure"
            );
            ConversionRecord::failed(&structure.id, message)
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{ConversionFault, HostError};
    use crate::report::ConversionStatus;

    /// In-memory document whose conversions fail for configured ids.
    #[derive(Default)]
    pub(crate) struct FakeDocument {
        pub structures: Vec<Structure>,
        pub faults: Vec<(String, String)>,
        pub panics_on: Option<String>,
        pub attempts: Vec<String>,
        pub modifications_begun: bool,
        pub begin_fails: bool,
    }

    impl FakeDocument {
        pub fn new(structures: Vec<Structure>) -> Self {
            Self {
                structures,
                ..Self::default()
            }
        }

        pub fn failing(mut self, id: &str, message: &str) -> Self {
            self.faults.push((id.to_string(), message.to_string()));
            self
        }
    }

    impl StructureDocument for FakeDocument {
        fn structures(&self) -> Vec<Structure> {
            self.structures.clone()
        }

        fn begin_modifications(&mut self) -> Result<(), HostError> {
            if self.begin_fails {
                return Err(HostError::new("patient is read-only"));
            }
            self.modifications_begun = true;
            Ok(())
        }

        fn convert_to_high_resolution(
            &mut self,
            structure: &Structure,
        ) -> Result<(), ConversionFault> {
            self.attempts.push(structure.id.clone());
            if self.panics_on.as_deref() == Some(structure.id.as_str()) {
                panic!("segment volume corrupted");
            }
            if let Some((_, message)) = self.faults.iter().find(|(id, _)| *id == structure.id) {
                return Err(ConversionFault::new(message.clone()));
            }
            if let Some(s) = self.structures.iter_mut().find(|s| s.id == structure.id) {
                s.is_high_resolution = Some(true);
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingProgress(Vec<BatchProgress>);

    impl ProgressObserver for RecordingProgress {
        fn on_progress(&mut self, progress: BatchProgress) {
            self.0.push(progress);
        }
    }

    fn eligible(ids: &[&str]) -> Vec<Structure> {
        ids.iter()
            .map(|id| Structure::new(*id, false, false, true, "ORGAN"))
            .collect()
    }

    #[test]
    fn test_failure_is_isolated_at_every_position() {
        let ids = ["S1", "S2", "S3", "S4"];
        for failing in ids {
            let structures = eligible(&ids);
            let mut doc = FakeDocument::new(structures.clone()).failing(failing, "geometry error");

            let report =
                BatchConverter::new().convert_all(&mut doc, &structures, vec![], &mut NoProgress);

            assert_eq!(doc.attempts, ids, "all structures attempted when {failing} fails");
            let failed: Vec<&ConversionRecord> =
                report.records().iter().filter(|r| !r.is_converted()).collect();
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].structure_id, failing);
            assert_eq!(report.converted(), ids.len() - 1);
            assert_eq!(
                report.summary(),
                Some("Successfully converted 3/4 structures")
            );
        }
    }

    #[test]
    fn test_records_follow_eligible_order() {
        let structures = eligible(&["Z", "A", "M"]);
        let mut doc = FakeDocument::new(structures.clone());

        let report =
            BatchConverter::new().convert_all(&mut doc, &structures, vec![], &mut NoProgress);

        let ids: Vec<&str> = report
            .records()
            .iter()
            .map(|r| r.structure_id.as_str())
            .collect();
        assert_eq!(ids, vec!["Z", "A", "M"]);
        assert!(doc
            .structures
            .iter()
            .all(|s| s.is_high_resolution == Some(true)));
    }

    #[test]
    fn test_skip_reasons_are_merged_before_results() {
        let structures = eligible(&["E", "F"]);
        let mut doc = FakeDocument::new(structures.clone()).failing("F", "geometry error");

        let report = BatchConverter::new().convert_all(
            &mut doc,
            &structures,
            vec!["A: Already high resolution".into()],
            &mut NoProgress,
        );

        assert_eq!(
            report.lines(),
            vec![
                "Successfully converted 1/2 structures",
                "A: Already high resolution",
                "E: Successfully converted",
                "F: FAILED - geometry error",
            ]
        );
    }

    #[test]
    fn test_panic_in_host_is_recorded_as_failure() {
        let structures = eligible(&["A", "B", "C"]);
        let mut doc = FakeDocument::new(structures.clone());
        doc.panics_on = Some("B".into());

        let report =
            BatchConverter::new().convert_all(&mut doc, &structures, vec![], &mut NoProgress);

        assert_eq!(doc.attempts, vec!["A", "B", "C"]);
        assert_eq!(report.converted(), 2);
        assert_eq!(
            report.records()[1].status,
            ConversionStatus::Failed("unexpected failure: segment volume corrupted".into())
        );
    }

    #[test]
    fn test_progress_reported_before_and_after_each_attempt() {
        let structures = eligible(&["A", "B"]);
        let mut doc = FakeDocument::new(structures.clone()).failing("A", "boom");
        let mut progress = RecordingProgress::default();

        BatchConverter::new().convert_all(&mut doc, &structures, vec![], &mut progress);

        assert_eq!(
            progress.0,
            vec![
                BatchProgress {
                    attempted: 0,
                    converted: 0,
                    total: 2
                },
                BatchProgress {
                    attempted: 1,
                    converted: 0,
                    total: 2
                },
                BatchProgress {
                    attempted: 2,
                    converted: 1,
                    total: 2
                },
            ]
        );
    }

    #[test]
    fn test_each_converter_has_its_own_batch_id() {
        let a = BatchConverter::new();
        let b = BatchConverter::new();
        assert_ne!(a.batch_id(), b.batch_id());
        assert!(uuid::Uuid::parse_str(a.batch_id()).is_ok());
    }
}
