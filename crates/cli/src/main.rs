use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use hires_core::config::{id_policy_from_env_value, unsupported_dicom_types_from_env_value};
use hires_core::{
    CoreConfig, HiResError, HighResWorkflow, ReportSink, ReportTitle, StructureDocument,
    WorkflowOutcome,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod document;
mod terminal;

use document::FileDocument;
use terminal::{ProgressLine, ReportFormat, TerminalGate, WriterSink};

#[derive(Parser)]
#[command(name = "hires")]
#[command(about = "Convert structure set structures to high resolution")]
struct Cli {
    /// Id rules to apply: `standard` or `exclude-derived` (overrides HIRES_ID_POLICY)
    #[arg(long, global = true)]
    id_policy: Option<String>,
    /// Comma-separated DICOM types that cannot be converted (overrides HIRES_UNSUPPORTED_DICOM_TYPES)
    #[arg(long, global = true)]
    unsupported_types: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which structures would be converted, without converting anything
    Classify {
        /// Structure set file (.yaml, .yml or .json)
        document: PathBuf,
    },
    /// Convert every eligible structure to high resolution
    Convert {
        /// Structure set file (.yaml, .yml or .json)
        document: PathBuf,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
        /// Report output format
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
}

/// Resolves configuration once at startup. A flag value wins over the environment value.
fn resolve_config(
    id_policy_flag: Option<String>,
    unsupported_flag: Option<String>,
    id_policy_env: Option<String>,
    unsupported_env: Option<String>,
) -> anyhow::Result<CoreConfig> {
    let id_policy = id_policy_from_env_value(id_policy_flag.or(id_policy_env))?;
    let unsupported =
        unsupported_dicom_types_from_env_value(unsupported_flag.or(unsupported_env))?;

    Ok(CoreConfig::new(id_policy, unsupported)?)
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hires=info".parse()?)
                .add_directive("hires_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = resolve_config(
        cli.id_policy.clone(),
        cli.unsupported_types.clone(),
        std::env::var("HIRES_ID_POLICY").ok(),
        std::env::var("HIRES_UNSUPPORTED_DICOM_TYPES").ok(),
    )?;
    tracing::debug!(
        id_policy = %config.id_policy(),
        unsupported_dicom_types = ?config.unsupported_dicom_types(),
        "resolved configuration"
    );
    let workflow = HighResWorkflow::new(config);

    match cli.command {
        Commands::Classify { document } => {
            classify(&workflow, &document, &mut std::io::stdout())
        }
        Commands::Convert {
            document,
            yes,
            format,
        } => convert(&workflow, &document, yes, format),
    }
}

fn classify(workflow: &HighResWorkflow, path: &Path, out: &mut impl Write) -> anyhow::Result<()> {
    let document = FileDocument::open(path)
        .with_context(|| format!("loading {}", path.display()))?
        .ok_or(HiResError::Unavailable)?;

    let classification = workflow.dry_run(&document.structures());
    if !classification.has_eligible() {
        let mut sink = WriterSink::new(&mut *out, ReportFormat::Text);
        sink.present(ReportTitle::NothingToConvert, &classification.skip_reasons())?;
        return Ok(());
    }

    writeln!(
        out,
        "{} structures would be converted:",
        classification.eligible.len()
    )?;
    for id in classification.eligible_ids() {
        writeln!(out, "  {id}")?;
    }
    if !classification.skipped.is_empty() {
        writeln!(
            out,
            "{} structures would be skipped:",
            classification.skipped.len()
        )?;
        for reason in classification.skip_reasons() {
            writeln!(out, "  {reason}")?;
        }
    }

    Ok(())
}

fn convert(
    workflow: &HighResWorkflow,
    path: &Path,
    yes: bool,
    format: ReportFormat,
) -> anyhow::Result<()> {
    let mut document =
        FileDocument::open(path).with_context(|| format!("loading {}", path.display()))?;

    let stdin = std::io::stdin();
    let mut gate = TerminalGate::new(stdin.lock(), std::io::stderr(), yes);
    let mut sink = WriterSink::new(std::io::stdout(), format);
    let mut progress = ProgressLine::new(std::io::stderr());

    let result = workflow.run(
        document
            .as_mut()
            .map(|d| d as &mut dyn StructureDocument),
        &mut gate,
        &mut sink,
        &mut progress,
    );

    // Converted structures are saved even when the report could not be shown.
    if let Some(document) = document.as_mut() {
        document
            .save()
            .with_context(|| format!("saving {}", document.path().display()))?;
    }

    match result {
        Ok(WorkflowOutcome::Declined) => {
            eprintln!("Conversion cancelled, no structures were modified.");
            Ok(())
        }
        Ok(WorkflowOutcome::NothingToConvert(_)) | Ok(WorkflowOutcome::Completed(_)) => Ok(()),
        Err(HiResError::ReportDelivery { report, source }) => {
            for line in report.lines() {
                eprintln!("{line}");
            }
            Err(HiResError::ReportDelivery { report, source }.into())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hires_core::IdPolicy;

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn flags_override_environment() {
        let config = resolve_config(
            some("exclude-derived"),
            some("BOLUS"),
            some("standard"),
            some("SUPPORT,MARKER"),
        )
        .unwrap();

        assert_eq!(config.id_policy(), IdPolicy::ExcludeDerived);
        assert!(config.is_unsupported_dicom_type("BOLUS"));
        assert!(!config.is_unsupported_dicom_type("SUPPORT"));
    }

    #[test]
    fn environment_used_when_no_flag_given() {
        let config =
            resolve_config(None, None, some("exclude-derived"), some("BOLUS, CONTROL")).unwrap();

        assert_eq!(config.id_policy(), IdPolicy::ExcludeDerived);
        assert!(config.is_unsupported_dicom_type("CONTROL"));
        assert!(!config.is_unsupported_dicom_type("MARKER"));
    }

    #[test]
    fn defaults_apply_without_flag_or_environment() {
        let config = resolve_config(None, None, None, None).unwrap();
        assert_eq!(config.id_policy(), IdPolicy::Standard);
        assert!(config.is_unsupported_dicom_type("SUPPORT"));
        assert!(config.is_unsupported_dicom_type("MARKER"));
    }

    #[test]
    fn invalid_id_policy_is_rejected() {
        assert!(resolve_config(some("lenient"), None, None, None).is_err());
        assert!(resolve_config(None, None, some("lenient"), None).is_err());
    }

    #[test]
    fn classify_reports_nothing_to_convert() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.yaml");
        std::fs::write(
            &path,
            r#"
structures:
  - id: Couch
    is_high_resolution: false
    is_approved: false
    can_convert: true
    dicom_type: SUPPORT
  - id: PTV_High
    is_high_resolution: true
"#,
        )
        .unwrap();

        let mut out = Vec::new();
        classify(&HighResWorkflow::new(CoreConfig::default()), &path, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "No structures need conversion:\nCouch: Unsupported DICOM type (SUPPORT)\nPTV_High: Already high resolution\n"
        );
    }

    #[test]
    fn classify_lists_eligible_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.json");
        std::fs::write(
            &path,
            r#"{"structures": [
                {"id": "Bladder", "is_high_resolution": false, "is_approved": false, "can_convert": true, "dicom_type": "ORGAN"},
                {"id": "Rectum", "is_high_resolution": false, "is_approved": true, "can_convert": true, "dicom_type": "ORGAN"}
            ]}"#,
        )
        .unwrap();

        let mut out = Vec::new();
        classify(&HighResWorkflow::new(CoreConfig::default()), &path, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("1 structures would be converted:\n  Bladder\n"));
        assert!(text.contains("  Rectum: Unable to convert approved structures"));
    }

    #[test]
    fn classify_fails_for_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let err = classify(
            &HighResWorkflow::new(CoreConfig::default()),
            &dir.path().join("absent.yaml"),
            &mut out,
        )
        .expect_err("no document");
        assert!(err.downcast_ref::<HiResError>().is_some());
    }
}
