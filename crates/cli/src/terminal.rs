//! Terminal collaborators for the workflow: confirmation prompt, progress line and report
//! output.

use std::io::{BufRead, Write};

use hires_core::report::render_text;
use hires_core::{
    BatchProgress, ConfirmationGate, ConfirmationRequest, HostError, ProgressObserver,
    ReportSink, ReportTitle,
};
use serde::Serialize;

/// Returns true for an explicit yes (`y` or `yes`, any case).
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Prompts on `output` and reads the answer from `input`.
pub struct TerminalGate<R, W> {
    input: R,
    output: W,
    assume_yes: bool,
}

impl<R: BufRead, W: Write> TerminalGate<R, W> {
    pub fn new(input: R, output: W, assume_yes: bool) -> Self {
        Self {
            input,
            output,
            assume_yes,
        }
    }
}

impl<R: BufRead, W: Write> ConfirmationGate for TerminalGate<R, W> {
    fn confirm(&mut self, request: &ConfirmationRequest) -> Result<bool, HostError> {
        if self.assume_yes {
            tracing::info!(count = request.count(), "conversion confirmed by --yes");
            return Ok(true);
        }

        write!(self.output, "{} [y/N] ", request.message())
            .and_then(|_| self.output.flush())
            .map_err(|e| HostError::new(format!("failed to write prompt: {e}")))?;

        let mut answer = String::new();
        self.input
            .read_line(&mut answer)
            .map_err(|e| HostError::new(format!("failed to read answer: {e}")))?;

        Ok(is_yes(&answer))
    }
}

/// Renders progress as a single updating line.
pub struct ProgressLine<W> {
    output: W,
}

impl<W: Write> ProgressLine<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }
}

impl<W: Write> ProgressObserver for ProgressLine<W> {
    fn on_progress(&mut self, progress: BatchProgress) {
        let done = progress.attempted == progress.total;
        let result = write!(
            self.output,
            "\rConverting structures to high resolution... {}/{}",
            progress.attempted, progress.total
        )
        .and_then(|_| if done { writeln!(self.output) } else { Ok(()) })
        .and_then(|_| self.output.flush());

        // Progress is cosmetic; a broken terminal must not stop the batch.
        if let Err(e) = result {
            tracing::debug!(error = %e, "failed to render progress");
        }
    }
}

/// Output format for reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    title: String,
    lines: &'a [String],
}

/// Writes reports to `output` in the chosen format.
pub struct WriterSink<W> {
    output: W,
    format: ReportFormat,
}

impl<W: Write> WriterSink<W> {
    pub fn new(output: W, format: ReportFormat) -> Self {
        Self { output, format }
    }
}

impl<W: Write> ReportSink for WriterSink<W> {
    fn present(&mut self, title: ReportTitle, lines: &[String]) -> Result<(), HostError> {
        let result = match self.format {
            ReportFormat::Text => writeln!(self.output, "{title}\n{}", render_text(lines)),
            ReportFormat::Json => {
                let report = JsonReport {
                    title: title.to_string(),
                    lines,
                };
                serde_json::to_writer_pretty(&mut self.output, &report)
                    .map_err(std::io::Error::from)
                    .and_then(|_| writeln!(self.output))
            }
        };

        result
            .and_then(|_| self.output.flush())
            .map_err(|e| HostError::new(format!("failed to write report: {e}")))
    }
}
