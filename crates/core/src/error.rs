use crate::report::BatchReport;

/// Error raised by the host for a single structure's conversion.
///
/// Always recovered at the per-structure boundary and turned into a report line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ConversionFault {
    message: String,
}

impl ConversionFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error raised by a host collaborator outside the per-structure boundary
/// (opening modifications, asking for confirmation, presenting a report).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HostError {
    message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HiResError {
    #[error("no structure set loaded, please open a structure set")]
    Unavailable,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unexpected failure: {0}")]
    Unexpected(#[from] HostError),
    #[error(
        "failed to present report ({attempted} attempted, {converted} converted): {source}",
        attempted = report.attempted(),
        converted = report.converted()
    )]
    ReportDelivery {
        report: Box<BatchReport>,
        #[source]
        source: HostError,
    },
}

pub type HiResResult<T> = std::result::Result<T, HiResError>;
