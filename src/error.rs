use polars::prelude::PolarsError;
use thiserror::Error;

/// Every way a run can fail. None of these are recovered locally: the first
/// one aborts the run and is reported by `main`.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot read input {path}: {reason}")]
    InputRead { path: String, reason: String },

    #[error("schema mismatch in {stage}: {detail}")]
    SchemaMismatch { stage: &'static str, detail: String },

    #[error("numeric overflow in {stage}: {detail}")]
    NumericOverflow { stage: &'static str, detail: String },

    #[error("cannot write output {path}: {reason}")]
    OutputWrite { path: String, reason: String },

    #[error("engine failure in {stage}: {source}")]
    Engine {
        stage: &'static str,
        #[source]
        source: PolarsError,
    },
}

impl PipelineError {
    pub fn input(path: impl ToString, reason: impl ToString) -> Self {
        PipelineError::InputRead {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn output(path: impl ToString, reason: impl ToString) -> Self {
        PipelineError::OutputWrite {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn schema(stage: &'static str, detail: impl Into<String>) -> Self {
        PipelineError::SchemaMismatch {
            stage,
            detail: detail.into(),
        }
    }

    pub fn overflow(stage: &'static str, detail: impl Into<String>) -> Self {
        PipelineError::NumericOverflow {
            stage,
            detail: detail.into(),
        }
    }

    /// Wraps a Polars error raised while executing `stage`.
    pub fn engine(stage: &'static str) -> impl FnOnce(PolarsError) -> Self {
        move |source| PipelineError::Engine { stage, source }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
