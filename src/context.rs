use std::path::PathBuf;

use aws_sdk_s3::Client;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};

/// Resources shared by the load and write stages of one run.
///
/// Built once at start-up and released by [`ExecutionContext::close`] (or on
/// drop). The S3 client only exists when some configured location is on S3.
pub struct ExecutionContext {
    s3: Option<Client>,
    staging: TempDir,
    infer_schema_rows: Option<usize>,
}

impl ExecutionContext {
    pub async fn connect(config: &PipelineConfig) -> Result<Self> {
        let s3 = if config.uses_object_store() {
            //Load aws credentials and connect a Client to S3
            let aws = aws_config::from_env().load().await;
            info!("connected S3 client");
            Some(Client::new(&aws))
        } else {
            None
        };

        let staging = tempfile::Builder::new()
            .prefix("top-verified-users-")
            .tempdir()
            .map_err(|e| PipelineError::input("staging directory", e))?;
        debug!(staging = %staging.path().display(), "created staging directory");

        Ok(ExecutionContext {
            s3,
            staging,
            infer_schema_rows: config.infer_schema_rows,
        })
    }

    pub fn s3(&self) -> Option<&Client> {
        self.s3.as_ref()
    }

    pub fn infer_schema_rows(&self) -> Option<usize> {
        self.infer_schema_rows
    }

    /// Path inside the staging directory for a downloaded object.
    pub(crate) fn staging_path(&self, name: &str) -> PathBuf {
        self.staging.path().join(name)
    }

    pub fn close(self) {
        let path = self.staging.path().display().to_string();
        match self.staging.close() {
            Ok(()) => debug!(staging = %path, "released staging directory"),
            Err(e) => debug!(staging = %path, error = %e, "staging directory already gone"),
        }
    }
}
