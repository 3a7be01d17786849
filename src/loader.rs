use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info};

use crate::context::ExecutionContext;
use crate::error::{PipelineError, Result};
use crate::location::Location;

/// The two tables the job reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Posts,
    Users,
}

impl Source {
    pub fn name(self) -> &'static str {
        match self {
            Source::Posts => "posts",
            Source::Users => "users",
        }
    }

    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Source::Posts => &["UserID", "Likes", "Retweets"],
            Source::Users => &["UserID", "Username", "Verified"],
        }
    }
}

/// Reads a CSV with a header row, letting Polars infer column types.
///
/// Missing and zero-byte inputs are errors rather than empty tables; a file
/// holding only the header loads as a table with no rows.
pub async fn load(ctx: &ExecutionContext, location: &Location, source: Source) -> Result<DataFrame> {
    let path = match location {
        Location::Local(path) => {
            check_local(path, location)?;
            path.clone()
        }
        Location::S3 { bucket, key } => fetch_s3(ctx, bucket, key, location, source).await?,
    };

    let df = scan_csv(&path, ctx.infer_schema_rows())
        .map_err(|e| PipelineError::input(location, e))?;
    require_columns(&df, source)?;

    info!(source = source.name(), location = %location, rows = df.height(), "loaded input");
    debug!(source = source.name(), schema = ?df.schema(), "inferred schema");
    Ok(df)
}

fn check_local(path: &Path, location: &Location) -> Result<()> {
    let meta = std::fs::metadata(path).map_err(|e| PipelineError::input(location, e))?;
    if meta.is_dir() {
        return Err(PipelineError::input(location, "is a directory"));
    }
    if meta.len() == 0 {
        return Err(PipelineError::input(location, "empty input"));
    }
    Ok(())
}

async fn fetch_s3(
    ctx: &ExecutionContext,
    bucket: &str,
    key: &str,
    location: &Location,
    source: Source,
) -> Result<PathBuf> {
    let client = ctx
        .s3()
        .ok_or_else(|| PipelineError::input(location, "S3 client not configured"))?;

    let bytes = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| PipelineError::input(location, e))?
        .body
        .collect()
        .await
        .map_err(|e| PipelineError::input(location, e))?
        .into_bytes();

    if bytes.is_empty() {
        return Err(PipelineError::input(location, "empty input"));
    }

    let staged = ctx.staging_path(&format!("{}.csv", source.name()));
    tokio::fs::write(&staged, &bytes)
        .await
        .map_err(|e| PipelineError::input(location, e))?;
    debug!(location = %location, bytes = bytes.len(), staged = %staged.display(), "downloaded input");
    Ok(staged)
}

fn scan_csv(path: &Path, infer_schema_rows: Option<usize>) -> PolarsResult<DataFrame> {
    LazyCsvReader::new(path)
        .with_infer_schema_length(infer_schema_rows)
        .finish()?
        .collect()
}

fn require_columns(df: &DataFrame, source: Source) -> Result<()> {
    let present = df.get_column_names();
    for column in source.required_columns() {
        if !present.contains(column) {
            return Err(PipelineError::schema(
                "load",
                format!("{} input has no {} column", source.name(), column),
            ));
        }
    }
    Ok(())
}
