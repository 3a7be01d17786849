use std::fs;
use std::io::{self, Write};
use std::path::Path;

use polars::prelude::*;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::context::ExecutionContext;
use crate::error::{PipelineError, Result};
use crate::location::Location;

/// Writes `df` as one CSV file with a header row, replacing whatever was at
/// `location` before.
pub async fn write(ctx: &ExecutionContext, df: &mut DataFrame, location: &Location) -> Result<()> {
    match location {
        Location::Local(path) => write_local(df, path, location)?,
        Location::S3 { bucket, key } => {
            let client = ctx
                .s3()
                .ok_or_else(|| PipelineError::output(location, "S3 client not configured"))?;

            //Create an empty buffer to store the CSV bytes and save them into S3
            let bytes = to_csv_bytes(df).map_err(|e| PipelineError::output(location, e))?;
            let body = aws_sdk_s3::types::ByteStream::from(bytes);

            client
                .put_object()
                .bucket(bucket)
                .key(key)
                .content_type("text/csv")
                .body(body)
                .send()
                .await
                .map_err(|e| PipelineError::output(location, e))?;
        }
    }

    info!(location = %location, rows = df.height(), "wrote output");
    Ok(())
}

pub fn to_csv_bytes(df: &mut DataFrame) -> PolarsResult<Vec<u8>> {
    let mut bytes = Vec::new();
    CsvWriter::new(&mut bytes).include_header(true).finish(df)?;
    Ok(bytes)
}

/// Stages the CSV beside the destination and renames it into place, so a
/// failed write leaves any previous output as it was.
fn write_local(df: &mut DataFrame, path: &Path, location: &Location) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| PipelineError::output(location, e))?;

    let mut staged = NamedTempFile::new_in(parent).map_err(|e| PipelineError::output(location, e))?;
    let bytes = to_csv_bytes(df).map_err(|e| PipelineError::output(location, e))?;
    staged
        .write_all(&bytes)
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|e| PipelineError::output(location, e))?;

    swap_into_place(path, parent, |dest| staged.persist(dest).map(|_| ()).map_err(|e| e.error))
        .map_err(|e| PipelineError::output(location, e))
}

/// Runs `place` to put the new output at `path`. A directory already at `path`
/// (directory-style writers leave one named like the file) is moved aside
/// first, restored if `place` fails, and deleted only once it succeeds.
fn swap_into_place(
    path: &Path,
    parent: &Path,
    place: impl FnOnce(&Path) -> io::Result<()>,
) -> io::Result<()> {
    let displaced = if path.is_dir() {
        let holder = tempfile::Builder::new()
            .prefix(".replaced-")
            .tempdir_in(parent)?;
        let aside = holder.path().join("previous");
        fs::rename(path, &aside)?;
        debug!(path = %path.display(), aside = %aside.display(), "moved directory at output path aside");
        Some((holder, aside))
    } else {
        None
    };

    if let Err(e) = place(path) {
        if let Some((_, aside)) = &displaced {
            if let Err(restore) = fs::rename(aside, path) {
                debug!(path = %path.display(), error = %restore, "could not restore previous output");
            }
        }
        return Err(e);
    }

    if let Some((holder, _)) = displaced {
        if let Err(e) = holder.close() {
            debug!(path = %path.display(), error = %e, "could not remove previous output");
        }
    }
    Ok(())
}
