use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const S3_SCHEME: &str = "s3://";

/// Where an input is read from or the output is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    S3 { bucket: String, key: String },
}

impl Location {
    pub fn is_s3(&self) -> bool {
        matches!(self, Location::S3 { .. })
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(rest) = s.strip_prefix(S3_SCHEME) else {
            if s.is_empty() {
                return Err("empty location".to_string());
            }
            return Ok(Location::Local(PathBuf::from(s)));
        };

        match rest.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Location::S3 {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            _ => Err(format!("expected s3://<bucket>/<key>, got {s}")),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::S3 { bucket, key } => write!(f, "{S3_SCHEME}{bucket}/{key}"),
        }
    }
}
