use clap::Parser;

use crate::location::Location;

pub const DEFAULT_POSTS: &str = "input/posts.csv";
pub const DEFAULT_USERS: &str = "input/users.csv";
pub const DEFAULT_OUTPUT: &str = "outputs/top_verified_users.csv";
pub const DEFAULT_TOP_N: usize = 5;

/// Ranks verified users by total reach (likes + retweets) and writes the top N to CSV.
#[derive(Parser, Debug, Clone)]
#[command(name = "top-verified-users", version)]
pub struct PipelineConfig {
    /// Posts CSV (local path or s3://bucket/key)
    #[arg(long = "posts", default_value = DEFAULT_POSTS)]
    pub input_posts_path: Location,

    /// Users CSV (local path or s3://bucket/key)
    #[arg(long = "users", default_value = DEFAULT_USERS)]
    pub input_users_path: Location,

    /// Destination CSV, overwritten on every run
    #[arg(long = "output", default_value = DEFAULT_OUTPUT)]
    pub output_path: Location,

    /// Number of ranked users to keep
    #[arg(long, default_value_t = DEFAULT_TOP_N, value_parser = parse_top_n)]
    pub top_n: usize,

    /// Rows scanned for type inference; scans the whole file when omitted
    #[arg(long)]
    pub infer_schema_rows: Option<usize>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

fn parse_top_n(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{e}"))?;
    if n == 0 {
        return Err("must be at least 1".to_string());
    }
    Ok(n)
}

impl PipelineConfig {
    pub fn uses_object_store(&self) -> bool {
        [
            &self.input_posts_path,
            &self.input_users_path,
            &self.output_path,
        ]
        .iter()
        .any(|loc| loc.is_s3())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            input_posts_path: Location::Local(DEFAULT_POSTS.into()),
            input_users_path: Location::Local(DEFAULT_USERS.into()),
            output_path: Location::Local(DEFAULT_OUTPUT.into()),
            top_n: DEFAULT_TOP_N,
            infer_schema_rows: None,
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_paths() {
        let parsed = PipelineConfig::try_parse_from(["top-verified-users"]).unwrap();
        let default = PipelineConfig::default();
        assert_eq!(parsed.input_posts_path, default.input_posts_path);
        assert_eq!(parsed.input_users_path, default.input_users_path);
        assert_eq!(parsed.output_path, default.output_path);
        assert_eq!(parsed.top_n, 5);
        assert_eq!(parsed.infer_schema_rows, None);
        assert!(!parsed.uses_object_store());
    }

    #[test]
    fn flags_override_defaults() {
        let parsed = PipelineConfig::try_parse_from([
            "top-verified-users",
            "--posts",
            "s3://feeds/posts.csv",
            "--output",
            "out/top.csv",
            "--top-n",
            "10",
        ])
        .unwrap();
        assert!(parsed.input_posts_path.is_s3());
        assert!(parsed.uses_object_store());
        assert_eq!(parsed.top_n, 10);
    }

    #[test]
    fn zero_top_n_is_rejected() {
        assert!(PipelineConfig::try_parse_from(["top-verified-users", "--top-n", "0"]).is_err());
    }
}
