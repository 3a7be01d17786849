use std::fmt;

use tracing::info;

use crate::config::PipelineConfig;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::loader::{self, Source};
use crate::location::Location;
use crate::stages;

/// Row counts observed along one successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub posts_rows: usize,
    pub users_rows: usize,
    pub verified_users: usize,
    pub joined_rows: usize,
    pub output_rows: usize,
    pub output: Location,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} posts, {} users ({} verified), {} joined rows -> {} ranked rows at {}",
            self.posts_rows,
            self.users_rows,
            self.verified_users,
            self.joined_rows,
            self.output_rows,
            self.output
        )
    }
}

pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    ctx: &'a ExecutionContext,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig, ctx: &'a ExecutionContext) -> Self {
        Pipeline { config, ctx }
    }

    /// Load, filter, join, derive, rank, write. The first failing stage ends
    /// the run; the output is only touched by the final write.
    pub async fn run(&self) -> Result<RunSummary> {
        let cfg = self.config;

        let posts = loader::load(self.ctx, &cfg.input_posts_path, Source::Posts).await?;
        let users = loader::load(self.ctx, &cfg.input_users_path, Source::Users).await?;
        let (posts_rows, users_rows) = (posts.height(), users.height());

        let verified = stages::filter_verified(users)?;
        let verified_users = verified.height();
        info!(verified_users, "filtered users");

        let joined = stages::join(posts, verified)?;
        let joined_rows = joined.height();
        info!(joined_rows, "joined posts to verified users");

        let reach = stages::derive_reach(joined)?;
        let mut ranked = stages::aggregate_top_n(reach, cfg.top_n)?;
        info!(top_n = cfg.top_n, rows = ranked.height(), "ranked users");

        crate::writer::write(self.ctx, &mut ranked, &cfg.output_path).await?;

        Ok(RunSummary {
            posts_rows,
            users_rows,
            verified_users,
            joined_rows,
            output_rows: ranked.height(),
            output: cfg.output_path.clone(),
        })
    }
}

/// Runs the job once with its own execution context.
pub async fn run(config: &PipelineConfig) -> Result<RunSummary> {
    let ctx = ExecutionContext::connect(config).await?;
    let result = Pipeline::new(config, &ctx).run().await;
    ctx.close();
    result
}
