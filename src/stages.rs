//! The relational steps between loading and writing.
//!
//! Each stage takes its input frame by value and returns a new one; they run
//! eagerly, one after another, and never touch the filesystem.

use std::collections::HashMap;

use polars::prelude::*;
use tracing::debug;

use crate::error::{PipelineError, Result};

pub const JOIN_KEY: &str = "UserID";
pub const USERNAME: &str = "Username";
pub const VERIFIED: &str = "Verified";
pub const LIKES: &str = "Likes";
pub const RETWEETS: &str = "Retweets";
pub const REACH: &str = "Reach";
pub const TOTAL_REACH: &str = "Total_Reach";

/// Keeps users whose `Verified` flag is true. Unreadable or missing flags
/// count as not verified.
pub fn filter_verified(mut users: DataFrame) -> Result<DataFrame> {
    const STAGE: &str = "filter";

    let flags = verified_flags(column(&users, VERIFIED, STAGE)?)?;
    users
        .with_column(flags)
        .map_err(PipelineError::engine(STAGE))?;

    users
        .lazy()
        .filter(col(VERIFIED).eq(lit(true)))
        .collect()
        .map_err(PipelineError::engine(STAGE))
}

/// Inner-joins posts to users on `UserID`. Both keys are widened to `Int64`
/// first so independently inferred types still line up.
pub fn join(mut posts: DataFrame, users: DataFrame) -> Result<DataFrame> {
    const STAGE: &str = "join";

    if posts.get_column_names().contains(&USERNAME) {
        return Err(PipelineError::schema(
            STAGE,
            format!("posts and users both carry a {USERNAME} column"),
        ));
    }

    let mut users = users
        .select([JOIN_KEY, USERNAME])
        .map_err(PipelineError::engine(STAGE))?;
    let names = column(&users, USERNAME, STAGE)?
        .cast(&DataType::String)
        .map_err(PipelineError::engine(STAGE))?;
    users
        .with_column(names)
        .map_err(PipelineError::engine(STAGE))?;

    to_int64(&mut posts, JOIN_KEY, STAGE)?;
    to_int64(&mut users, JOIN_KEY, STAGE)?;

    posts
        .lazy()
        .join(
            users.lazy(),
            [col(JOIN_KEY)],
            [col(JOIN_KEY)],
            JoinArgs::new(JoinType::Inner),
        )
        .collect()
        .map_err(PipelineError::engine(STAGE))
}

/// Adds `Reach = Likes + Retweets`. A null operand yields a null reach.
pub fn derive_reach(mut joined: DataFrame) -> Result<DataFrame> {
    const STAGE: &str = "derive";

    to_int64(&mut joined, LIKES, STAGE)?;
    to_int64(&mut joined, RETWEETS, STAGE)?;

    let likes = int64s(&joined, LIKES, STAGE)?;
    let retweets = int64s(&joined, RETWEETS, STAGE)?;
    let reach = likes
        .into_iter()
        .zip(retweets)
        .map(|pair| match pair {
            (Some(l), Some(r)) => l.checked_add(r).map(Some).ok_or_else(|| {
                PipelineError::overflow(STAGE, format!("{l} + {r} does not fit in 64 bits"))
            }),
            _ => Ok(None),
        })
        .collect::<Result<Vec<Option<i64>>>>()?;

    joined
        .with_column(Series::new(REACH, reach))
        .map_err(PipelineError::engine(STAGE))?;
    Ok(joined)
}

/// Sums `Reach` per `Username` and keeps the `n` largest totals, descending.
///
/// Groups on the display name, so distinct user ids sharing a name are
/// merged into one row. Equal totals are ordered by name. A name whose every
/// reach is null gets a null total, ranked after all non-null totals.
pub fn aggregate_top_n(reach: DataFrame, n: usize) -> Result<DataFrame> {
    const STAGE: &str = "aggregate";
    const COUNTED: &str = "_counted";

    check_group_totals_fit(&reach, STAGE)?;

    let ranked = reach
        .lazy()
        .group_by([col(USERNAME)])
        .agg([
            col(REACH).sum().alias(TOTAL_REACH),
            col(REACH).is_not_null().sum().alias(COUNTED),
        ])
        .select([
            col(USERNAME),
            when(col(COUNTED).eq(lit(0)))
                .then(Expr::Literal(LiteralValue::Null).cast(DataType::Int64))
                .otherwise(col(TOTAL_REACH))
                .alias(TOTAL_REACH),
        ])
        .sort_by_exprs(
            [col(TOTAL_REACH), col(USERNAME)],
            SortMultipleOptions::default()
                .with_order_descendings([true, false])
                .with_nulls_last(true),
        )
        .collect()
        .map_err(PipelineError::engine(STAGE))?;
    Ok(ranked.head(Some(n)))
}

/// Accepted spellings for a verified flag held as text.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn verified_flags(series: &Series) -> Result<Series> {
    let flags: Vec<Option<bool>> = match series.dtype() {
        DataType::Boolean => return Ok(series.clone()),
        DataType::String => series
            .str()
            .map_err(PipelineError::engine("filter"))?
            .into_iter()
            .map(|v| v.and_then(parse_flag))
            .collect(),
        DataType::Null => vec![None; series.len()],
        dtype if dtype.is_integer() => {
            let ints = series
                .cast(&DataType::Int64)
                .map_err(PipelineError::engine("filter"))?;
            ints.i64()
                .map_err(PipelineError::engine("filter"))?
                .into_iter()
                .map(|v| match v {
                    Some(1) => Some(true),
                    Some(0) => Some(false),
                    _ => None,
                })
                .collect()
        }
        other => {
            return Err(PipelineError::schema(
                "filter",
                format!("{VERIFIED} has type {other}, expected boolean"),
            ))
        }
    };
    debug!(dtype = %series.dtype(), "normalised {VERIFIED} flags");
    Ok(Series::new(VERIFIED, flags))
}

/// Replaces `name` with an `Int64` copy. Integer columns are widened and text
/// is parsed strictly; anything else, or text that does not parse, is a
/// schema mismatch.
fn to_int64(df: &mut DataFrame, name: &str, stage: &'static str) -> Result<()> {
    let series = column(df, name, stage)?;
    let dtype = series.dtype().clone();
    if dtype == DataType::Int64 {
        return Ok(());
    }
    if !(dtype.is_integer() || dtype == DataType::String || dtype == DataType::Null) {
        return Err(PipelineError::schema(
            stage,
            format!("{name} has type {dtype}, expected an integer"),
        ));
    }

    let widened = series.strict_cast(&DataType::Int64).map_err(|e| {
        PipelineError::schema(stage, format!("{name} is not integer-valued ({dtype}): {e}"))
    })?;
    debug!(stage, column = name, from = %dtype, "cast to Int64");
    df.with_column(widened)
        .map_err(PipelineError::engine(stage))?;
    Ok(())
}

fn column<'a>(df: &'a DataFrame, name: &str, stage: &'static str) -> Result<&'a Series> {
    df.column(name)
        .map_err(|_| PipelineError::schema(stage, format!("missing column {name}")))
}

fn int64s<'a>(df: &'a DataFrame, name: &str, stage: &'static str) -> Result<&'a Int64Chunked> {
    column(df, name, stage)?
        .i64()
        .map_err(PipelineError::engine(stage))
}

/// Every per-name total must fit in `i64`; summed exactly in `i128` first.
fn check_group_totals_fit(df: &DataFrame, stage: &'static str) -> Result<()> {
    let names = column(df, USERNAME, stage)?
        .str()
        .map_err(PipelineError::engine(stage))?;
    let reach = int64s(df, REACH, stage)?;

    let mut totals: HashMap<Option<&str>, i128> = HashMap::new();
    for (name, r) in names.into_iter().zip(reach) {
        if let Some(r) = r {
            *totals.entry(name).or_default() += i128::from(r);
        }
    }

    match totals.into_iter().find(|(_, total)| i64::try_from(*total).is_err()) {
        Some((name, total)) => Err(PipelineError::overflow(
            stage,
            format!(
                "reach of {} sums to {total}, which does not fit in 64 bits",
                name.unwrap_or("<null>")
            ),
        )),
        None => Ok(()),
    }
}
