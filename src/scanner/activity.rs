//! Weekly commit activity and the derived scores

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::model::{BranchRecord, OutputFile};
use crate::repository::{Database, UnitOfWork};
use crate::util::{score, weeknum};

pub const NUM_WEEKS: usize = 104;
/// Weeks that count towards the score
pub const SCORE_WEEKS: usize = 26;
/// Recent weeks replaced by the average in the baseline score
const RECENT_WEEKS: usize = 3;

pub const GRAPHS: &str = "graphs";
pub const ACTIVITY_FILE: &str = "commits-0.json";

/// Contents of the activity output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySeries {
    pub weeknum: i64,
    pub revcount: usize,
    /// Commits per week, oldest first, ending with `weeknum`
    pub stats: Vec<i64>,
}

impl ActivitySeries {
    /// Bucket commit times into the `NUM_WEEKS` weeks ending at `thisweek`
    pub fn build(datetimes: &[i64], thisweek: i64) -> Self {
        let mut stats = vec![0i64; NUM_WEEKS];
        let mut revcount = 0;
        for &dt in datetimes {
            let idx = weeknum(dt) - thisweek + NUM_WEEKS as i64 - 1;
            if (0..NUM_WEEKS as i64).contains(&idx) {
                stats[idx as usize] += 1;
                revcount += 1;
            }
        }
        Self { weeknum: thisweek, revcount, stats }
    }

    pub fn score(&self) -> i64 {
        score(&self.stats[NUM_WEEKS - SCORE_WEEKS..])
    }

    /// Score against a baseline whose last weeks are the earlier average
    pub fn score_diff(&self) -> i64 {
        let recent = &self.stats[NUM_WEEKS - SCORE_WEEKS..];
        let earlier = &recent[..SCORE_WEEKS - RECENT_WEEKS];
        let avg = (earlier.iter().sum::<i64>() as f64 / earlier.len() as f64).round() as i64;
        let mut baseline = earlier.to_vec();
        baseline.extend(std::iter::repeat_n(avg, RECENT_WEEKS));
        self.score() - score(&baseline)
    }
}

/// Recompute a branch's activity; returns false when it was current.
///
/// Sets `score`/`score_diff` on `branch`, writes the series under
/// `web_root` and stages the output file row in `unit`.
pub async fn update_activity(
    db: &Database,
    branch: &mut BranchRecord,
    unit: &mut UnitOfWork,
    web_root: &Path,
    timestamps: bool,
    now: i64,
) -> Result<bool> {
    let thisweek = weeknum(now);
    let datetimes = db.revision_datetimes(&branch.ident).await?;
    let series = ActivitySeries::build(&datetimes, thisweek);

    if timestamps {
        if let Some(existing) = db.get_output_file(GRAPHS, &branch.ident, ACTIVITY_FILE).await? {
            if let Ok(previous) = serde_json::from_value::<ActivitySeries>(existing.data) {
                if previous.weeknum == thisweek && previous.revcount == series.revcount {
                    debug!("Skipping commit activity for {}", branch.ident);
                    return Ok(false);
                }
            }
        }
    }

    info!("Computing commit activity for {}", branch.ident);
    branch.score = series.score();
    branch.score_diff = series.score_diff();

    let file = OutputFile {
        kind: GRAPHS.to_string(),
        ident: branch.ident.clone(),
        filename: ACTIVITY_FILE.to_string(),
        datetime: now,
        data: serde_json::to_value(&series)?,
    };
    let path = file.path_under(web_root);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, serde_json::to_vec(&series)?).await?;
    unit.output_file(file);
    Ok(true)
}
