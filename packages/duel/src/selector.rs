use std::collections::HashSet;

use rand::seq::IndexedRandom;
use tracing::info;

use judge::JudgeClient;

use crate::error::DuelError;
use crate::model::{DuelProblem, ProblemState};

/// Pick `count` problems rated within `[rating_min, rating_max]` that
/// neither player has ever solved on the judge, uniformly at random without
/// replacement. A shortfall of eligible problems fails the start attempt
/// (`ConfigurationExhausted`); the rating band is never widened and the
/// selection is never truncated.
pub async fn select_problems(
    judge: &dyn JudgeClient,
    handles: [&str; 2],
    count: u32,
    rating_min: i64,
    rating_max: i64,
) -> Result<Vec<DuelProblem>, DuelError> {
    let mut solved: HashSet<(i64, String)> = HashSet::new();
    for handle in handles {
        for submission in judge.user_submissions(handle).await? {
            if submission.verdict.is_some_and(|v| v.is_accepted()) {
                solved.insert((submission.contest_id, submission.index));
            }
        }
    }

    let catalog = judge.problem_list().await?;
    let mut eligible = Vec::new();
    for problem in catalog {
        let Some(contest_id) = problem.contest_id else {
            continue;
        };
        let Some(rating) = problem.rating else {
            continue;
        };
        if rating < rating_min || rating > rating_max {
            continue;
        }
        if solved.contains(&(contest_id, problem.index.clone())) {
            continue;
        }
        eligible.push(DuelProblem {
            contest_id,
            index: problem.index,
            name: problem.name,
            rating,
            points: rating - rating_min + 100,
            slots: [ProblemState::default(); 2],
        });
    }

    if eligible.len() < count as usize {
        return Err(DuelError::ConfigurationExhausted {
            available: eligible.len(),
            requested: count,
        });
    }

    let picked: Vec<DuelProblem> = eligible
        .choose_multiple(&mut rand::rng(), count as usize)
        .cloned()
        .collect();
    info!(
        count = picked.len(),
        rating_min, rating_max, "selected duel problems"
    );
    Ok(picked)
}
