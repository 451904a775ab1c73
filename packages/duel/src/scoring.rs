//! Replay-safe score recomputation.
//!
//! Each reconciliation pass recomputes a player's scoreboard from their
//! complete submission history instead of applying increments. The only
//! state that survives a pass is "solved" (a frozen positive score); attempt
//! counters for unsolved problems are rebuilt from scratch. Re-running the
//! pass on a longer history therefore converges to the same result, and no
//! submission log has to be persisted.

use judge::Submission;

use crate::model::{DuelProblem, Slot, Totals};

/// Penalty per prior non-accepted attempt, as a fraction of the problem's
/// point value.
const ATTEMPT_PENALTY: f64 = 0.1;

/// Apply one player's full submission history, in judge order, to the
/// scoreboard. Pending or verdict-less submissions neither count as an
/// attempt nor affect score. The first accepted verdict freezes
/// `score = max(0, points - prior_attempts * 0.1 * points)`.
pub fn apply_history(problems: &mut [DuelProblem], slot: Slot, history: &[Submission]) {
    for problem in problems.iter_mut() {
        if !problem.solved(slot) {
            problem.state_mut(slot).attempts = 0;
        }
    }

    for submission in history {
        let Some(verdict) = submission.verdict else {
            continue;
        };
        if verdict.is_pending() {
            continue;
        }
        for problem in problems.iter_mut() {
            if problem.solved(slot) {
                continue;
            }
            if problem.contest_id != submission.contest_id || problem.index != submission.index {
                continue;
            }
            if verdict.is_accepted() {
                let points = problem.points as f64;
                let state = problem.state_mut(slot);
                let penalty = state.attempts as f64 * ATTEMPT_PENALTY * points;
                state.score = (points - penalty).max(0.0);
            }
            problem.state_mut(slot).attempts += 1;
        }
    }
}

/// Sum a player's per-problem scores and count their solves.
pub fn aggregate(problems: &[DuelProblem], slot: Slot) -> Totals {
    let mut totals = Totals::default();
    for problem in problems {
        let state = problem.state(slot);
        totals.score += state.score;
        if state.score > 0.0 {
            totals.solves += 1;
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use judge::Verdict;

    use super::*;
    use crate::model::ProblemState;

    fn problem(contest_id: i64, index: &str, points: i64) -> DuelProblem {
        DuelProblem {
            contest_id,
            index: index.into(),
            name: format!("Problem {index}"),
            rating: points + 1100,
            points,
            slots: [ProblemState::default(); 2],
        }
    }

    fn submission(contest_id: i64, index: &str, verdict: Option<Verdict>) -> Submission {
        Submission {
            contest_id,
            index: index.into(),
            name: format!("Problem {index}"),
            rating: 1500,
            creation_time_seconds: 0,
            verdict,
        }
    }

    #[test]
    fn accept_on_third_attempt_pays_ten_percent_per_prior_attempt() {
        // rating 1500, rating_min 1200 => 400 points; two failed attempts
        // before the accept => 320.
        let mut problems = vec![problem(1, "A", 400)];
        let history = vec![
            submission(1, "A", Some(Verdict::Rejected)),
            submission(1, "A", Some(Verdict::Rejected)),
            submission(1, "A", Some(Verdict::Ok)),
        ];
        apply_history(&mut problems, Slot::One, &history);
        assert_eq!(problems[0].state(Slot::One).score, 320.0);
    }

    #[test]
    fn score_clamps_to_zero_with_enough_failed_attempts() {
        let mut problems = vec![problem(1, "A", 100)];
        let mut history: Vec<_> = (0..12)
            .map(|_| submission(1, "A", Some(Verdict::Rejected)))
            .collect();
        history.push(submission(1, "A", Some(Verdict::Ok)));
        apply_history(&mut problems, Slot::One, &history);
        assert_eq!(problems[0].state(Slot::One).score, 0.0);
    }

    #[test]
    fn pending_and_missing_verdicts_are_ignored() {
        let mut problems = vec![problem(1, "A", 300)];
        let history = vec![
            submission(1, "A", None),
            submission(1, "A", Some(Verdict::Testing)),
            submission(1, "A", Some(Verdict::Ok)),
        ];
        apply_history(&mut problems, Slot::One, &history);
        // No penalty: neither the verdict-less nor the pending entry counted.
        assert_eq!(problems[0].state(Slot::One).score, 300.0);
    }

    #[test]
    fn submissions_for_other_problems_do_not_count() {
        let mut problems = vec![problem(1, "A", 200), problem(2, "B", 200)];
        let history = vec![
            submission(2, "B", Some(Verdict::Rejected)),
            submission(1, "A", Some(Verdict::Ok)),
        ];
        apply_history(&mut problems, Slot::One, &history);
        assert_eq!(problems[0].state(Slot::One).score, 200.0);
        assert_eq!(problems[1].state(Slot::One).attempts, 1);
        assert!(!problems[1].solved(Slot::One));
    }

    #[test]
    fn replaying_the_same_history_is_idempotent() {
        let mut problems = vec![problem(1, "A", 400), problem(1, "B", 250)];
        let history = vec![
            submission(1, "A", Some(Verdict::Rejected)),
            submission(1, "A", Some(Verdict::Ok)),
            submission(1, "B", Some(Verdict::Rejected)),
        ];
        apply_history(&mut problems, Slot::One, &history);
        let first_pass = problems.clone();
        apply_history(&mut problems, Slot::One, &history);

        for (a, b) in first_pass.iter().zip(&problems) {
            assert_eq!(a.state(Slot::One), b.state(Slot::One));
        }
        assert_eq!(aggregate(&problems, Slot::One), aggregate(&first_pass, Slot::One));
    }

    #[test]
    fn solved_score_is_frozen_against_later_submissions() {
        let mut problems = vec![problem(1, "A", 400)];
        let mut history = vec![submission(1, "A", Some(Verdict::Ok))];
        apply_history(&mut problems, Slot::One, &history);
        assert_eq!(problems[0].state(Slot::One).score, 400.0);

        // Resubmissions after the solve must not move the score or attempts.
        history.push(submission(1, "A", Some(Verdict::Rejected)));
        history.push(submission(1, "A", Some(Verdict::Ok)));
        let attempts_before = problems[0].state(Slot::One).attempts;
        apply_history(&mut problems, Slot::One, &history);
        assert_eq!(problems[0].state(Slot::One).score, 400.0);
        assert_eq!(problems[0].state(Slot::One).attempts, attempts_before);
    }

    #[test]
    fn slots_are_scored_independently() {
        let mut problems = vec![problem(1, "A", 400)];
        apply_history(
            &mut problems,
            Slot::One,
            &[submission(1, "A", Some(Verdict::Ok))],
        );
        apply_history(
            &mut problems,
            Slot::Two,
            &[submission(1, "A", Some(Verdict::Rejected))],
        );
        assert_eq!(problems[0].state(Slot::One).score, 400.0);
        assert_eq!(problems[0].state(Slot::Two).score, 0.0);
        assert_eq!(problems[0].state(Slot::Two).attempts, 1);
    }

    #[test]
    fn aggregate_sums_scores_and_counts_solves() {
        let mut one = problem(1, "A", 400);
        one.state_mut(Slot::One).score = 320.0;
        let mut two = problem(1, "B", 250);
        two.state_mut(Slot::One).score = 250.0;
        let three = problem(1, "C", 150);

        let totals = aggregate(&[one, two, three], Slot::One);
        assert_eq!(totals.score, 570.0);
        assert_eq!(totals.solves, 2);
    }
}
