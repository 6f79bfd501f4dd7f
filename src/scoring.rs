//! Point awards for a finished round
//!
//! Two deterministic policies are available. `Linear` decays the award with the
//! time a player took to answer. `Ranked` decays it with the order in which
//! correct answers arrived.

use crate::session::round::RoundRecord;
use crate::types::Username;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringPolicy {
    /// `max` for an instant answer, falling linearly to `min` at the time limit
    Linear { max: u32, min: u32 },
    /// `max` for the first correct answer, each later one gets
    /// `numerator / denominator` of the previous award, never less than `floor`
    Ranked {
        max: u32,
        numerator: u32,
        denominator: u32,
        floor: u32,
    },
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        ScoringPolicy::Linear {
            max: 1000,
            min: 500,
        }
    }
}

impl ScoringPolicy {
    /// Classic arrival-order rule: `max`, then 10/11 of the previous award
    pub fn ranked(max: u32) -> Self {
        ScoringPolicy::Ranked {
            max,
            numerator: 10,
            denominator: 11,
            floor: 1,
        }
    }

    /// Points for a correct answer given after `elapsed`, as the `rank`-th
    /// correct answer of the round (0-based)
    pub fn award(&self, elapsed: Duration, limit: Duration, rank: usize) -> u32 {
        match *self {
            ScoringPolicy::Linear { max, min } => {
                let limit_ms = limit.as_millis();
                if limit_ms == 0 {
                    return max;
                }
                let elapsed_ms = elapsed.as_millis().min(limit_ms);
                let span = u128::from(max.saturating_sub(min));
                let decay = span * elapsed_ms / limit_ms;
                // decay <= span <= u32::MAX
                max - decay as u32
            }
            ScoringPolicy::Ranked {
                max,
                numerator,
                denominator,
                floor,
            } => {
                let mut points = u64::from(max);
                for _ in 0..rank {
                    if points <= u64::from(floor) {
                        break;
                    }
                    points = points * u64::from(numerator) / u64::from(denominator.max(1));
                }
                points.max(u64::from(floor)).min(u64::from(max)) as u32
            }
        }
    }
}

/// Point delta for every player in the round. Wrong and missing answers get 0.
pub fn score_round(
    round: &RoundRecord,
    correct: usize,
    limit: Duration,
    policy: &ScoringPolicy,
) -> BTreeMap<Username, u32> {
    let mut correct_answers: Vec<_> = round
        .entries()
        .filter_map(|(name, answer)| answer.map(|a| (name, *a)))
        .filter(|(_, answer)| answer.choice == correct)
        .collect();
    correct_answers.sort_by_key(|(_, answer)| answer.seq);

    let mut gains: BTreeMap<Username, u32> = round
        .entries()
        .map(|(name, _)| (name.to_string(), 0))
        .collect();

    for (rank, (name, answer)) in correct_answers.into_iter().enumerate() {
        let points = policy.award(answer.elapsed, limit, rank);
        tracing::debug!("`{}` +{}", name, points);
        gains.insert(name.to_string(), points);
    }

    gains
}
