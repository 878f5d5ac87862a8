//! The seven-component capability scorer.

use std::collections::BTreeSet;

use actl_core::ProviderType;

use crate::provider::provider_strengths;

/// Everything the scorer needs about one candidate account, pre-computed by
/// the caller from stores so this module stays a pure function over plain
/// data (no store or clock dependency).
#[derive(Debug, Clone)]
pub struct ScoringInput {
    /// Declared skills.
    pub skills: BTreeSet<String>,
    /// Declared provider type, if known.
    pub provider_type: Option<ProviderType>,
    /// Total tasks delivered.
    pub total: u32,
    /// Total tasks accepted.
    pub accepted: u32,
    /// Running average delivery time in milliseconds.
    pub avg_delivery_ms: f64,
    /// Trust score `[0, 100]`, if known.
    pub trust_score: Option<u32>,
    /// Minutes since last activity, if known.
    pub minutes_since_active: Option<f64>,
    /// Work-in-progress task count.
    pub wip: u32,
    /// Open (assigned but not started) task count.
    pub open: u32,
    /// Tasks completed in the recent throughput window.
    pub recent_throughput: u32,
}

/// One scored component with its human-readable justification.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreComponent {
    /// Component name (`"skill_match"`, `"provider_fit"`, ...).
    pub name: &'static str,
    /// Points contributed, possibly negative for workload.
    pub points: f64,
    /// Human-readable reason, e.g. `"2/3 required skills matched"`.
    pub reason: String,
}

/// The full scoring breakdown for one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    /// Final score, rounded and clamped to `[0, 100]`.
    pub total: u32,
    /// Per-component breakdown, in evaluation order.
    pub components: Vec<ScoreComponent>,
}

/// Scores `input` against `required_skills`.
#[must_use]
pub fn score_candidate(input: &ScoringInput, required_skills: &[String]) -> ScoreResult {
    let components = vec![
        skill_match(input, required_skills),
        provider_fit(input, required_skills),
        success_rate(input),
        speed(input),
        trust(input),
        recency(input),
        workload(input),
    ];
    let raw: f64 = components.iter().map(|c| c.points).sum();
    let total = raw.round().clamp(0.0, 100.0) as u32;
    ScoreResult { total, components }
}

fn skill_match(input: &ScoringInput, required: &[String]) -> ScoreComponent {
    if required.is_empty() {
        return ScoreComponent {
            name: "skill_match",
            points: 30.0,
            reason: "no skills required".to_string(),
        };
    }
    let matched = required.iter().filter(|s| input.skills.contains(*s)).count();
    let points = (matched as f64 / required.len() as f64 * 30.0).ceil();
    ScoreComponent {
        name: "skill_match",
        points,
        reason: format!("{matched}/{} required skills matched", required.len()),
    }
}

fn provider_fit(input: &ScoringInput, required: &[String]) -> ScoreComponent {
    let Some(provider_type) = input.provider_type else {
        return ScoreComponent {
            name: "provider_fit",
            points: 10.0,
            reason: "provider type unknown".to_string(),
        };
    };
    if required.is_empty() {
        return ScoreComponent {
            name: "provider_fit",
            points: 10.0,
            reason: "no skills required".to_string(),
        };
    }
    let strengths = provider_strengths(provider_type);
    let matched = required.iter().filter(|s| strengths.contains(&s.as_str())).count();
    let points = matched as f64 / required.len() as f64 * 20.0;
    ScoreComponent {
        name: "provider_fit",
        points,
        reason: format!("{matched}/{} required skills match provider strengths", required.len()),
    }
}

fn success_rate(input: &ScoringInput) -> ScoreComponent {
    if input.total == 0 {
        return ScoreComponent {
            name: "success_rate",
            points: 10.0,
            reason: "no completed tasks yet".to_string(),
        };
    }
    let rate = f64::from(input.accepted) / f64::from(input.total);
    ScoreComponent {
        name: "success_rate",
        points: rate * 20.0,
        reason: format!("{}/{} tasks accepted", input.accepted, input.total),
    }
}

fn speed(input: &ScoringInput) -> ScoreComponent {
    if input.total == 0 {
        return ScoreComponent {
            name: "speed",
            points: 8.0,
            reason: "no delivery history".to_string(),
        };
    }
    let avg_minutes = input.avg_delivery_ms / 60_000.0;
    let points = if avg_minutes < 5.0 {
        15.0
    } else if avg_minutes < 15.0 {
        12.0
    } else if avg_minutes < 30.0 {
        8.0
    } else {
        3.0
    };
    ScoreComponent {
        name: "speed",
        points,
        reason: format!("average delivery {avg_minutes:.1} min"),
    }
}

fn trust(input: &ScoringInput) -> ScoreComponent {
    match input.trust_score {
        Some(score) => ScoreComponent {
            name: "trust",
            points: f64::from(score) / 10.0,
            reason: format!("trust score {score}"),
        },
        None => ScoreComponent {
            name: "trust",
            points: 5.0,
            reason: "trust score unavailable".to_string(),
        },
    }
}

fn recency(input: &ScoringInput) -> ScoreComponent {
    match input.minutes_since_active {
        None => ScoreComponent {
            name: "recency",
            points: 1.0,
            reason: "no activity recorded".to_string(),
        },
        Some(minutes) => {
            let points = if minutes <= 10.0 {
                5.0
            } else if minutes <= 30.0 {
                4.0
            } else if minutes <= 60.0 {
                2.0
            } else {
                1.0
            };
            ScoreComponent {
                name: "recency",
                points,
                reason: format!("last active {minutes:.0} min ago"),
            }
        }
    }
}

fn workload(input: &ScoringInput) -> ScoreComponent {
    let wip_penalty = (f64::from(input.wip) * -5.0).max(-15.0);
    let open_penalty = (f64::from(input.open) * -2.0).max(-10.0);
    let throughput_bonus = (f64::from(input.recent_throughput) * 5.0).min(15.0);
    let points = wip_penalty + open_penalty + throughput_bonus;
    ScoreComponent {
        name: "workload",
        points,
        reason: format!(
            "{} in progress, {} open, {} recently completed",
            input.wip, input.open, input.recent_throughput
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> ScoringInput {
        ScoringInput {
            skills: BTreeSet::new(),
            provider_type: None,
            total: 0,
            accepted: 0,
            avg_delivery_ms: 0.0,
            trust_score: None,
            minutes_since_active: None,
            wip: 0,
            open: 0,
            recent_throughput: 0,
        }
    }

    #[test]
    fn empty_required_skills_gives_full_skill_match() {
        let result = score_candidate(&baseline(), &[]);
        let skill = result.components.iter().find(|c| c.name == "skill_match").unwrap();
        assert_eq!(skill.points, 30.0);
    }

    #[test]
    fn partial_skill_match_rounds_up() {
        let mut input = baseline();
        input.skills.insert("rust".to_string());
        let required = vec!["rust".to_string(), "testing".to_string(), "docs".to_string()];
        let result = score_candidate(&input, &required);
        let skill = result.components.iter().find(|c| c.name == "skill_match").unwrap();
        assert_eq!(skill.points, 10.0);
    }

    #[test]
    fn provider_fit_neutral_when_unknown() {
        let required = vec!["rust".to_string()];
        let result = score_candidate(&baseline(), &required);
        let fit = result.components.iter().find(|c| c.name == "provider_fit").unwrap();
        assert_eq!(fit.points, 10.0);
    }

    #[test]
    fn success_rate_neutral_with_no_history() {
        let result = score_candidate(&baseline(), &[]);
        let rate = result.components.iter().find(|c| c.name == "success_rate").unwrap();
        assert_eq!(rate.points, 10.0);
    }

    #[test]
    fn speed_buckets_match_thresholds() {
        let mut input = baseline();
        input.total = 10;
        input.avg_delivery_ms = 4.0 * 60_000.0;
        let result = score_candidate(&input, &[]);
        let speed = result.components.iter().find(|c| c.name == "speed").unwrap();
        assert_eq!(speed.points, 15.0);
    }

    #[test]
    fn workload_floors_penalties_and_caps_bonus() {
        let mut input = baseline();
        input.wip = 10;
        input.open = 20;
        input.recent_throughput = 10;
        let result = score_candidate(&input, &[]);
        let wl = result.components.iter().find(|c| c.name == "workload").unwrap();
        assert_eq!(wl.points, -15.0 - 10.0 + 15.0);
    }

    #[test]
    fn total_is_clamped_to_zero() {
        let mut input = baseline();
        input.wip = 100;
        input.open = 100;
        let result = score_candidate(&input, &[]);
        assert_eq!(result.total, 0);
    }
}
