//! The three-stage fan-out: collect, anonymized peer review, chair synthesis.

use std::collections::HashMap;

use serde::Deserialize;

use crate::caller::LlmCaller;
use crate::parse::parse_lenient_json;
use crate::types::{AggregateRank, CouncilResult, MemberOutput, Ranking, Verdict};

const REVIEW_LABELS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Deserialize)]
struct RawMemberOutput {
    verdict: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    notes: String,
}

#[derive(Deserialize)]
struct RawRanking {
    order: Vec<String>,
}

#[derive(Deserialize)]
struct RawChairVerdict {
    verdict: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    notes: String,
}

/// Runs the full council over `members` with `chair` as the synthesizing
/// chairman. `system_prompt` is shared across all calls; `user_prompt`
/// carries the task-goal or task-completion payload being judged.
pub async fn run_council(
    caller: &dyn LlmCaller,
    members: &[String],
    chair: &str,
    system_prompt: &str,
    user_prompt: &str,
) -> CouncilResult {
    let stage1 = collect(caller, members, system_prompt, user_prompt).await;
    if stage1.is_empty() {
        return CouncilResult::degraded();
    }

    let rankings = peer_review(caller, &stage1, system_prompt).await;
    let aggregate = aggregate_rankings(&stage1, &rankings);

    chair_synthesize(caller, &stage1, &aggregate, chair, system_prompt, user_prompt).await
}

async fn collect(
    caller: &dyn LlmCaller,
    members: &[String],
    system_prompt: &str,
    user_prompt: &str,
) -> Vec<MemberOutput> {
    let mut outputs = Vec::new();
    for member in members {
        let response = match caller.call(member, system_prompt, user_prompt).await {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(account = %member, error = %err, "council member call failed");
                continue;
            }
        };
        let Some(raw) = parse_lenient_json::<RawMemberOutput>(&response) else {
            tracing::warn!(account = %member, "council member response was not parseable");
            continue;
        };
        outputs.push(MemberOutput {
            account: member.clone(),
            verdict: Verdict::parse_lenient(&raw.verdict),
            confidence: raw.confidence,
            notes: raw.notes,
        });
    }
    outputs
}

fn anonymize(stage1: &[MemberOutput]) -> String {
    stage1
        .iter()
        .enumerate()
        .map(|(i, output)| {
            let label = REVIEW_LABELS.as_bytes()[i % REVIEW_LABELS.len()] as char;
            format!(
                "Review {label}: verdict={:?} confidence={} notes={}",
                output.verdict, output.confidence, output.notes
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn peer_review(caller: &dyn LlmCaller, stage1: &[MemberOutput], system_prompt: &str) -> Vec<Ranking> {
    let anonymized = anonymize(stage1);
    let mut rankings = Vec::new();
    for output in stage1 {
        let prompt = format!(
            "Rank the following anonymized reviews best to worst by letter:\n{anonymized}"
        );
        let response = match caller.call(&output.account, system_prompt, &prompt).await {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(account = %output.account, error = %err, "peer review call failed");
                continue;
            }
        };
        let Some(raw) = parse_lenient_json::<RawRanking>(&response) else {
            tracing::warn!(account = %output.account, "peer review response was not parseable");
            continue;
        };
        let order = raw
            .order
            .iter()
            .filter_map(|letter| letter_to_index(letter, stage1.len()))
            .collect();
        rankings.push(Ranking {
            reviewer: output.account.clone(),
            order,
        });
    }
    rankings
}

fn letter_to_index(letter: &str, count: usize) -> Option<usize> {
    let ch = letter.trim().chars().next()?.to_ascii_uppercase();
    let index = (ch as usize).checked_sub('A' as usize)?;
    (index < count).then_some(index)
}

/// Converts each reviewer's 0-based best-to-worst order into 1-based
/// positions and averages them per account across all reviewers.
fn aggregate_rankings(stage1: &[MemberOutput], rankings: &[Ranking]) -> Vec<AggregateRank> {
    let mut positions: HashMap<usize, Vec<f64>> = HashMap::new();
    for ranking in rankings {
        for (position, &index) in ranking.order.iter().enumerate() {
            positions.entry(index).or_default().push((position + 1) as f64);
        }
    }
    let mut aggregate: Vec<AggregateRank> = stage1
        .iter()
        .enumerate()
        .filter_map(|(i, output)| {
            let samples = positions.get(&i)?;
            let average = samples.iter().sum::<f64>() / samples.len() as f64;
            Some(AggregateRank {
                account: output.account.clone(),
                average_position: average,
            })
        })
        .collect();
    aggregate.sort_by(|a, b| a.average_position.total_cmp(&b.average_position));
    aggregate
}

async fn chair_synthesize(
    caller: &dyn LlmCaller,
    stage1: &[MemberOutput],
    rankings: &[AggregateRank],
    chair: &str,
    system_prompt: &str,
    user_prompt: &str,
) -> CouncilResult {
    let participating_members: Vec<String> = stage1.iter().map(|o| o.account.clone()).collect();
    let anonymized = anonymize(stage1);
    let ranking_summary = rankings
        .iter()
        .map(|r| format!("{}: avg position {:.2}", r.account, r.average_position))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = format!(
        "Original request:\n{user_prompt}\n\nMember analyses:\n{anonymized}\n\nAggregate rankings:\n{ranking_summary}\n\nReturn a final verdict."
    );

    let response = match caller.call(chair, system_prompt, &prompt).await {
        Ok(r) => r,
        Err(err) => {
            tracing::warn!(account = %chair, error = %err, "chair call failed");
            return CouncilResult {
                verdict: Verdict::Reject,
                confidence: 0.0,
                notes: format!("chair call failed: {err}"),
                participating_members,
                rankings: rankings.to_vec(),
                degraded: false,
            };
        }
    };

    let Some(raw) = parse_lenient_json::<RawChairVerdict>(&response) else {
        return CouncilResult {
            verdict: Verdict::Reject,
            confidence: 0.0,
            notes: "chair response was not parseable".to_string(),
            participating_members,
            rankings: rankings.to_vec(),
            degraded: false,
        };
    };

    CouncilResult {
        verdict: Verdict::parse_lenient(&raw.verdict),
        confidence: raw.confidence,
        notes: raw.notes,
        participating_members,
        rankings: rankings.to_vec(),
        degraded: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeCaller {
        responses: Mutex<HashMap<String, Vec<String>>>,
    }

    impl FakeCaller {
        fn new(responses: HashMap<String, Vec<String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl LlmCaller for FakeCaller {
        async fn call(&self, account: &str, _system_prompt: &str, _user_prompt: &str) -> Result<String, String> {
            let mut guard = self.responses.lock().unwrap();
            let queue = guard.get_mut(account).ok_or_else(|| format!("no response queued for {account}"))?;
            if queue.is_empty() {
                return Err(format!("response queue exhausted for {account}"));
            }
            Ok(queue.remove(0))
        }
    }

    #[tokio::test]
    async fn all_members_failing_returns_degraded_result() {
        let caller = FakeCaller::new(HashMap::new());
        let result = run_council(&caller, &["alice".to_string()], "bob", "sys", "goal").await;
        assert!(result.degraded);
        assert_eq!(result.verdict, Verdict::Reject);
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn full_happy_path_synthesizes_chair_verdict() {
        let mut responses = HashMap::new();
        responses.insert(
            "alice".to_string(),
            vec![
                r#"{"verdict":"ACCEPT","confidence":0.9,"notes":"looks good"}"#.to_string(),
                r#"{"order":["A"]}"#.to_string(),
            ],
        );
        responses.insert(
            "chairperson".to_string(),
            vec![r#"{"verdict":"ACCEPT_WITH_NOTES","confidence":0.8,"notes":"minor nits"}"#.to_string()],
        );
        let caller = FakeCaller::new(responses);
        let result = run_council(&caller, &["alice".to_string()], "chairperson", "sys", "goal").await;
        assert!(!result.degraded);
        assert_eq!(result.verdict, Verdict::AcceptWithNotes);
        assert_eq!(result.participating_members, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn unknown_chair_verdict_string_normalizes_to_reject() {
        let mut responses = HashMap::new();
        responses.insert(
            "alice".to_string(),
            vec![
                r#"{"verdict":"ACCEPT","confidence":0.9,"notes":"ok"}"#.to_string(),
                r#"{"order":["A"]}"#.to_string(),
            ],
        );
        responses.insert(
            "chairperson".to_string(),
            vec![r#"{"verdict":"MAYBE","confidence":0.5,"notes":"unsure"}"#.to_string()],
        );
        let caller = FakeCaller::new(responses);
        let result = run_council(&caller, &["alice".to_string()], "chairperson", "sys", "goal").await;
        assert_eq!(result.verdict, Verdict::Reject);
    }

    #[tokio::test]
    async fn partial_member_failure_still_synthesizes() {
        let mut responses = HashMap::new();
        responses.insert(
            "alice".to_string(),
            vec![
                r#"{"verdict":"ACCEPT","confidence":0.9,"notes":"ok"}"#.to_string(),
                r#"{"order":["A"]}"#.to_string(),
            ],
        );
        responses.insert(
            "chairperson".to_string(),
            vec![r#"{"verdict":"ACCEPT","confidence":0.7,"notes":""}"#.to_string()],
        );
        let caller = FakeCaller::new(responses);
        let result = run_council(
            &caller,
            &["alice".to_string(), "bob".to_string()],
            "chairperson",
            "sys",
            "goal",
        )
        .await;
        assert!(!result.degraded);
        assert_eq!(result.participating_members, vec!["alice".to_string()]);
    }

    #[test]
    fn aggregate_rankings_average_across_reviewers() {
        let stage1 = vec![
            MemberOutput {
                account: "alice".to_string(),
                verdict: Verdict::Accept,
                confidence: 0.5,
                notes: String::new(),
            },
            MemberOutput {
                account: "bob".to_string(),
                verdict: Verdict::Reject,
                confidence: 0.5,
                notes: String::new(),
            },
        ];
        let rankings = vec![
            Ranking {
                reviewer: "alice".to_string(),
                order: vec![1, 0],
            },
            Ranking {
                reviewer: "bob".to_string(),
                order: vec![0, 1],
            },
        ];
        let aggregate = aggregate_rankings(&stage1, &rankings);
        let alice = aggregate.iter().find(|r| r.account == "alice").unwrap();
        let bob = aggregate.iter().find(|r| r.account == "bob").unwrap();
        assert_eq!(alice.average_position, 1.5);
        assert_eq!(bob.average_position, 1.5);
    }
}
