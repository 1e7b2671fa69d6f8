//! Randomized score payload for the gameplay score submission.
//!
//! A payload describes a two-over innings: every ball is drawn uniformly
//! from [`BALL_OUTCOMES`], and every `"W"` from the third ball onwards is
//! reported as a bowled wicket.

use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;

/// Overs in one innings.
pub const OVERS: usize = 2;

/// Balls in one over.
pub const BALLS_PER_OVER: usize = 6;

/// Every result a single ball can produce.
pub const BALL_OUTCOMES: [&str; 7] = ["0", "1", "2", "3", "4", "6", "W"];

/// Ball result marking a dismissal.
pub const WICKET: &str = "W";

/// Balls before this zero-based index never produce a wicket record.
pub const FIRST_WICKET_BALL: usize = 2;

/// How a batter got out. Only bowled dismissals are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dismissal {
    #[serde(rename = "BOWLED")]
    Bowled,
}

/// A wicket record, serialized as `["<ball index>", "BOWLED"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wicket(pub String, pub Dismissal);

impl Wicket {
    /// Zero-based ball index across the whole innings.
    pub fn ball_index(&self) -> Option<usize> {
        self.0.parse().ok()
    }
}

/// One player's synthetic innings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScorePayload {
    #[serde(rename = "playerId")]
    pub player_id: String,
    #[serde(rename = "RUNS")]
    pub runs: [[&'static str; BALLS_PER_OVER]; OVERS],
    /// Always empty.
    #[serde(rename = "SIX")]
    pub sixes: Vec<String>,
    #[serde(rename = "WICKET")]
    pub wickets: Vec<Wicket>,
}

impl ScorePayload {
    /// All balls of the innings in bowling order.
    pub fn balls(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.runs.iter().flat_map(|over| over.iter().copied())
    }
}

/// Generates a payload from thread-local entropy.
pub fn generate(player_id: &str) -> ScorePayload {
    let mut rng = StdRng::from_rng(&mut rand::rng());
    generate_with_rng(&mut rng, player_id)
}

/// Generates a payload from the given generator. Seeding `rng` makes the
/// result reproducible.
pub fn generate_with_rng(rng: &mut StdRng, player_id: &str) -> ScorePayload {
    let mut runs = [[BALL_OUTCOMES[0]; BALLS_PER_OVER]; OVERS];
    for over in runs.iter_mut() {
        for ball in over.iter_mut() {
            *ball = BALL_OUTCOMES.choose(rng).copied().unwrap_or(BALL_OUTCOMES[0]);
        }
    }

    let wickets = runs
        .iter()
        .flatten()
        .enumerate()
        .filter(|(index, result)| **result == WICKET && *index >= FIRST_WICKET_BALL)
        .map(|(index, _)| Wicket(index.to_string(), Dismissal::Bowled))
        .collect();

    ScorePayload {
        player_id: player_id.to_owned(),
        runs,
        sixes: Vec::new(),
        wickets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload_with(runs: [[&'static str; BALLS_PER_OVER]; OVERS]) -> ScorePayload {
        ScorePayload {
            player_id: "P1".to_string(),
            runs,
            sixes: Vec::new(),
            wickets: vec![Wicket("4".to_string(), Dismissal::Bowled)],
        }
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let a = generate_with_rng(&mut StdRng::seed_from_u64(7), "P1");
        let b = generate_with_rng(&mut StdRng::seed_from_u64(7), "P1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_wickets_match_w_balls_from_third_ball() {
        for seed in 0..200 {
            let payload = generate_with_rng(&mut StdRng::seed_from_u64(seed), "P1");
            let expected: Vec<usize> = payload
                .balls()
                .enumerate()
                .filter(|(i, b)| *b == WICKET && *i >= FIRST_WICKET_BALL)
                .map(|(i, _)| i)
                .collect();
            let actual: Vec<usize> = payload
                .wickets
                .iter()
                .map(|w| w.ball_index().unwrap())
                .collect();
            assert_eq!(actual, expected, "seed {seed}");
        }
    }

    #[test]
    fn test_sixes_always_empty() {
        let payload = generate("P9");
        assert!(payload.sixes.is_empty());
        assert_eq!(payload.player_id, "P9");
    }

    #[test]
    fn test_serialized_shape() {
        let payload = payload_with([
            ["0", "W", "1", "2", "W", "6"],
            ["4", "3", "0", "0", "1", "1"],
        ]);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "playerId": "P1",
                "RUNS": [["0", "W", "1", "2", "W", "6"], ["4", "3", "0", "0", "1", "1"]],
                "SIX": [],
                "WICKET": [["4", "BOWLED"]]
            })
        );
    }

    #[test]
    fn test_balls_iterates_in_bowling_order() {
        let payload = payload_with([
            ["0", "1", "2", "3", "4", "6"],
            ["W", "0", "1", "2", "3", "4"],
        ]);
        let balls: Vec<&str> = payload.balls().collect();
        assert_eq!(balls.len(), OVERS * BALLS_PER_OVER);
        assert_eq!(balls[6], "W");
    }
}
