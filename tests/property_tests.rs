//! Property-based tests for the score payload generator and config validation.
//!
//! Uses proptest to verify invariants across randomized inputs:
//! - Every payload is a 2x6 grid of legal ball results
//! - Wicket records point exactly at the "W" balls from the third ball on
//! - Payloads serialize with the wire field names
//! - Validation accepts ordered wait ranges and rejects inverted ones

use crimson_loadtest::loadtest::config::LoadTestConfig;
use crimson_loadtest::loadtest::error::LoadTestError;
use crimson_loadtest::loadtest::score::{
    generate, generate_with_rng, Dismissal, BALLS_PER_OVER, BALL_OUTCOMES, FIRST_WICKET_BALL,
    OVERS, WICKET,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

proptest! {
    /// Every ball of every over is one of the seven legal outcomes.
    #[test]
    fn prop_balls_are_legal(seed in any::<u64>(), player in "[A-Za-z0-9]{1,24}") {
        let mut rng = StdRng::seed_from_u64(seed);
        let payload = generate_with_rng(&mut rng, &player);

        prop_assert_eq!(payload.runs.len(), OVERS);
        prop_assert_eq!(payload.balls().count(), OVERS * BALLS_PER_OVER);
        for ball in payload.balls() {
            prop_assert!(BALL_OUTCOMES.contains(&ball), "illegal ball {}", ball);
        }
        prop_assert_eq!(payload.player_id, player);
        prop_assert!(payload.sixes.is_empty());
    }

    /// Wicket records are exactly the "W" balls at index >= 2, in order.
    #[test]
    fn prop_wickets_match_balls(seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let payload = generate_with_rng(&mut rng, "P1");

        let expected: Vec<usize> = payload
            .balls()
            .enumerate()
            .filter(|(i, b)| *b == WICKET && *i >= FIRST_WICKET_BALL)
            .map(|(i, _)| i)
            .collect();
        let actual: Vec<usize> = payload
            .wickets
            .iter()
            .filter_map(|w| w.ball_index())
            .collect();

        prop_assert_eq!(actual.len(), payload.wickets.len());
        prop_assert_eq!(actual, expected);
        prop_assert!(payload.wickets.iter().all(|w| w.1 == Dismissal::Bowled));
        prop_assert!(payload
            .wickets
            .iter()
            .all(|w| w.ball_index().is_some_and(|i| i < OVERS * BALLS_PER_OVER)));
    }

    /// The serialized payload carries the four wire keys and nothing else.
    #[test]
    fn prop_payload_wire_shape(seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let payload = generate_with_rng(&mut rng, "P9");
        let value = serde_json::to_value(&payload).unwrap();
        let object = value.as_object().unwrap();

        prop_assert_eq!(object.len(), 4);
        prop_assert_eq!(&value["playerId"], "P9");
        prop_assert_eq!(value["RUNS"].as_array().map(Vec::len), Some(OVERS));
        prop_assert_eq!(value["SIX"].as_array().map(Vec::len), Some(0));
        for wicket in value["WICKET"].as_array().unwrap() {
            prop_assert_eq!(&wicket[1], "BOWLED");
        }
    }

    /// Ordered wait ranges validate, inverted ones never do.
    #[test]
    fn prop_wait_range_validation(a in 0u64..10_000, b in 0u64..10_000) {
        let mut config = LoadTestConfig::default();
        config.settings.wait_min_ms = Some(a);
        config.settings.wait_max_ms = Some(b);

        let result = config.validate();
        if a <= b {
            prop_assert!(result.is_ok());
        } else {
            let is_validation_error = matches!(result, Err(LoadTestError::ConfigValidation { .. }));
            prop_assert!(is_validation_error);
        }
    }
}

#[test]
fn test_generate_never_records_early_wickets() {
    for _ in 0..500 {
        let payload = generate("P1");
        assert!(payload
            .wickets
            .iter()
            .all(|w| w.ball_index().is_some_and(|i| i >= FIRST_WICKET_BALL)));
    }
}
