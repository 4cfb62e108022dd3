//! Randomized checks of the extrapolation and arbitration invariants
//!
//! Every test uses a fixed seed so failures reproduce.

use assert_approx_eq::assert_approx_eq;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use shared::{KinematicState, PositionArbitrator, PositionReport, Vector2};

const CASES: usize = 500;

fn random_state(rng: &mut StdRng) -> KinematicState {
    let mut state = KinematicState::new(
        "alice",
        Vector2::new(rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0)),
        rng.gen_range(0..100_000),
    );
    let direction = Vector2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
    let checkpoint = state.checkpoint;
    state.set_velocity(checkpoint, direction, 10.0);
    state
}

/// KINEMATICS PROPERTIES
mod kinematics_properties {
    use super::*;

    /// Equal time steps produce equal displacements, wherever they start
    #[test]
    fn prediction_is_affine_in_time() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..CASES {
            let state = random_state(&mut rng);
            let a = state.checkpoint + rng.gen_range(-5_000..5_000);
            let b = state.checkpoint + rng.gen_range(-5_000..5_000);
            let step = rng.gen_range(0..10_000);

            let from_a = state.predict(a + step);
            let base_a = state.predict(a);
            let from_b = state.predict(b + step);
            let base_b = state.predict(b);

            assert_approx_eq!(from_a.x - base_a.x, from_b.x - base_b.x, 1e-6);
            assert_approx_eq!(from_a.y - base_a.y, from_b.y - base_b.y, 1e-6);
        }
    }

    /// Advancing the checkpoint never changes any prediction
    #[test]
    fn advance_preserves_trajectory() {
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..CASES {
            let original = random_state(&mut rng);
            let mut advanced = original.clone();
            let to = original.checkpoint + rng.gen_range(-5_000..5_000);
            advanced.advance(to);

            assert_eq!(advanced.checkpoint, to);
            let probe = original.checkpoint + rng.gen_range(-10_000..10_000);
            let expected = original.predict(probe);
            let actual = advanced.predict(probe);
            assert_approx_eq!(expected.x, actual.x, 1e-6);
            assert_approx_eq!(expected.y, actual.y, 1e-6);
        }
    }

    /// Changing velocity keeps the position at the moment of change
    #[test]
    fn velocity_change_is_continuous() {
        let mut rng = StdRng::seed_from_u64(13);

        for _ in 0..CASES {
            let mut state = random_state(&mut rng);
            let at = state.checkpoint + rng.gen_range(0..5_000);
            let before = state.predict(at);

            let direction = Vector2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            state.set_velocity(at, direction, 10.0);

            let after = state.predict(at);
            assert_approx_eq!(before.x, after.x, 1e-9);
            assert_approx_eq!(before.y, after.y, 1e-9);
        }
    }
}

/// ARBITRATION PROPERTIES
mod arbitration_properties {
    use super::*;

    fn tight_majority(rng: &mut StdRng) -> (Vector2, Vec<PositionReport>) {
        let center = Vector2::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
        let majority = rng.gen_range(2..8);
        let minority = rng.gen_range(0..majority);

        let mut reports = Vec::new();
        for _ in 0..majority {
            // Inside a disc of radius 0.5 every pair is within 1.0
            let angle = rng.gen_range(0.0..std::f64::consts::TAU);
            let radius = rng.gen_range(0.0..0.5);
            reports.push(PositionReport::new(
                "alice",
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
                rng.gen_range(1_000..2_000),
            ));
        }
        for _ in 0..minority {
            let angle = rng.gen_range(0.0..std::f64::consts::TAU);
            let radius = rng.gen_range(10.0..40.0);
            reports.push(PositionReport::new(
                "alice",
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
                rng.gen_range(1_000..2_000),
            ));
        }
        (center, reports)
    }

    /// A strict majority agreeing within tolerance always wins, in any order
    #[test]
    fn majority_wins_regardless_of_order() {
        let mut rng = StdRng::seed_from_u64(17);
        let arbitrator = PositionArbitrator::new(1.0);

        for _ in 0..CASES {
            let (center, mut reports) = tight_majority(&mut rng);
            reports.shuffle(&mut rng);

            let verdict = arbitrator.arbitrate(&reports).unwrap();
            assert!(
                verdict.position().distance(&center) < 0.5,
                "verdict {:?} far from {:?}",
                verdict,
                center
            );
        }
    }

    /// The verdict time lies within the reported times and keeps the entity id
    #[test]
    fn verdict_time_is_bounded_by_inputs() {
        let mut rng = StdRng::seed_from_u64(19);
        let arbitrator = PositionArbitrator::new(1.0);

        for _ in 0..CASES {
            let count = rng.gen_range(1..10);
            let reports: Vec<PositionReport> = (0..count)
                .map(|_| {
                    PositionReport::new(
                        "bob",
                        rng.gen_range(-3.0..3.0),
                        rng.gen_range(-3.0..3.0),
                        rng.gen_range(0..10_000),
                    )
                })
                .collect();

            let verdict = arbitrator.arbitrate(&reports).unwrap();
            let min = reports.iter().map(|r| r.time).min().unwrap();
            let max = reports.iter().map(|r| r.time).max().unwrap();

            assert_eq!(verdict.entity_id, "bob");
            assert!(verdict.time >= min && verdict.time <= max);
        }
    }

    /// Clusters partition the input and every member lies within epsilon of its seed
    #[test]
    fn clusters_are_seed_relative() {
        let mut rng = StdRng::seed_from_u64(23);
        let arbitrator = PositionArbitrator::new(1.0);

        for _ in 0..CASES {
            let count = rng.gen_range(1..10);
            let reports: Vec<PositionReport> = (0..count)
                .map(|_| {
                    PositionReport::new("bob", rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), 0)
                })
                .collect();

            let clusters = arbitrator.cluster(&reports);

            // Every index lands in exactly one cluster
            let mut seen: Vec<usize> = clusters.iter().flatten().copied().collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..reports.len()).collect::<Vec<_>>());

            // Seeds open clusters in input order
            let seeds: Vec<usize> = clusters.iter().map(|members| members[0]).collect();
            assert!(seeds.windows(2).all(|w| w[0] < w[1]));

            for members in &clusters {
                let seed = reports[members[0]].position();
                for &member in members {
                    assert!(member >= members[0]);
                    assert!(seed.distance(&reports[member].position()) <= 1.0);
                }
            }
        }
    }
}
