//! Majority-vote arbitration over conflicting position reports

use crate::protocol::PositionReport;
use crate::GameTime;

/// Turns the reports several observers made about one entity into a single
/// authoritative position.
#[derive(Debug, Clone, Copy)]
pub struct PositionArbitrator {
    /// Maximum distance from a cluster's seed for a report to join it
    epsilon: f64,
}

impl PositionArbitrator {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Picks the position most reporters agree on.
    ///
    /// All reports must describe the same entity. Returns `None` for an empty
    /// slice and the lone report for a single one; otherwise the mean of the
    /// largest cluster, with ties going to the cluster seeded first.
    pub fn arbitrate(&self, reports: &[PositionReport]) -> Option<PositionReport> {
        match reports {
            [] => None,
            [only] => Some(only.clone()),
            _ => {
                let clusters = self.cluster(reports);

                // Strict comparison keeps the earliest cluster on ties
                let mut winner = &clusters[0];
                for cluster in &clusters[1..] {
                    if cluster.len() > winner.len() {
                        winner = cluster;
                    }
                }

                average(reports, winner)
            }
        }
    }

    /// Groups reports into clusters of indices, in input order.
    ///
    /// Membership is decided against the seed only: two members of one
    /// cluster may be further than epsilon apart from each other.
    pub fn cluster(&self, reports: &[PositionReport]) -> Vec<Vec<usize>> {
        let mut assigned = vec![false; reports.len()];
        let mut clusters = Vec::new();

        for (seed_idx, seed) in reports.iter().enumerate() {
            if assigned[seed_idx] {
                continue;
            }
            assigned[seed_idx] = true;

            let seed_pos = seed.position();
            let mut members = vec![seed_idx];

            for (idx, candidate) in reports.iter().enumerate().skip(seed_idx + 1) {
                if !assigned[idx] && seed_pos.distance(&candidate.position()) <= self.epsilon {
                    assigned[idx] = true;
                    members.push(idx);
                }
            }

            clusters.push(members);
        }

        clusters
    }
}

fn average(reports: &[PositionReport], members: &[usize]) -> Option<PositionReport> {
    let first = reports.get(*members.first()?)?;

    let (mut sum_x, mut sum_y, mut sum_time) = (0.0, 0.0, 0 as GameTime);
    for &idx in members {
        let report = &reports[idx];
        sum_x += report.x;
        sum_y += report.y;
        sum_time += report.time;
    }

    let count = members.len();
    Some(PositionReport {
        entity_id: first.entity_id.clone(),
        x: sum_x / count as f64,
        y: sum_y / count as f64,
        time: sum_time / count as GameTime,
    })
}
