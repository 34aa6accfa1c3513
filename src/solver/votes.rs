//! Normalized vote ranking.
//!
//! Every catalog id in a detection's candidate list is a vote for that id.
//! Raw counts are divided by the id's vote weight (how often it appears in the
//! whole distance table) so that stars with many neighbors do not win by
//! sheer frequency.

use std::collections::HashMap;

use crate::DistanceTable;

use super::filter::{Candidate, CandidateLists};

/// A ranked vote for one catalog id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vote {
    pub id: u64,
    /// Number of times the id appears in the candidate list.
    pub count: u32,
    /// `count / vote_weight`.
    pub score: f64,
}

/// Rank the ids of one candidate list by normalized vote, highest first.
///
/// Ties keep the order in which ids were first encountered.
pub fn rank_votes(candidates: &[Candidate], table: &DistanceTable) -> Vec<Vote> {
    let mut order: Vec<u64> = Vec::new();
    let mut counts: HashMap<u64, u32> = HashMap::new();
    for c in candidates {
        for id in [c.star_a, c.star_b] {
            let count = counts.entry(id).or_insert_with(|| {
                order.push(id);
                0
            });
            *count += 1;
        }
    }

    let mut votes: Vec<Vote> = order
        .into_iter()
        .map(|id| {
            let count = counts[&id];
            let weight = table.vote_weight(id).max(1);
            Vote {
                id,
                count,
                score: count as f64 / weight as f64,
            }
        })
        .collect();
    // `sort_by` is stable.
    votes.sort_by(|a, b| b.score.total_cmp(&a.score));
    votes
}

/// Ranked votes for every detection.
pub fn rank_all(lists: &CandidateLists, table: &DistanceTable) -> Vec<Vec<Vote>> {
    (0..lists.len())
        .map(|d| rank_votes(lists.of(d), table))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance_table::DistanceRecord;

    fn table() -> DistanceTable {
        // Weights: 1 -> 4, 2 -> 1, 3 -> 2, 4 -> 1, 5 -> 2, 6 -> 2
        DistanceTable::from_records(vec![
            DistanceRecord::new(1, 2, 0.0, 0.0, 0.1),
            DistanceRecord::new(1, 3, 0.0, 0.0, 0.2),
            DistanceRecord::new(1, 5, 0.0, 0.0, 0.3),
            DistanceRecord::new(1, 6, 0.0, 0.0, 0.4),
            DistanceRecord::new(3, 4, 0.0, 0.0, 0.5),
            DistanceRecord::new(5, 6, 0.0, 0.0, 0.6),
        ])
    }

    #[test]
    fn votes_are_normalized_by_weight() {
        let candidates = [
            Candidate::new(1, 2, 1),
            Candidate::new(1, 3, 2),
            Candidate::new(3, 4, 3),
        ];
        let votes = rank_votes(&candidates, &table());
        let ids: Vec<u64> = votes.iter().map(|v| v.id).collect();
        // 2: 1/1, 3: 2/2, 4: 1/1, 1: 2/4
        assert_eq!(ids, vec![2, 3, 4, 1]);
        let one = votes.iter().find(|v| v.id == 1).unwrap();
        assert_eq!(one.count, 2);
        assert!((one.score - 0.5).abs() < 1e-15);
    }

    #[test]
    fn ties_keep_first_encounter_order() {
        let candidates = [Candidate::new(5, 6, 1), Candidate::new(3, 4, 2)];
        let votes = rank_votes(&candidates, &table());
        let ids: Vec<u64> = votes.iter().map(|v| v.id).collect();
        // 4: 1/1 leads, then 5, 6, 3 all at 1/2 in encounter order
        assert_eq!(ids, vec![4, 5, 6, 3]);
    }

    #[test]
    fn empty_candidates_have_no_votes() {
        assert!(rank_votes(&[], &table()).is_empty());
    }
}
