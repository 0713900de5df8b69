use crate::world::Participant;
use bossfall_types::{ContributionCategory, MobId, ParticipantId};
use hashbrown::HashMap;

#[derive(Debug, Clone)]
struct Contribution {
    participant: ParticipantId,
    name: String,
    score: f64,
}

/// Scores for one mob, in first-contribution order
#[derive(Debug, Clone, Default)]
struct ContributionRecord {
    entries: Vec<Contribution>,
    index: HashMap<ParticipantId, usize>,
}

impl ContributionRecord {
    fn add(&mut self, participant: &Participant, amount: f64) {
        match self.index.get(&participant.id) {
            Some(&slot) => {
                let entry = &mut self.entries[slot];
                entry.score += amount;
                // Latest observed name wins
                entry.name.clone_from(&participant.name);
            }
            None => {
                self.index.insert(participant.id, self.entries.len());
                self.entries.push(Contribution {
                    participant: participant.id,
                    name: participant.name.clone(),
                    score: amount,
                });
            }
        }
    }
}

/// Per-mob accumulation shared by the three trackers
#[derive(Debug, Default)]
pub struct ContributionLedger {
    records: HashMap<MobId, ContributionRecord>,
}

impl ContributionLedger {
    pub fn start(&mut self, mob: MobId) {
        self.records.insert(mob, ContributionRecord::default());
    }

    pub fn stop(&mut self, mob: MobId) -> bool {
        self.records.remove(&mob).is_some()
    }

    pub fn is_tracking(&self, mob: MobId) -> bool {
        self.records.contains_key(&mob)
    }

    /// Add to a participant's score. Returns false when the mob is not
    /// tracked or the amount is negative or not finite.
    pub fn add(&mut self, mob: MobId, participant: &Participant, amount: f64) -> bool {
        if !amount.is_finite() || amount < 0.0 {
            return false;
        }
        let Some(record) = self.records.get_mut(&mob) else {
            return false;
        };
        record.add(participant, amount);
        true
    }

    pub fn snapshot(&self, category: ContributionCategory, mob: MobId) -> RankingSnapshot {
        let Some(record) = self.records.get(&mob) else {
            return RankingSnapshot::empty(category);
        };

        let mut sorted: Vec<&Contribution> = record.entries.iter().collect();
        // Stable sort keeps first-contribution order among equal scores
        sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

        let rankings = sorted
            .into_iter()
            .enumerate()
            .map(|(i, c)| RankedContribution {
                rank: i + 1,
                participant: c.participant,
                name: if c.name.is_empty() {
                    "Unknown".to_string()
                } else {
                    c.name.clone()
                },
                score: c.score,
            })
            .collect::<Vec<_>>();
        let total = rankings.iter().map(|r| r.score).sum();

        RankingSnapshot {
            category,
            rankings,
            total,
            last_hit: None,
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn tracked_count(&self) -> usize {
        self.records.len()
    }
}

/// One participant's position in a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct RankedContribution {
    /// 1-based
    pub rank: usize,
    pub participant: ParticipantId,
    pub name: String,
    pub score: f64,
}

/// Immutable ranking of one category for one mob
#[derive(Debug, Clone, PartialEq)]
pub struct RankingSnapshot {
    pub category: ContributionCategory,
    /// Sorted by score, descending
    pub rankings: Vec<RankedContribution>,
    pub total: f64,
    /// Only set for the damage category
    pub last_hit: Option<ParticipantId>,
}

impl RankingSnapshot {
    pub fn empty(category: ContributionCategory) -> Self {
        Self {
            category,
            rankings: Vec::new(),
            total: 0.0,
            last_hit: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rankings.is_empty()
    }

    pub fn top(&self, n: usize) -> &[RankedContribution] {
        &self.rankings[..n.min(self.rankings.len())]
    }

    /// Entry at a 1-based rank
    pub fn at_rank(&self, rank: usize) -> Option<&RankedContribution> {
        rank.checked_sub(1).and_then(|i| self.rankings.get(i))
    }

    pub fn share_percent(&self, entry: &RankedContribution) -> f64 {
        if self.total > 0.0 {
            entry.score / self.total * 100.0
        } else {
            0.0
        }
    }
}
