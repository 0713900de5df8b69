use bossfall_types::{ContributionCategory, ParticipantId};

/// Which broadcast surfaces an announcement may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Channels {
    pub chat: bool,
    pub title: bool,
}

impl Channels {
    pub fn any(&self) -> bool {
        self.chat || self.title
    }
}

/// One line of a broadcast ranking
#[derive(Debug, Clone, PartialEq)]
pub struct RankingLine {
    pub rank: usize,
    pub participant: ParticipantId,
    pub name: String,
    pub score: f64,
    /// Share of the category total, 0 when the total is 0
    pub percent: f64,
}

/// Structured notifications. Rendering to text is the host's job.
#[derive(Debug, Clone, PartialEq)]
pub enum Announcement {
    Spawned {
        encounter: String,
        mob: String,
    },
    SpawnWarning {
        encounter: String,
        mob: String,
        minutes: u32,
        channels: Channels,
    },
    CountdownShown {
        encounter: String,
        mob: String,
    },
    CountdownProgress {
        encounter: String,
        /// 1.0 at one minute out, 0.0 at spawn
        progress: f64,
        seconds_remaining: i64,
    },
    CountdownHidden {
        encounter: String,
    },
    Died {
        encounter: String,
        mob: String,
        killer: Option<String>,
        channels: Channels,
    },
    Ranking {
        encounter: String,
        mob: String,
        category: ContributionCategory,
        lines: Vec<RankingLine>,
    },
    PendingDelivered {
        participant: ParticipantId,
        count: usize,
    },
}

impl Announcement {
    pub fn encounter(&self) -> Option<&str> {
        match self {
            Announcement::Spawned { encounter, .. }
            | Announcement::SpawnWarning { encounter, .. }
            | Announcement::CountdownShown { encounter, .. }
            | Announcement::CountdownProgress { encounter, .. }
            | Announcement::CountdownHidden { encounter }
            | Announcement::Died { encounter, .. }
            | Announcement::Ranking { encounter, .. } => Some(encounter),
            Announcement::PendingDelivered { .. } => None,
        }
    }
}
