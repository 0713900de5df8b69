use crate::status_effect::StatusEffect;
use bossfall_types::{MobId, ParticipantId};

/// A connected player as the world reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// The ultimate source or target of an action
#[derive(Debug, Clone, PartialEq)]
pub enum Actor {
    Player(Participant),
    Mob(MobId),
    /// Anything else (environment, untracked entities)
    Other,
}

impl Actor {
    pub fn as_player(&self) -> Option<&Participant> {
        match self {
            Actor::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_mob(&self) -> Option<MobId> {
        match self {
            Actor::Mob(id) => Some(*id),
            _ => None,
        }
    }
}

/// The entity that directly dealt damage.
///
/// Indirect damagers carry the actor responsible for them. Attribution
/// unwraps exactly one level.
#[derive(Debug, Clone, PartialEq)]
pub enum Damager {
    Direct(Actor),
    Projectile { shooter: Actor },
    TamedCreature { owner: Actor },
    Explosive { igniter: Actor },
    AreaCloud { source: Actor },
}

impl Damager {
    /// The actor credited with this damage
    pub fn responsible(&self) -> &Actor {
        match self {
            Damager::Direct(actor)
            | Damager::Projectile { shooter: actor }
            | Damager::TamedCreature { owner: actor }
            | Damager::Explosive { igniter: actor }
            | Damager::AreaCloud { source: actor } => actor,
        }
    }

    pub fn responsible_player(&self) -> Option<&Participant> {
        self.responsible().as_player()
    }

    pub fn responsible_mob(&self) -> Option<MobId> {
        self.responsible().as_mob()
    }
}

/// What happened to a status effect on its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectAction {
    Added,
    Changed,
    Removed,
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaEffectKind {
    /// Thrown potion bursting on impact
    Splash,
    /// Lingering cloud applying effects over time
    Cloud,
}

/// Combat and session events fed to the engine.
///
/// `tick` is the host's game-tick counter (20 per second), used only for
/// short attribution windows.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    DamageDealt {
        attacker: Damager,
        victim: Actor,
        /// Final damage after the host's mitigation
        amount: f64,
    },
    EffectApplied {
        target: Actor,
        effect: StatusEffect,
        amplifier: u32,
        duration_ticks: u32,
        action: EffectAction,
        tick: u64,
    },
    AreaEffectApplied {
        kind: AreaEffectKind,
        source: Actor,
        affected: Vec<Actor>,
        tick: u64,
    },
    MobDied {
        mob: MobId,
        killer: Option<Participant>,
    },
    ParticipantJoined {
        participant: Participant,
    },
}
