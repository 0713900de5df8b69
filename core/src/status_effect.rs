//! Status effects a host can report on a mob
//!
//! Only the harmful subset counts toward support contribution.

/// Game ticks per second
pub const TICKS_PER_SECOND: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusEffect {
    // Harmful
    Slowness,
    MiningFatigue,
    InstantDamage,
    Nausea,
    Blindness,
    Hunger,
    Weakness,
    Poison,
    Wither,
    Levitation,
    Unluck,
    Darkness,
    Infested,
    Oozing,
    Weaving,
    WindCharged,
    // Beneficial / neutral
    Speed,
    Haste,
    Strength,
    InstantHealth,
    JumpBoost,
    Regeneration,
    Resistance,
    FireResistance,
    WaterBreathing,
    Invisibility,
    NightVision,
    HealthBoost,
    Absorption,
    Saturation,
    Glowing,
    Luck,
    SlowFalling,
    ConduitPower,
    DolphinsGrace,
    BadOmen,
    HeroOfTheVillage,
}

const NAMES: &[(StatusEffect, &str)] = &[
    (StatusEffect::Slowness, "slowness"),
    (StatusEffect::MiningFatigue, "mining_fatigue"),
    (StatusEffect::InstantDamage, "instant_damage"),
    (StatusEffect::Nausea, "nausea"),
    (StatusEffect::Blindness, "blindness"),
    (StatusEffect::Hunger, "hunger"),
    (StatusEffect::Weakness, "weakness"),
    (StatusEffect::Poison, "poison"),
    (StatusEffect::Wither, "wither"),
    (StatusEffect::Levitation, "levitation"),
    (StatusEffect::Unluck, "unluck"),
    (StatusEffect::Darkness, "darkness"),
    (StatusEffect::Infested, "infested"),
    (StatusEffect::Oozing, "oozing"),
    (StatusEffect::Weaving, "weaving"),
    (StatusEffect::WindCharged, "wind_charged"),
    (StatusEffect::Speed, "speed"),
    (StatusEffect::Haste, "haste"),
    (StatusEffect::Strength, "strength"),
    (StatusEffect::InstantHealth, "instant_health"),
    (StatusEffect::JumpBoost, "jump_boost"),
    (StatusEffect::Regeneration, "regeneration"),
    (StatusEffect::Resistance, "resistance"),
    (StatusEffect::FireResistance, "fire_resistance"),
    (StatusEffect::WaterBreathing, "water_breathing"),
    (StatusEffect::Invisibility, "invisibility"),
    (StatusEffect::NightVision, "night_vision"),
    (StatusEffect::HealthBoost, "health_boost"),
    (StatusEffect::Absorption, "absorption"),
    (StatusEffect::Saturation, "saturation"),
    (StatusEffect::Glowing, "glowing"),
    (StatusEffect::Luck, "luck"),
    (StatusEffect::SlowFalling, "slow_falling"),
    (StatusEffect::ConduitPower, "conduit_power"),
    (StatusEffect::DolphinsGrace, "dolphins_grace"),
    (StatusEffect::BadOmen, "bad_omen"),
    (StatusEffect::HeroOfTheVillage, "hero_of_the_village"),
];

impl StatusEffect {
    /// Effects that count as support against a boss
    pub fn is_harmful(self) -> bool {
        matches!(
            self,
            StatusEffect::Slowness
                | StatusEffect::MiningFatigue
                | StatusEffect::InstantDamage
                | StatusEffect::Nausea
                | StatusEffect::Blindness
                | StatusEffect::Hunger
                | StatusEffect::Weakness
                | StatusEffect::Poison
                | StatusEffect::Wither
                | StatusEffect::Levitation
                | StatusEffect::Unluck
                | StatusEffect::Darkness
                | StatusEffect::Infested
                | StatusEffect::Oozing
                | StatusEffect::Weaving
                | StatusEffect::WindCharged
        )
    }

    /// Effects applied once rather than over a duration
    pub fn is_instant(self) -> bool {
        matches!(self, StatusEffect::InstantDamage | StatusEffect::InstantHealth)
    }

    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(effect, _)| *effect == self)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }

    /// Parse a snake_case effect name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        NAMES
            .iter()
            .find(|(_, candidate)| *candidate == name)
            .map(|(effect, _)| *effect)
    }
}
