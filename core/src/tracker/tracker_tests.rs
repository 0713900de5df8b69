//! Tests for contribution tracking
//!
//! Covers attribution through indirect damagers, ranking order, the support
//! attribution window and per-mob isolation.

use bossfall_types::{ContributionCategory, MobId, ParticipantId};

use super::{ATTRIBUTION_WINDOW_TICKS, ContributionTracker, Trackers, support_score};
use crate::status_effect::StatusEffect;
use crate::world::{Actor, AreaEffectKind, Damager, EffectAction, Participant, WorldEvent};

fn make_player(name: &str) -> Participant {
    Participant::new(ParticipantId::random(), name)
}

fn hit_boss(attacker: Damager, boss: MobId, amount: f64) -> WorldEvent {
    WorldEvent::DamageDealt {
        attacker,
        victim: Actor::Mob(boss),
        amount,
    }
}

fn boss_hits(boss: MobId, victim: &Participant, amount: f64) -> WorldEvent {
    WorldEvent::DamageDealt {
        attacker: Damager::Direct(Actor::Mob(boss)),
        victim: Actor::Player(victim.clone()),
        amount,
    }
}

fn splash(thrower: &Participant, boss: MobId, tick: u64) -> WorldEvent {
    WorldEvent::AreaEffectApplied {
        kind: AreaEffectKind::Splash,
        source: Actor::Player(thrower.clone()),
        affected: vec![Actor::Mob(boss)],
        tick,
    }
}

fn effect(boss: MobId, effect: StatusEffect, amplifier: u32, secs: u32, tick: u64) -> WorldEvent {
    WorldEvent::EffectApplied {
        target: Actor::Mob(boss),
        effect,
        amplifier,
        duration_ticks: secs * 20,
        action: EffectAction::Added,
        tick,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Damage
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_damage_ranking_and_last_hit() {
    let boss = MobId::random();
    let (a, b) = (make_player("Alice"), make_player("Bob"));
    let mut trackers = Trackers::new();
    trackers.start_all(boss);

    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(a.clone())), boss, 100.0));
    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(b.clone())), boss, 50.0));

    let snapshot = trackers.damage.build_snapshot(boss);
    assert_eq!(snapshot.rankings.len(), 2);
    assert_eq!(snapshot.rankings[0].participant, a.id);
    assert_eq!(snapshot.rankings[0].rank, 1);
    assert_eq!(snapshot.total, 150.0);
    assert_eq!(snapshot.last_hit, Some(b.id), "Bob landed the final blow");
}

#[test]
fn test_damage_unwraps_one_level_of_indirection() {
    let boss = MobId::random();
    let archer = make_player("Archer");
    let tamer = make_player("Tamer");
    let bomber = make_player("Bomber");
    let brewer = make_player("Brewer");
    let mut trackers = Trackers::new();
    trackers.start_all(boss);

    let events = [
        hit_boss(Damager::Projectile { shooter: Actor::Player(archer.clone()) }, boss, 10.0),
        hit_boss(Damager::TamedCreature { owner: Actor::Player(tamer.clone()) }, boss, 20.0),
        hit_boss(Damager::Explosive { igniter: Actor::Player(bomber.clone()) }, boss, 30.0),
        hit_boss(Damager::AreaCloud { source: Actor::Player(brewer.clone()) }, boss, 40.0),
        hit_boss(Damager::Projectile { shooter: Actor::Other }, boss, 99.0),
    ];
    for event in &events {
        trackers.handle_event(event);
    }

    let snapshot = trackers.damage.build_snapshot(boss);
    let order: Vec<_> = snapshot.rankings.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(order, vec!["Brewer", "Bomber", "Tamer", "Archer"]);
    assert_eq!(snapshot.total, 100.0, "Unattributable damage is ignored");
}

#[test]
fn test_ties_keep_first_contribution_order() {
    let boss = MobId::random();
    let (a, b, c) = (make_player("A"), make_player("B"), make_player("C"));
    let mut trackers = Trackers::new();
    trackers.start_all(boss);

    for p in [&b, &a, &c] {
        trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(p.clone())), boss, 25.0));
    }

    let snapshot = trackers.damage.build_snapshot(boss);
    let order: Vec<_> = snapshot.rankings.iter().map(|r| r.participant).collect();
    assert_eq!(order, vec![b.id, a.id, c.id]);
}

#[test]
fn test_latest_name_wins() {
    let boss = MobId::random();
    let id = ParticipantId::random();
    let mut trackers = Trackers::new();
    trackers.start_all(boss);

    let old = Participant::new(id, "OldName");
    let new = Participant::new(id, "NewName");
    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(old)), boss, 5.0));
    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(new)), boss, 5.0));

    let snapshot = trackers.damage.build_snapshot(boss);
    assert_eq!(snapshot.rankings.len(), 1);
    assert_eq!(snapshot.rankings[0].name, "NewName");
    assert_eq!(snapshot.rankings[0].score, 10.0);
}

#[test]
fn test_negative_and_nan_damage_ignored() {
    let boss = MobId::random();
    let a = make_player("A");
    let mut trackers = Trackers::new();
    trackers.start_all(boss);

    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(a.clone())), boss, 10.0));
    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(a.clone())), boss, -5.0));
    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(a)), boss, f64::NAN));

    assert_eq!(trackers.damage.build_snapshot(boss).total, 10.0);
}

#[test]
fn test_last_hit_recorded_even_when_amount_rejected() {
    let boss = MobId::random();
    let (a, b) = (make_player("Alice"), make_player("Bob"));
    let mut trackers = Trackers::new();
    trackers.start_all(boss);

    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(a.clone())), boss, 10.0));
    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(b.clone())), boss, f64::NAN));

    let snapshot = trackers.damage.build_snapshot(boss);
    assert_eq!(snapshot.last_hit, Some(b.id));
    assert_eq!(snapshot.rankings.len(), 1);
    assert_eq!(snapshot.total, 10.0);
}

#[test]
fn test_untracked_mob_is_ignored() {
    let boss = MobId::random();
    let other = MobId::random();
    let a = make_player("A");
    let mut trackers = Trackers::new();
    trackers.start_all(boss);

    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(a)), other, 100.0));

    assert!(trackers.damage.build_snapshot(other).is_empty());
    assert!(trackers.damage.build_snapshot(boss).is_empty());
}

#[test]
fn test_concurrent_encounters_are_isolated() {
    let (boss_a, boss_b) = (MobId::random(), MobId::random());
    let p = make_player("P");
    let mut trackers = Trackers::new();
    trackers.start_all(boss_a);
    trackers.start_all(boss_b);

    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(p.clone())), boss_a, 70.0));
    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(p)), boss_b, 3.0));

    assert_eq!(trackers.damage.build_snapshot(boss_a).total, 70.0);
    assert_eq!(trackers.damage.build_snapshot(boss_b).total, 3.0);
}

#[test]
fn test_stop_then_snapshot_is_empty() {
    let boss = MobId::random();
    let p = make_player("P");
    let mut trackers = Trackers::new();
    trackers.start_all(boss);
    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(p)), boss, 70.0));

    trackers.stop_all(boss);

    assert!(!trackers.is_tracking(boss));
    let snapshot = trackers.damage.build_snapshot(boss);
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.last_hit, None);
}

#[test]
fn test_restart_tracking_resets_record() {
    let boss = MobId::random();
    let p = make_player("P");
    let mut trackers = Trackers::new();
    trackers.start_all(boss);
    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(p)), boss, 70.0));

    trackers.start_all(boss);

    assert!(trackers.damage.build_snapshot(boss).is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Tank
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_tank_credits_victims_of_the_boss() {
    let boss = MobId::random();
    let (tank, dps) = (make_player("Tank"), make_player("Dps"));
    let mut trackers = Trackers::new();
    trackers.start_all(boss);

    trackers.handle_event(&boss_hits(boss, &tank, 300.0));
    trackers.handle_event(&boss_hits(boss, &dps, 20.0));
    trackers.handle_event(&WorldEvent::DamageDealt {
        attacker: Damager::Projectile { shooter: Actor::Mob(boss) },
        victim: Actor::Player(dps.clone()),
        amount: 15.0,
    });
    // Some other mob hitting the tank does not count
    trackers.handle_event(&boss_hits(MobId::random(), &tank, 1000.0));

    let snapshot = trackers.tank.build_snapshot(boss);
    assert_eq!(snapshot.category, ContributionCategory::Tank);
    assert_eq!(snapshot.rankings[0].participant, tank.id);
    assert_eq!(snapshot.rankings[1].score, 35.0);
    assert_eq!(snapshot.total, 335.0);
    assert_eq!(snapshot.last_hit, None);
}

// ─────────────────────────────────────────────────────────────────────────────
// Support
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_support_score_formula() {
    assert_eq!(support_score(StatusEffect::Poison, 0, 200), 10.0);
    assert_eq!(support_score(StatusEffect::Slowness, 1, 100), 10.0);
    assert_eq!(support_score(StatusEffect::InstantDamage, 1, 1), 20.0);
    assert_eq!(support_score(StatusEffect::Slowness, 1, 40), 4.0);
    assert_eq!(support_score(StatusEffect::InstantDamage, 0, 400), 10.0);
}

#[test]
fn test_support_within_window_is_credited() {
    let boss = MobId::random();
    let brewer = make_player("Brewer");
    let mut trackers = Trackers::new();
    trackers.start_all(boss);

    trackers.handle_event(&splash(&brewer, boss, 100));
    trackers.handle_event(&effect(boss, StatusEffect::Poison, 1, 10, 100 + ATTRIBUTION_WINDOW_TICKS));

    let snapshot = trackers.support.build_snapshot(boss);
    assert_eq!(snapshot.rankings.len(), 1);
    assert_eq!(snapshot.rankings[0].participant, brewer.id);
    assert_eq!(snapshot.total, 20.0);
}

#[test]
fn test_stale_attribution_is_evicted() {
    let boss = MobId::random();
    let brewer = make_player("Brewer");
    let mut trackers = Trackers::new();
    trackers.start_all(boss);

    trackers.handle_event(&splash(&brewer, boss, 100));
    trackers.handle_event(&effect(boss, StatusEffect::Poison, 0, 10, 106));
    // The stale entry is gone, so even a "fresh-looking" tick finds nothing
    trackers.handle_event(&effect(boss, StatusEffect::Poison, 0, 10, 101));

    assert!(trackers.support.build_snapshot(boss).is_empty());
}

#[test]
fn test_support_ignores_beneficial_and_removals() {
    let boss = MobId::random();
    let brewer = make_player("Brewer");
    let mut trackers = Trackers::new();
    trackers.start_all(boss);
    trackers.handle_event(&splash(&brewer, boss, 10));

    trackers.handle_event(&effect(boss, StatusEffect::Regeneration, 1, 10, 10));
    trackers.handle_event(&WorldEvent::EffectApplied {
        target: Actor::Mob(boss),
        effect: StatusEffect::Wither,
        amplifier: 1,
        duration_ticks: 200,
        action: EffectAction::Removed,
        tick: 10,
    });

    assert!(trackers.support.build_snapshot(boss).is_empty());
}

#[test]
fn test_support_without_splash_is_unattributed() {
    let boss = MobId::random();
    let mut trackers = Trackers::new();
    trackers.start_all(boss);

    trackers.handle_event(&effect(boss, StatusEffect::Weakness, 0, 30, 5));

    assert!(trackers.support.build_snapshot(boss).is_empty());
}

#[test]
fn test_clear_all_drops_everything() {
    let boss = MobId::random();
    let p = make_player("P");
    let mut trackers = Trackers::new();
    trackers.start_all(boss);
    trackers.handle_event(&splash(&p, boss, 1));
    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(p)), boss, 1.0));

    trackers.clear_all();

    assert!(!trackers.is_tracking(boss));
    assert!(trackers.snapshots(boss).damage.is_empty());
}

#[test]
fn test_share_percent() {
    let boss = MobId::random();
    let (a, b) = (make_player("A"), make_player("B"));
    let mut trackers = Trackers::new();
    trackers.start_all(boss);
    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(a)), boss, 75.0));
    trackers.handle_event(&hit_boss(Damager::Direct(Actor::Player(b)), boss, 25.0));

    let snapshot = trackers.damage.build_snapshot(boss);
    assert_eq!(snapshot.share_percent(&snapshot.rankings[0]), 75.0);
    assert_eq!(snapshot.at_rank(2).map(|r| r.name.as_str()), Some("B"));
    assert!(snapshot.at_rank(0).is_none());
    assert!(snapshot.at_rank(3).is_none());
}
