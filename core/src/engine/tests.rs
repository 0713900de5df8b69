use bossfall_types::{Location, MobId, ParticipantId};
use chrono::{TimeZone, Utc};

use super::*;
use crate::encounter::{CategoryRewards, ItemKind, ItemSpec, ProtectionSettings, RewardSettings, RewardTier};
use crate::sandbox::{MemorySink, SandboxWorld};
use crate::world::{Actor, Damager, MobEngine, Participant};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap()
}

fn secs(n: i64) -> DateTime<Utc> {
    t0() + TimeDelta::seconds(n)
}

fn origin() -> Location {
    Location::new("world", 0.0, 64.0, 0.0)
}

fn rewarded(id: &str) -> EncounterDefinition {
    EncounterDefinition::new(id, "SkeletonKing")
        .with_schedule(&["09:00"], Tz::UTC)
        .with_location(origin(), 10.0)
        .with_rewards(RewardSettings {
            enabled: true,
            damage: Some(CategoryRewards {
                enabled: true,
                tiers: vec![RewardTier {
                    rank: 1,
                    multiplier: 1.0,
                    commands: vec!["give {player} diamond 1".to_string()],
                    loot_tables: Vec::new(),
                    items: vec![ItemSpec {
                        kind: ItemKind::Inventory,
                        material: "gold_ingot".to_string(),
                        id: None,
                        amount: 2,
                        display_name: None,
                    }],
                }],
            }),
            ..RewardSettings::default()
        })
}

fn engine_with(definitions: Vec<EncounterDefinition>) -> (EncounterEngine<SandboxWorld>, MemorySink) {
    let sink = MemorySink::new();
    let engine = EncounterEngine::new(
        SandboxWorld::new().with_world("world"),
        definitions,
        PendingSnapshot::new(),
        EngineSinks {
            live: Box::new(sink.clone()),
            pending: Box::new(sink.clone()),
        },
        EngineSettings::default(),
    );
    (engine, sink)
}

fn hit(engine: &mut EncounterEngine<SandboxWorld>, player: &Participant, mob: MobId, amount: f64) {
    engine.handle_event(
        &WorldEvent::DamageDealt {
            attacker: Damager::Direct(Actor::Player(player.clone())),
            victim: Actor::Mob(mob),
            amount,
        },
        t0(),
    );
}

fn kill(engine: &mut EncounterEngine<SandboxWorld>, mob: MobId, killer: &Participant, now: DateTime<Utc>) -> Option<PayoutReport> {
    engine.host_mut().vanish_mob(mob);
    engine.handle_event(
        &WorldEvent::MobDied {
            mob,
            killer: Some(killer.clone()),
        },
        now,
    )
}

#[test]
fn test_death_announces_and_pays_top_damage() {
    let (mut engine, sink) = engine_with(vec![rewarded("king")]);
    engine.start(&[], t0());
    let alice = Participant::new(ParticipantId::random(), "Alice");
    let bob = Participant::new(ParticipantId::random(), "Bob");
    engine.host_mut().set_online(alice.id, true);
    engine.host_mut().set_online(bob.id, true);

    let mob = engine.force_spawn("king", t0()).unwrap();
    hit(&mut engine, &alice, mob, 120.0);
    hit(&mut engine, &bob, mob, 30.0);
    let report = kill(&mut engine, mob, &bob, secs(5)).unwrap();

    assert_eq!(report.failures, 0);
    assert_eq!(report.for_participant(alice.id).count(), 2);
    assert_eq!(report.for_participant(bob.id).count(), 0);
    assert_eq!(engine.host().dispatched, vec!["give Alice diamond 1"]);
    assert_eq!(engine.host().given.len(), 1);

    let announcements = engine.host_mut().take_announcements();
    assert!(announcements.iter().any(|a| matches!(
        a,
        Announcement::Died { killer: Some(name), .. } if name == "Bob"
    )));
    assert!(announcements.iter().any(|a| matches!(a, Announcement::Ranking { .. })));

    assert!(!engine.scheduler().instance("king").unwrap().is_alive());
    assert!(sink.live_row("king").is_none());
}

#[test]
fn test_unrelated_death_is_ignored() {
    let (mut engine, _) = engine_with(vec![rewarded("king")]);
    engine.start(&[], t0());
    let stranger = Participant::new(ParticipantId::random(), "Carol");

    assert!(kill(&mut engine, MobId::random(), &stranger, t0()).is_none());
}

#[test]
fn test_death_announcement_respects_channels() {
    let mut definition = rewarded("king");
    definition.broadcast.death_chat = false;
    definition.broadcast.death_title = false;
    definition.rewards.enabled = false;
    let (mut engine, _) = engine_with(vec![definition]);
    engine.start(&[], t0());
    let mob = engine.force_spawn("king", t0()).unwrap();
    engine.host_mut().take_announcements();

    let alice = Participant::new(ParticipantId::random(), "Alice");
    let report = kill(&mut engine, mob, &alice, t0()).unwrap();

    assert!(report.payouts.is_empty());
    assert!(engine.host().announcements.is_empty());
}

#[test]
fn test_offline_rewards_delivered_after_join() {
    let (mut engine, sink) = engine_with(vec![rewarded("king")]);
    engine.start(&[], t0());
    let alice = Participant::new(ParticipantId::random(), "Alice");

    let mob = engine.force_spawn("king", t0()).unwrap();
    hit(&mut engine, &alice, mob, 50.0);
    kill(&mut engine, mob, &alice, t0());
    assert_eq!(engine.pending_count(alice.id), 2);
    assert!(engine.host().dispatched.is_empty());

    engine.tick(secs(1));
    assert_eq!(sink.pending_saves(), 1);
    assert_eq!(sink.last_pending().unwrap()[&alice.id].len(), 2);

    engine.host_mut().set_online(alice.id, true);
    engine.handle_event(
        &WorldEvent::ParticipantJoined {
            participant: alice.clone(),
        },
        secs(10),
    );
    engine.tick(secs(11));
    assert_eq!(engine.pending_count(alice.id), 2);

    engine.tick(secs(12));
    assert_eq!(engine.pending_count(alice.id), 0);
    assert_eq!(engine.host().dispatched, vec!["give Alice diamond 1"]);
    assert_eq!(engine.host().given[0].1.amount, 2);
    assert!(engine.host().announcements.iter().any(|a| matches!(
        a,
        Announcement::PendingDelivered { count: 2, .. }
    )));

    engine.tick(secs(13));
    assert!(sink.last_pending().unwrap().is_empty());
}

#[test]
fn test_delivery_waits_for_next_join_if_participant_left() {
    let (mut engine, _) = engine_with(vec![rewarded("king")]);
    engine.start(&[], t0());
    let alice = Participant::new(ParticipantId::random(), "Alice");
    let mob = engine.force_spawn("king", t0()).unwrap();
    hit(&mut engine, &alice, mob, 50.0);
    kill(&mut engine, mob, &alice, t0());

    engine.handle_event(
        &WorldEvent::ParticipantJoined {
            participant: alice.clone(),
        },
        secs(1),
    );
    engine.tick(secs(5));

    assert_eq!(engine.pending_count(alice.id), 2);
    assert!(engine.host().dispatched.is_empty());
}

#[test]
fn test_protected_drop_removed_on_expiry() {
    let mut definition = rewarded("king");
    definition.rewards.protection = ProtectionSettings {
        enabled: true,
        duration_secs: 60,
        expire_action: ExpireAction::Despawn,
    };
    let (mut engine, _) = engine_with(vec![definition]);
    engine.start(&[], t0());
    let alice = Participant::new(ParticipantId::random(), "Alice");
    let bob = ParticipantId::random();
    engine.host_mut().set_online(alice.id, true);
    engine.host_mut().set_capacity(alice.id, 0);

    let mob = engine.force_spawn("king", t0()).unwrap();
    hit(&mut engine, &alice, mob, 50.0);
    kill(&mut engine, mob, &alice, t0());
    let (drop, _, _) = engine.host().dropped[0].clone();

    assert_eq!(engine.can_pickup(drop, bob, secs(10)), PickupDecision::Denied { owner: alice.id });
    engine.tick(secs(59));
    assert!(engine.host().removed_drops.is_empty());
    engine.tick(secs(60));
    assert_eq!(engine.host().removed_drops, vec![drop]);
}

#[test]
fn test_start_restores_saved_boss() {
    let (mut engine, sink) = engine_with(vec![rewarded("king")]);
    let mob = engine.host_mut().insert_mob("SkeletonKing", origin());
    let saved = PersistedEncounterState {
        encounter: "king".to_string(),
        mob,
        spawn_epoch: t0().timestamp() - 10,
        expire_epoch: Some(t0().timestamp() + 100),
    };

    let report = engine.start(&[saved], t0());

    assert_eq!(report.restored, 1);
    assert!(engine.trackers().is_tracking(mob));
    assert_eq!(sink.live_row("king").unwrap().mob, mob);
}

#[test]
fn test_reload_keeps_surviving_bosses() {
    let (mut engine, sink) = engine_with(vec![rewarded("king"), rewarded("lich")]);
    engine.start(&[], t0());
    let king = engine.force_spawn("king", t0()).unwrap();
    let lich = engine.force_spawn("lich", t0()).unwrap();

    let report = engine.reload(vec![rewarded("king")], secs(5));

    assert_eq!(report, RestoreReport { restored: 1, discarded: 1 });
    assert_eq!(engine.scheduler().len(), 1);
    assert_eq!(engine.scheduler().find_by_mob(king), Some("king"));
    assert!(engine.scheduler().is_running());
    assert!(engine.host().find_mob(king).is_some());
    assert!(engine.host().find_mob(lich).is_none());
    assert_eq!(engine.live_states().len(), 1);
    assert!(sink.live_row("lich").is_none());
}

#[test]
fn test_reload_keeps_boss_left_in_world_after_expiry() {
    let mut definition = rewarded("king").with_expire_secs(600);
    definition.clear_on_expire = false;
    let (mut engine, sink) = engine_with(vec![definition.clone()]);
    engine.start(&[], t0());
    let mob = engine.force_spawn("king", t0()).unwrap();

    engine.tick(secs(600));
    assert!(engine.host().find_mob(mob).is_some());
    assert_eq!(sink.live_row("king").unwrap().expire_epoch, None);

    let report = engine.reload(vec![definition], secs(700));

    assert_eq!(report, RestoreReport { restored: 1, discarded: 0 });
    assert_eq!(engine.scheduler().find_by_mob(mob), Some("king"));

    let alice = Participant::new(ParticipantId::random(), "Alice");
    hit(&mut engine, &alice, mob, 40.0);
    assert!(kill(&mut engine, mob, &alice, secs(710)).is_some());
}

#[test]
fn test_shutdown_releases_and_flushes() {
    let (mut engine, sink) = engine_with(vec![rewarded("king")]);
    engine.start(&[], t0());
    let mob = engine.force_spawn("king", t0()).unwrap();

    let released = engine.shutdown(secs(1));

    assert_eq!(released.len(), 1);
    assert_eq!(released[0].mob, mob);
    assert!(engine.host().find_mob(mob).is_some());
    assert!(sink.live_row("king").is_some());
    assert_eq!(sink.pending_saves(), 1);
    assert!(!engine.scheduler().is_running());
}

#[test]
fn test_failed_pending_write_is_retried() {
    let (mut engine, sink) = engine_with(vec![rewarded("king")]);
    engine.start(&[], t0());
    let alice = Participant::new(ParticipantId::random(), "Alice");
    let mob = engine.force_spawn("king", t0()).unwrap();
    hit(&mut engine, &alice, mob, 50.0);
    kill(&mut engine, mob, &alice, t0());

    sink.fail_next_pending();
    engine.tick(secs(1));
    assert_eq!(sink.pending_saves(), 0);

    engine.tick(secs(2));
    engine.tick(secs(3));
    assert_eq!(sink.pending_saves(), 1);
}
