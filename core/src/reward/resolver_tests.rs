//! Tests for reward distribution
//!
//! Uses the sandbox host to observe dispatched commands, rolled loot tables
//! and given, dropped or queued items.

use bossfall_types::{ContributionCategory, MobId, ParticipantId};
use chrono::{DateTime, TimeDelta, Utc};

use super::*;
use crate::encounter::{
    CategoryRewards, EncounterDefinition, ExpireAction, ItemKind, ItemSpec, ProtectionSettings,
    RewardSettings, RewardTier,
};
use crate::sandbox::SandboxWorld;
use crate::tracker::{CategorySnapshots, Trackers};
use crate::world::{Actor, Announcement, Damager, Participant, WorldEvent};

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn make_tier(rank: usize, multiplier: f64) -> RewardTier {
    RewardTier {
        rank,
        multiplier,
        commands: vec!["give {player} diamond 1".to_string()],
        loot_tables: Vec::new(),
        items: vec![ItemSpec {
            kind: ItemKind::Inventory,
            material: "gold_ingot".to_string(),
            id: None,
            amount: 4,
            display_name: None,
        }],
    }
}

fn make_definition(damage_tiers: Vec<RewardTier>) -> EncounterDefinition {
    EncounterDefinition::new("king", "SkeletonKing").with_rewards(RewardSettings {
        enabled: true,
        damage: Some(CategoryRewards {
            enabled: true,
            tiers: damage_tiers,
        }),
        ..RewardSettings::default()
    })
}

/// Damage snapshot where each (player, amount) hits in order; the last one
/// lands the killing blow.
fn damage_snapshots(hits: &[(&Participant, f64)]) -> CategorySnapshots {
    let boss = MobId::random();
    let mut trackers = Trackers::new();
    trackers.start_all(boss);
    for (player, amount) in hits {
        trackers.handle_event(&WorldEvent::DamageDealt {
            attacker: Damager::Direct(Actor::Player((*player).clone())),
            victim: Actor::Mob(boss),
            amount: *amount,
        });
    }
    trackers.snapshots(boss)
}

struct Fixture {
    host: SandboxWorld,
    pending: PendingRewardQueue,
    guard: PickupGuard,
}

impl Fixture {
    fn new() -> Self {
        Self {
            host: SandboxWorld::new(),
            pending: PendingRewardQueue::new(TimeDelta::zero()),
            guard: PickupGuard::new(),
        }
    }

    fn distribute(&mut self, def: &EncounterDefinition, snapshots: &CategorySnapshots) -> PayoutReport {
        let mut ctx = RewardCtx {
            host: &mut self.host,
            pending: &mut self.pending,
            guard: &mut self.guard,
            now: now(),
        };
        distribute_rewards(def, snapshots, &mut ctx)
    }
}

fn online(fixture: &mut Fixture, name: &str) -> Participant {
    let player = Participant::new(ParticipantId::random(), name);
    fixture.host.set_online(player.id, true);
    player
}

#[test]
fn test_top_ranks_paid_with_multipliers() {
    let mut fx = Fixture::new();
    let (alice, bob) = (online(&mut fx, "Alice"), online(&mut fx, "Bob"));
    let def = make_definition(vec![make_tier(1, 2.0), make_tier(2, 1.0)]);
    let snapshots = damage_snapshots(&[(&bob, 10.0), (&alice, 90.0)]);

    let report = fx.distribute(&def, &snapshots);

    assert_eq!(report.failures, 0);
    assert_eq!(fx.host.dispatched, vec!["give Alice diamond 1", "give Bob diamond 1"]);
    let given: Vec<_> = fx.host.given.iter().map(|(p, s)| (*p, s.amount)).collect();
    assert_eq!(given, vec![(alice.id, 8), (bob.id, 4)]);
}

#[test]
fn test_last_hit_multiplier_only_for_killer() {
    let mut fx = Fixture::new();
    let (alice, bob) = (online(&mut fx, "Alice"), online(&mut fx, "Bob"));
    let mut def = make_definition(vec![make_tier(1, 1.0), make_tier(2, 1.0)]);
    def.rewards.global_multiplier = 1.5;
    def.rewards.last_hit_multiplier = 2.0;
    // Bob lands the final blow from second place
    let snapshots = damage_snapshots(&[(&alice, 100.0), (&bob, 10.0)]);

    fx.distribute(&def, &snapshots);

    let given: Vec<_> = fx.host.given.iter().map(|(p, s)| (*p, s.amount)).collect();
    assert_eq!(given, vec![(alice.id, 6), (bob.id, 12)]);
}

#[test]
fn test_last_hit_ignored_outside_damage() {
    let bob = Participant::new(ParticipantId::random(), "Bob");
    let def = make_definition(Vec::new());
    let snapshots = damage_snapshots(&[(&bob, 10.0)]);
    let tier = make_tier(1, 1.0);
    let mut settings = def.rewards.clone();
    settings.last_hit_multiplier = 3.0;

    let damage = effective_multiplier(&settings, &tier, &snapshots.damage, bob.id);
    let mut as_tank = snapshots.damage.clone();
    as_tank.category = ContributionCategory::Tank;
    let tank = effective_multiplier(&settings, &tier, &as_tank, bob.id);

    assert_eq!(damage, 3.0);
    assert_eq!(tank, 1.0);
}

#[test]
fn test_item_amount_composes_tier_and_global_multipliers() {
    let (alice, bob) = (
        Participant::new(ParticipantId::random(), "Alice"),
        Participant::new(ParticipantId::random(), "Bob"),
    );
    let mut settings = make_definition(Vec::new()).rewards;
    settings.global_multiplier = 1.5;
    settings.last_hit_multiplier = 4.0;
    // Bob holds the last hit, Alice is paid without the bonus
    let snapshots = damage_snapshots(&[(&alice, 100.0), (&bob, 10.0)]);

    let multiplier = effective_multiplier(&settings, &make_tier(1, 2.0), &snapshots.damage, alice.id);
    assert_eq!(granted_amount(3, multiplier), 9);
}

#[test]
fn test_rank_beyond_ranking_pays_nobody() {
    let mut fx = Fixture::new();
    let alice = online(&mut fx, "Alice");
    let def = make_definition(vec![make_tier(1, 1.0), make_tier(2, 1.0), make_tier(3, 1.0)]);
    let snapshots = damage_snapshots(&[(&alice, 10.0)]);

    fx.distribute(&def, &snapshots);

    assert_eq!(fx.host.dispatched, vec!["give Alice diamond 1"]);
}

#[test]
fn test_offline_participant_is_queued() {
    let mut fx = Fixture::new();
    let carol = Participant::new(ParticipantId::random(), "Carol");
    let mut tier = make_tier(1, 1.0);
    tier.loot_tables = vec!["king_drops".to_string()];
    let def = make_definition(vec![tier]);
    let snapshots = damage_snapshots(&[(&carol, 50.0)]);

    let report = fx.distribute(&def, &snapshots);

    assert!(fx.host.dispatched.is_empty());
    assert!(fx.host.loot_rolls.is_empty(), "loot tables are never queued");
    assert!(fx.host.given.is_empty());
    assert_eq!(fx.pending.pending_count(carol.id), 2);
    let queued: Vec<_> = report.for_participant(carol.id).collect();
    assert!(matches!(queued[0], Payout::CommandQueued { command, .. } if command == "give Carol diamond 1"));
    assert!(matches!(queued[1], Payout::ItemQueued { item, .. } if item.amount == 4));
}

#[test]
fn test_unsanitizable_name_skips_whole_payout() {
    let mut fx = Fixture::new();
    let ghost = online(&mut fx, "§§§");
    let def = make_definition(vec![make_tier(1, 1.0)]);
    let snapshots = damage_snapshots(&[(&ghost, 50.0)]);

    let report = fx.distribute(&def, &snapshots);

    assert_eq!(report.failures, 1);
    assert!(report.payouts.is_empty());
    assert!(fx.host.given.is_empty());
}

#[test]
fn test_name_is_sanitized_in_commands() {
    let mut fx = Fixture::new();
    let sneaky = online(&mut fx, "Bob;op Bob");
    let def = make_definition(vec![make_tier(1, 1.0)]);
    let snapshots = damage_snapshots(&[(&sneaky, 50.0)]);

    fx.distribute(&def, &snapshots);

    assert_eq!(fx.host.dispatched, vec!["give BobopBob diamond 1"]);
}

#[test]
fn test_loot_table_multiplication() {
    let mut fx = Fixture::new();
    let alice = online(&mut fx, "Alice");
    let mut tier = make_tier(1, 2.6);
    tier.loot_tables = vec!["king.drops".to_string(), ";;".to_string()];
    let mut def = make_definition(vec![tier]);
    def.rewards.multiply_loot_tables = true;
    let snapshots = damage_snapshots(&[(&alice, 50.0)]);

    let report = fx.distribute(&def, &snapshots);

    assert_eq!(fx.host.loot_rolls.len(), 3);
    assert!(fx.host.loot_rolls.iter().all(|(t, p)| t == "king.drops" && p == "Alice"));
    assert_eq!(report.failures, 1, "empty table name is skipped");
}

#[test]
fn test_overflow_is_dropped_and_protected() {
    let mut fx = Fixture::new();
    let alice = online(&mut fx, "Alice");
    fx.host.set_capacity(alice.id, 1);
    let mut def = make_definition(vec![make_tier(1, 1.0)]);
    def.rewards.protection = ProtectionSettings {
        enabled: true,
        duration_secs: 60,
        expire_action: ExpireAction::Despawn,
    };
    let snapshots = damage_snapshots(&[(&alice, 50.0)]);

    fx.distribute(&def, &snapshots);

    assert_eq!(fx.host.given[0].1.amount, 1);
    let (drop_id, owner, stack) = fx.host.dropped[0].clone();
    assert_eq!(owner, alice.id);
    assert_eq!(stack.amount, 3);
    assert!(fx.guard.is_protected(drop_id));
}

#[test]
fn test_unknown_item_does_not_block_others() {
    let mut fx = Fixture::new();
    let alice = online(&mut fx, "Alice");
    let mut tier = make_tier(1, 1.0);
    tier.items.insert(
        0,
        ItemSpec {
            kind: ItemKind::ExternalId,
            material: "SWORD".to_string(),
            id: Some("NOPE".to_string()),
            amount: 1,
            display_name: None,
        },
    );
    let def = make_definition(vec![tier]);
    let snapshots = damage_snapshots(&[(&alice, 50.0)]);

    let report = fx.distribute(&def, &snapshots);

    assert_eq!(report.failures, 1);
    assert_eq!(fx.host.given.len(), 1);
    assert_eq!(fx.host.given[0].1.key, "GOLD_INGOT");
}

#[test]
fn test_ranking_broadcast_only_for_enabled_nonempty_categories() {
    let mut fx = Fixture::new();
    let alice = online(&mut fx, "Alice");
    let mut def = make_definition(vec![make_tier(1, 1.0)]);
    def.rewards.tank = Some(CategoryRewards {
        enabled: true,
        tiers: vec![make_tier(1, 1.0)],
    });
    let snapshots = damage_snapshots(&[(&alice, 30.0)]);

    fx.distribute(&def, &snapshots);

    let rankings: Vec<_> = fx
        .host
        .announcements
        .iter()
        .filter_map(|a| match a {
            Announcement::Ranking { category, lines, .. } => Some((*category, lines.len())),
            _ => None,
        })
        .collect();
    assert_eq!(rankings, vec![(ContributionCategory::Damage, 1)]);
}

#[test]
fn test_ranking_lines_capped_with_percent() {
    let players: Vec<Participant> = (0..12)
        .map(|i| Participant::new(ParticipantId::random(), format!("P{i}")))
        .collect();
    let hits: Vec<(&Participant, f64)> = players.iter().map(|p| (p, 10.0)).collect();
    let snapshots = damage_snapshots(&hits);

    let lines = ranking_lines(&snapshots.damage);

    assert_eq!(lines.len(), RANKING_DISPLAY_LIMIT);
    assert_eq!(lines[0].name, "P0");
    assert!((lines[0].percent - 100.0 / 12.0).abs() < 1e-9);
}

#[test]
fn test_disabled_rewards_do_nothing() {
    let mut fx = Fixture::new();
    let alice = online(&mut fx, "Alice");
    let mut def = make_definition(vec![make_tier(1, 1.0)]);
    def.rewards.enabled = false;
    let snapshots = damage_snapshots(&[(&alice, 30.0)]);

    let report = fx.distribute(&def, &snapshots);

    assert_eq!(report, PayoutReport::default());
    assert!(fx.host.announcements.is_empty());
}

#[test]
fn test_pending_delivery_blocks_unsafe_commands() {
    let mut host = SandboxWorld::new();
    let player = ParticipantId::random();
    let rewards = vec![
        PendingReward::Command {
            command: "give Carol diamond 1".to_string(),
        },
        PendingReward::Command {
            command: "give Carol diamond 1; op Carol".to_string(),
        },
        PendingReward::Item(PendingItem {
            kind: ItemKind::Inventory,
            material: "EMERALD".to_string(),
            external_id: None,
            amount: 3,
            display_name: None,
        }),
    ];

    let delivered = deliver_pending(player, rewards, &mut host);

    assert_eq!(delivered, 2);
    assert_eq!(host.dispatched, vec!["give Carol diamond 1"]);
    assert_eq!(host.given[0].1.amount, 3);
    assert_eq!(
        host.announcements,
        vec![Announcement::PendingDelivered {
            participant: player,
            count: 2
        }]
    );
}
