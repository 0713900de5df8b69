use bossfall_types::{ContributionCategory, ParticipantId};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{ItemCatalog, ItemStack, PendingItem, PendingRewardQueue, PickupGuard, granted_amount, sanitize_loot_table, sanitize_name};
use crate::encounter::{EncounterDefinition, RewardSettings, RewardTier};
use crate::tracker::{CategorySnapshots, RankedContribution, RankingSnapshot};
use crate::world::{Announcement, Broadcaster, DroppedItemId, RankingLine, RewardHost};

/// Lines per broadcast ranking
pub const RANKING_DISPLAY_LIMIT: usize = 10;

/// Mutable state reward resolution touches
pub struct RewardCtx<'a, H: ?Sized> {
    pub host: &'a mut H,
    pub pending: &'a mut PendingRewardQueue,
    pub guard: &'a mut PickupGuard,
    pub now: DateTime<Utc>,
}

/// One thing handed out (or owed)
#[derive(Debug, Clone, PartialEq)]
pub enum Payout {
    CommandDispatched {
        participant: ParticipantId,
        command: String,
    },
    CommandQueued {
        participant: ParticipantId,
        command: String,
    },
    LootTableRolled {
        participant: ParticipantId,
        table: String,
        rolls: u32,
    },
    ItemGiven {
        participant: ParticipantId,
        item: ItemStack,
        dropped: Option<DroppedItemId>,
    },
    ItemQueued {
        participant: ParticipantId,
        item: PendingItem,
    },
}

/// Outcome of one distribution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayoutReport {
    pub payouts: Vec<Payout>,
    /// Rewards skipped because of configuration or host failures
    pub failures: usize,
}

impl PayoutReport {
    pub fn for_participant(&self, participant: ParticipantId) -> impl Iterator<Item = &Payout> {
        self.payouts.iter().filter(move |payout| match payout {
            Payout::CommandDispatched { participant: p, .. }
            | Payout::CommandQueued { participant: p, .. }
            | Payout::LootTableRolled { participant: p, .. }
            | Payout::ItemGiven { participant: p, .. }
            | Payout::ItemQueued { participant: p, .. } => *p == participant,
        })
    }
}

/// Top lines of a ranking with each participant's share of the total
pub fn ranking_lines(snapshot: &RankingSnapshot) -> Vec<RankingLine> {
    snapshot
        .top(RANKING_DISPLAY_LIMIT)
        .iter()
        .map(|entry| RankingLine {
            rank: entry.rank,
            participant: entry.participant,
            name: entry.name.clone(),
            score: entry.score,
            percent: snapshot.share_percent(entry),
        })
        .collect()
}

/// tier × global, and × last-hit for the killing blow in the damage category
pub fn effective_multiplier(
    settings: &RewardSettings,
    tier: &RewardTier,
    snapshot: &RankingSnapshot,
    participant: ParticipantId,
) -> f64 {
    let mut multiplier = tier.multiplier * settings.global_multiplier;
    if snapshot.category == ContributionCategory::Damage && snapshot.last_hit == Some(participant) {
        multiplier *= settings.last_hit_multiplier;
    }
    multiplier
}

/// Broadcast rankings and pay every tier of every enabled category.
///
/// Categories are independent: an empty or disabled one is skipped without
/// affecting the others, and a rank beyond the ranking length pays nobody.
pub fn distribute_rewards<H>(
    definition: &EncounterDefinition,
    snapshots: &CategorySnapshots,
    ctx: &mut RewardCtx<'_, H>,
) -> PayoutReport
where
    H: RewardHost + ItemCatalog + Broadcaster + ?Sized,
{
    let settings = &definition.rewards;
    let mut report = PayoutReport::default();
    if !settings.enabled {
        return report;
    }

    for category in ContributionCategory::ALL {
        let Some(section) = settings.category(category) else {
            continue;
        };
        let snapshot = snapshots.get(category);
        if snapshot.is_empty() {
            debug!(encounter = %definition.id, %category, "No contributors, skipping category");
            continue;
        }

        ctx.host.announce(Announcement::Ranking {
            encounter: definition.id.clone(),
            mob: definition.mob.clone(),
            category,
            lines: ranking_lines(snapshot),
        });

        for tier in &section.tiers {
            let Some(entry) = snapshot.at_rank(tier.rank) else {
                continue;
            };
            let multiplier = effective_multiplier(settings, tier, snapshot, entry.participant);
            pay_tier(settings, tier, entry, multiplier, ctx, &mut report);
        }
    }

    info!(
        encounter = %definition.id,
        payouts = report.payouts.len(),
        failures = report.failures,
        "Rewards distributed"
    );
    report
}

fn pay_tier<H>(
    settings: &RewardSettings,
    tier: &RewardTier,
    entry: &RankedContribution,
    multiplier: f64,
    ctx: &mut RewardCtx<'_, H>,
    report: &mut PayoutReport,
) where
    H: RewardHost + ItemCatalog + Broadcaster + ?Sized,
{
    let participant = entry.participant;
    let Some(name) = sanitize_name(&entry.name) else {
        warn!(%participant, name = %entry.name, "Participant name sanitizes to nothing, skipping payout");
        report.failures += 1;
        return;
    };
    let online = ctx.host.is_online(participant);

    // ─── Commands ───────────────────────────────────────────────────────────
    for template in &tier.commands {
        let command = template.replace("{player}", &name);
        if !online {
            ctx.pending.queue_command(participant, command.clone(), ctx.now);
            report.payouts.push(Payout::CommandQueued { participant, command });
            continue;
        }
        match ctx.host.dispatch_command(&command) {
            Ok(()) => report.payouts.push(Payout::CommandDispatched { participant, command }),
            Err(e) => {
                warn!(%participant, %command, error = %e, "Reward command failed");
                report.failures += 1;
            }
        }
    }

    // ─── Loot tables (connected participants only) ──────────────────────────
    if online {
        let rolls = if settings.multiply_loot_tables {
            granted_amount(1, multiplier)
        } else {
            1
        };
        for raw in &tier.loot_tables {
            let Some(table) = sanitize_loot_table(raw) else {
                warn!(table = %raw, "Loot table name sanitizes to nothing, skipping");
                report.failures += 1;
                continue;
            };
            let mut rolled = 0;
            for _ in 0..rolls {
                match ctx.host.run_loot_table(&table, &name) {
                    Ok(()) => rolled += 1,
                    Err(e) => {
                        warn!(%participant, %table, error = %e, "Loot table roll failed");
                        report.failures += 1;
                        break;
                    }
                }
            }
            if rolled > 0 {
                report.payouts.push(Payout::LootTableRolled {
                    participant,
                    table,
                    rolls: rolled,
                });
            }
        }
    }

    // ─── Items ──────────────────────────────────────────────────────────────
    for spec in &tier.items {
        let amount = granted_amount(spec.amount, multiplier);
        let stack = match spec.resolve(&*ctx.host, amount) {
            Ok(stack) => stack,
            Err(e) => {
                warn!(%participant, material = %spec.material, error = %e, "Reward item unavailable");
                report.failures += 1;
                continue;
            }
        };

        if !online {
            let item = PendingItem::from_spec(spec, amount);
            ctx.pending.queue_item(participant, item.clone(), ctx.now);
            report.payouts.push(Payout::ItemQueued { participant, item });
            continue;
        }

        let dropped = match ctx.host.give_item(participant, stack.clone()) {
            None => None,
            Some(leftover) => {
                let dropped = ctx.host.drop_item(participant, leftover);
                if let Some(id) = dropped
                    && settings.protection.enabled
                {
                    ctx.guard.protect(id, participant, &settings.protection, ctx.now);
                }
                dropped
            }
        };
        report.payouts.push(Payout::ItemGiven {
            participant,
            item: stack,
            dropped,
        });
    }
}
