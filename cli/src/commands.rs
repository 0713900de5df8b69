use std::io::Write;

use bossfall_core::encounter::{EncounterStatus, format_clock, format_duration};
use bossfall_core::reward::Payout;
use bossfall_core::storage::StateWriter;
use bossfall_core::world::{AreaEffectKind, EffectAction};
use bossfall_core::{
    Actor, Announcement, AppConfigExt, Damager, PayoutReport, StatusEffect, WorldEvent, load_definitions,
};
use chrono::Utc;

use crate::context::CliContext;

// ─────────────────────────────────────────────────────────────────────────────
// Encounter Commands
// ─────────────────────────────────────────────────────────────────────────────

pub async fn list(ctx: &CliContext) -> Result<(), String> {
    let statuses = ctx.service.statuses().await.map_err(|e| e.to_string())?;
    if statuses.is_empty() {
        println!("No encounters configured");
        return Ok(());
    }

    println!("{:<20} {:<20} {:<8} {:<22} Expires", "Encounter", "Mob", "State", "Next spawn");
    println!("{}", "-".repeat(80));
    for status in &statuses {
        println!(
            "{:<20} {:<20} {:<8} {:<22} {}",
            status.id,
            status.mob,
            if status.alive { "alive" } else { "idle" },
            next_spawn_label(status),
            status
                .seconds_until_expiry
                .map(format_duration)
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    Ok(())
}

fn next_spawn_label(status: &EncounterStatus) -> String {
    match (status.next_spawn, status.seconds_until_spawn) {
        (Some(at), Some(secs)) => format!("{} (in {})", format_clock(at, status.zone), format_duration(secs)),
        _ => "unscheduled".to_string(),
    }
}

pub async fn spawn(ctx: &CliContext, id: Option<&str>) -> Result<(), String> {
    match id {
        Some(id) => {
            let mob = ctx.service.force_spawn(id).await.map_err(|e| e.to_string())?;
            println!("Spawned {id} ({mob})");
        }
        None => {
            let outcomes = ctx.service.force_spawn_all().await.map_err(|e| e.to_string())?;
            for (id, outcome) in outcomes {
                match outcome {
                    Ok(mob) => println!("Spawned {id} ({mob})"),
                    Err(e) => println!("Failed to spawn {id}: {e}"),
                }
            }
        }
    }
    show_announcements(ctx).await
}

pub async fn despawn(ctx: &CliContext, id: Option<&str>) -> Result<(), String> {
    match id {
        Some(id) => {
            let removed = ctx.service.despawn(id).await.map_err(|e| e.to_string())?;
            if removed {
                println!("Despawned {id}");
            } else {
                println!("{id} is not alive");
            }
        }
        None => {
            let count = ctx.service.despawn_all().await.map_err(|e| e.to_string())?;
            println!("Despawned {count} encounters");
        }
    }
    Ok(())
}

pub async fn reload(ctx: &CliContext) -> Result<(), String> {
    let (path, zone) = {
        let config = ctx.config.read().await;
        (config.definitions_path(), config.default_zone())
    };
    let definitions = load_definitions(&path, zone).map_err(|e| e.to_string())?;
    let count = definitions.len();

    let worlds: Vec<String> = definitions
        .iter()
        .filter_map(|d| d.spawn_location().map(|l| l.world))
        .collect();
    ctx.service
        .with_host(move |host| {
            for world in &worlds {
                host.load_world(world);
            }
        })
        .await
        .map_err(|e| e.to_string())?;

    let report = ctx.service.reload(definitions).await.map_err(|e| e.to_string())?;
    println!(
        "Reloaded {count} encounters from {} ({} bosses kept, {} dropped)",
        path.display(),
        report.restored,
        report.discarded
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Participant Commands
// ─────────────────────────────────────────────────────────────────────────────

pub async fn join(ctx: &CliContext, name: &str) -> Result<(), String> {
    let participant = ctx.participant(name).await;
    let id = participant.id;
    ctx.service
        .with_host(move |host| host.set_online(id, true))
        .await
        .map_err(|e| e.to_string())?;
    ctx.service
        .handle_event(WorldEvent::ParticipantJoined { participant })
        .await
        .map_err(|e| e.to_string())?;
    println!("{name} joined");
    Ok(())
}

pub async fn leave(ctx: &CliContext, name: &str) -> Result<(), String> {
    let id = ctx.participant(name).await.id;
    ctx.service
        .with_host(move |host| host.set_online(id, false))
        .await
        .map_err(|e| e.to_string())?;
    println!("{name} left");
    Ok(())
}

pub async fn who(ctx: &CliContext) -> Result<(), String> {
    let participants = ctx.participants().await;
    if participants.is_empty() {
        println!("No participants yet");
        return Ok(());
    }
    let ids: Vec<_> = participants.iter().map(|p| p.id).collect();
    let online = ctx
        .service
        .with_host(move |host| {
            use bossfall_core::world::RewardHost;
            ids.iter().map(|id| host.is_online(*id)).collect::<Vec<_>>()
        })
        .await
        .map_err(|e| e.to_string())?;
    for (participant, online) in participants.iter().zip(online) {
        println!(
            "{:<20} {:<8} {}",
            participant.name,
            if online { "online" } else { "offline" },
            participant.id
        );
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Combat Commands
// ─────────────────────────────────────────────────────────────────────────────

pub async fn hit(ctx: &CliContext, name: &str, encounter: &str, amount: f64) -> Result<(), String> {
    let mob = ctx.live_mob(encounter).await?;
    let player = ctx.participant(name).await;
    send(
        ctx,
        WorldEvent::DamageDealt {
            attacker: Damager::Direct(Actor::Player(player)),
            victim: Actor::Mob(mob),
            amount,
        },
    )
    .await
}

pub async fn bite(ctx: &CliContext, encounter: &str, name: &str, amount: f64) -> Result<(), String> {
    let mob = ctx.live_mob(encounter).await?;
    let player = ctx.participant(name).await;
    send(
        ctx,
        WorldEvent::DamageDealt {
            attacker: Damager::Direct(Actor::Mob(mob)),
            victim: Actor::Player(player),
            amount,
        },
    )
    .await
}

/// A thrown potion landing on the boss: the area event names the thrower,
/// the effect event lands on the same tick.
pub async fn splash(
    ctx: &CliContext,
    name: &str,
    encounter: &str,
    effect: &str,
    amplifier: u32,
    seconds: u32,
) -> Result<(), String> {
    let effect = StatusEffect::from_name(effect).ok_or_else(|| format!("unknown effect '{effect}'"))?;
    let mob = ctx.live_mob(encounter).await?;
    let player = ctx.participant(name).await;
    let tick = ctx.game_tick();

    send(
        ctx,
        WorldEvent::AreaEffectApplied {
            kind: AreaEffectKind::Splash,
            source: Actor::Player(player),
            affected: vec![Actor::Mob(mob)],
            tick,
        },
    )
    .await?;
    send(
        ctx,
        WorldEvent::EffectApplied {
            target: Actor::Mob(mob),
            effect,
            amplifier,
            duration_ticks: seconds.saturating_mul(20),
            action: EffectAction::Added,
            tick,
        },
    )
    .await
}

pub async fn kill(ctx: &CliContext, encounter: &str, by: Option<&str>) -> Result<(), String> {
    let mob = ctx.live_mob(encounter).await?;
    let killer = match by {
        Some(name) => Some(ctx.participant(name).await),
        None => None,
    };
    ctx.service
        .with_host(move |host| host.vanish_mob(mob))
        .await
        .map_err(|e| e.to_string())?;
    let report = ctx
        .service
        .handle_event(WorldEvent::MobDied { mob, killer })
        .await
        .map_err(|e| e.to_string())?;

    show_announcements(ctx).await?;
    if let Some(report) = report {
        print_report(ctx, &report).await;
    }
    Ok(())
}

async fn send(ctx: &CliContext, event: WorldEvent) -> Result<(), String> {
    ctx.service
        .handle_event(event)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

async fn print_report(ctx: &CliContext, report: &PayoutReport) {
    if report.payouts.is_empty() && report.failures == 0 {
        println!("No rewards paid");
        return;
    }
    for payout in &report.payouts {
        let line = match payout {
            Payout::CommandDispatched { participant, command } => {
                format!("{}: ran `{command}`", label(ctx, *participant).await)
            }
            Payout::CommandQueued { participant, command } => {
                format!("{}: queued `{command}`", label(ctx, *participant).await)
            }
            Payout::LootTableRolled {
                participant,
                table,
                rolls,
            } => format!("{}: rolled {table} x{rolls}", label(ctx, *participant).await),
            Payout::ItemGiven {
                participant,
                item,
                dropped,
            } => format!(
                "{}: {} x{}{}",
                label(ctx, *participant).await,
                item.key,
                item.amount,
                if dropped.is_some() { " (overflow dropped)" } else { "" }
            ),
            Payout::ItemQueued { participant, item } => format!(
                "{}: queued {} x{}",
                label(ctx, *participant).await,
                item.material,
                item.amount
            ),
        };
        println!("  {line}");
    }
    if report.failures > 0 {
        println!("  {} rewards failed, see log", report.failures);
    }
}

async fn label(ctx: &CliContext, participant: bossfall_types::ParticipantId) -> String {
    ctx.participant_name(participant)
        .await
        .unwrap_or_else(|| participant.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Announcements
// ─────────────────────────────────────────────────────────────────────────────

/// Print and clear everything broadcast since the last call
pub async fn show_announcements(ctx: &CliContext) -> Result<(), String> {
    let announcements = ctx
        .service
        .with_host(|host| host.take_announcements())
        .await
        .map_err(|e| e.to_string())?;
    for announcement in &announcements {
        if let Some(line) = describe(announcement) {
            println!("[broadcast] {line}");
        }
    }
    Ok(())
}

fn describe(announcement: &Announcement) -> Option<String> {
    let line = match announcement {
        Announcement::Spawned { encounter, mob } => format!("{mob} has appeared! ({encounter})"),
        Announcement::SpawnWarning { mob, minutes, .. } => {
            let unit = if *minutes == 1 { "minute" } else { "minutes" };
            format!("{mob} spawns in {minutes} {unit}")
        }
        Announcement::CountdownShown { mob, .. } => format!("{mob} countdown started"),
        // Per-second progress is only interesting to a boss bar
        Announcement::CountdownProgress { .. } | Announcement::CountdownHidden { .. } => return None,
        Announcement::Died { mob, killer, .. } => match killer {
            Some(killer) => format!("{mob} was slain by {killer}"),
            None => format!("{mob} has died"),
        },
        Announcement::Ranking { mob, category, lines, .. } => {
            let mut text = format!("{mob} {category} ranking:");
            for line in lines {
                text.push_str(&format!(
                    "\n    #{} {} {:.1} ({:.1}%)",
                    line.rank, line.name, line.score, line.percent
                ));
            }
            text
        }
        Announcement::PendingDelivered { participant, count } => {
            format!("delivered {count} pending rewards to {participant}")
        }
    };
    Some(line)
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

pub async fn show_config(ctx: &CliContext) -> Result<(), String> {
    let config = ctx.config.read().await;
    println!("data directory:    {}", config.data_dir().display());
    println!("definitions:       {}", config.definitions_path().display());
    println!("default timezone:  {}", config.default_zone());
    println!("tick interval:     {}ms", config.tick_interval_ms);
    println!("delivery delay:    {}s", config.pending_delivery_delay_secs);
    println!("debug logging:     {}", config.debug_logging);
    println!("service running:   {}", ctx.tasks.lock().await.is_running());
    println!("now:               {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    Ok(())
}

pub fn exit() {
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, "quitting...");
    let _ = stdout.flush();
}

/// Stop the service, then drain the state writer
pub async fn shutdown(ctx: &CliContext, writer: StateWriter) -> Result<(), String> {
    let released = match ctx.service.shutdown().await {
        Ok(released) => released,
        Err(e) => {
            ctx.tasks.lock().await.abort_all().await;
            return Err(e.to_string());
        }
    };
    let (service_task, writer_task) = {
        let mut tasks = ctx.tasks.lock().await;
        (tasks.service.take(), tasks.writer.take())
    };
    if let Some(task) = service_task {
        task.await.map_err(|e| e.to_string())?;
    }
    match writer_task {
        Some(task) => writer.shutdown(task).await,
        None => writer.flush().await,
    }
    println!("\n{} live bosses left in place for the next start", released.len());
    Ok(())
}
