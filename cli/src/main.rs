use bossfall_cli::CliContext;
use bossfall_cli::commands;
use bossfall_cli::logging;
use bossfall_cli::readline;
use bossfall_core::engine::{EncounterEngine, EngineSinks};
use bossfall_core::storage::{LiveStateStore, PendingRewardStore, StateWriter};
use bossfall_core::{AppConfig, AppConfigExt, BackgroundTasks, EncounterService, SandboxWorld, load_definitions};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::Write;
use tracing::{error, warn};

/// World every sandbox starts with, besides those the definitions name
const DEFAULT_WORLD: &str = "world";

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = AppConfig::load();
    let data_dir = config.data_dir();
    let _log_guard = logging::init(&data_dir, config.debug_logging);

    let definitions = load_definitions(&config.definitions_path(), config.default_zone()).map_err(|e| {
        error!(error = %e, "Failed to load encounter definitions");
        e.to_string()
    })?;

    let live_store = LiveStateStore::in_dir(&data_dir);
    let pending_store = PendingRewardStore::in_dir(&data_dir);
    let saved = live_store.load().unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring unreadable live state");
        Vec::new()
    });
    let pending = pending_store.load().unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring unreadable pending rewards");
        Default::default()
    });
    let (writer, writer_task) = StateWriter::spawn(live_store, pending_store);

    let mut world = SandboxWorld::new().with_world(DEFAULT_WORLD);
    for location in definitions.iter().filter_map(|d| d.spawn_location()) {
        world.load_world(&location.world);
    }

    let mut engine = EncounterEngine::new(
        world,
        definitions,
        pending,
        EngineSinks {
            live: Box::new(writer.clone()),
            pending: Box::new(writer.clone()),
        },
        config.engine_settings(),
    );
    engine.start(&saved, Utc::now());
    let (service, handle) = EncounterService::new(engine);
    let tasks = BackgroundTasks {
        service: Some(service.spawn()),
        writer: Some(writer_task),
    };
    let ctx = CliContext::new(config, handle, tasks);

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, &ctx).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                write!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    commands::shutdown(&ctx, writer).await
}

#[derive(Parser)]
#[command(version, about = "bossfall encounter sandbox")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every encounter and its timing
    List,
    /// Force-spawn one encounter, or all of them
    Spawn { id: Option<String> },
    /// Remove one live boss, or all of them
    Despawn { id: Option<String> },
    /// Re-read the definitions file
    Reload,
    Join { name: String },
    Leave { name: String },
    /// List known participants
    Who,
    /// A participant damages a boss
    Hit {
        name: String,
        encounter: String,
        amount: f64,
    },
    /// A boss damages a participant
    Bite {
        encounter: String,
        name: String,
        amount: f64,
    },
    /// A participant lands a splash potion on a boss
    Splash {
        name: String,
        encounter: String,
        effect: String,
        #[arg(short, long, default_value_t = 0)]
        amplifier: u32,
        #[arg(short, long, default_value_t = 10)]
        seconds: u32,
    },
    /// Kill a boss and pay out rewards
    Kill {
        encounter: String,
        #[arg(short, long)]
        by: Option<String>,
    },
    /// Print broadcasts since the last command
    News,
    Config,
    Exit,
}

async fn respond(line: &str, ctx: &CliContext) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "bossfall".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match &cli.command {
        Some(Commands::List) => commands::list(ctx).await?,
        Some(Commands::Spawn { id }) => commands::spawn(ctx, id.as_deref()).await?,
        Some(Commands::Despawn { id }) => commands::despawn(ctx, id.as_deref()).await?,
        Some(Commands::Reload) => commands::reload(ctx).await?,
        Some(Commands::Join { name }) => commands::join(ctx, name).await?,
        Some(Commands::Leave { name }) => commands::leave(ctx, name).await?,
        Some(Commands::Who) => commands::who(ctx).await?,
        Some(Commands::Hit {
            name,
            encounter,
            amount,
        }) => commands::hit(ctx, name, encounter, *amount).await?,
        Some(Commands::Bite {
            encounter,
            name,
            amount,
        }) => commands::bite(ctx, encounter, name, *amount).await?,
        Some(Commands::Splash {
            name,
            encounter,
            effect,
            amplifier,
            seconds,
        }) => commands::splash(ctx, name, encounter, effect, *amplifier, *seconds).await?,
        Some(Commands::Kill { encounter, by }) => commands::kill(ctx, encounter, by.as_deref()).await?,
        Some(Commands::News) => commands::show_announcements(ctx).await?,
        Some(Commands::Config) => commands::show_config(ctx).await?,
        Some(Commands::Exit) => {
            commands::exit();
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
