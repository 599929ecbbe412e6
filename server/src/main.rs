//! aster-server entry point: CLI parsing, logging, signal handling and
//! the blocking server loop.

use std::process::ExitCode;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::Parser;
use log::{error, info};

use aster_game::{EntityBuilders, GameDriver, Role};
use aster_server::{ServerConfig, ServerNetworkManager};
use aster_shared::{EnemyKind, EnemySpawn, TickConfig, Wave};

/// Configuration or initialization failure.
const EXIT_CONFIG_FAILURE: u8 = 84;

#[derive(Parser, Debug)]
#[command(
    name = "aster-server",
    about = "Authoritative aster game server",
    disable_version_flag = true
)]
struct Cli {
    /// Listen port.
    #[arg(short = 'p', long = "port", default_value_t = 4242)]
    port: u16,

    /// Connection slot capacity (1-1000).
    #[arg(short = 'm', long = "maxplayer", visible_alias = "mp", default_value_t = 16)]
    maxplayer: u32,

    /// Tick rate in Hz (1-1000).
    #[arg(short = 't', long = "tickrate", visible_alias = "tr", default_value_t = 60)]
    tickrate: u32,
}

/// A small built-in level so a bare server is immediately playable; real
/// deployments load wave tables from content.
fn default_waves() -> Vec<Wave> {
    let line = |y: f32, kind: EnemyKind, count: usize, gap: f32| -> Vec<EnemySpawn> {
        (0..count)
            .map(|i| EnemySpawn {
                kind,
                x: 1980.0,
                y,
                delay_after_previous: if i == 0 { 0.0 } else { gap },
            })
            .collect()
    };
    vec![
        Wave {
            start_time: 5.0,
            enemies: line(300.0, EnemyKind::Basic, 4, 0.8),
        },
        Wave {
            start_time: 20.0,
            enemies: line(600.0, EnemyKind::Fast, 6, 0.5),
        },
        Wave {
            start_time: 40.0,
            enemies: {
                let mut enemies = line(400.0, EnemyKind::Tank, 2, 2.0);
                enemies.push(EnemySpawn {
                    kind: EnemyKind::Boss,
                    x: 1980.0,
                    y: 540.0,
                    delay_after_previous: 5.0,
                });
                enemies
            },
        },
    ]
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(parse_error) => {
            let _ = parse_error.print();
            return match parse_error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_CONFIG_FAILURE),
            };
        }
    };

    let config = ServerConfig {
        port: cli.port,
        max_players: cli.maxplayer,
        tick_rate: cli.tickrate,
        heartbeat_timeout: Duration::from_secs(10),
    };
    if let Err(config_error) = config.validate() {
        error!("{}", config_error);
        return ExitCode::from(EXIT_CONFIG_FAILURE);
    }

    info!(
        "starting: port={} maxplayer={} tickrate={} Hz",
        config.port, config.max_players, config.tick_rate
    );

    let mut net = ServerNetworkManager::new(config.clone());
    if let Err(server_error) = net.start() {
        error!("initialization failed: {}", server_error);
        return ExitCode::from(EXIT_CONFIG_FAILURE);
    }

    let mut driver = GameDriver::new(Role::Server, false, TickConfig::from_hz(config.tick_rate));
    driver
        .coordinator_mut()
        .set_game_instance_id(net.game_instance_id());
    if let Err(ecs_error) = driver.coordinator_mut().register_systems() {
        error!("system registration failed: {}", ecs_error);
        return ExitCode::from(EXIT_CONFIG_FAILURE);
    }
    if let Err(ecs_error) =
        EntityBuilders::level(driver.coordinator_mut().world_mut(), default_waves(), 0.0)
    {
        error!("level setup failed: {}", ecs_error);
        return ExitCode::from(EXIT_CONFIG_FAILURE);
    }

    // SIGINT / SIGTERM request a cooperative shutdown.
    let running = driver.running_flag();
    if let Err(signal_error) = ctrlc::set_handler(move || {
        info!("shutdown requested");
        running.store(false, std::sync::atomic::Ordering::SeqCst);
    }) {
        error!("could not install signal handler: {}", signal_error);
        return ExitCode::from(EXIT_CONFIG_FAILURE);
    }

    driver.run_server(&mut net);
    net.stop();
    info!("shutdown complete");
    ExitCode::SUCCESS
}
