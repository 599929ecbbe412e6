//! aster-client entry point: positional server address, handshake, then
//! the headless prediction loop. The rendering front-end sits on top of
//! the coordinator's world and effect queue; it is not part of the core.

use std::net::ToSocketAddrs;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use log::{error, info};

use aster_client::{ClientConfig, ClientNetworkManager};
use aster_game::{GameDriver, Role};
use aster_shared::TickConfig;

/// Configuration or initialization failure.
const EXIT_CONFIG_FAILURE: u8 = 84;

#[derive(Parser, Debug)]
#[command(
    name = "aster-client",
    about = "aster game client",
    disable_version_flag = true
)]
struct Cli {
    /// Server host.
    #[arg(default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(default_value_t = 4242)]
    port: u16,

    /// Player name (up to 32 bytes on the wire).
    #[arg(default_value = "Player")]
    name: String,
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

    let server_addr = match (cli.host.as_str(), cli.port).to_socket_addrs() {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => addr,
            None => {
                error!("could not resolve {}:{}", cli.host, cli.port);
                return ExitCode::from(EXIT_CONFIG_FAILURE);
            }
        },
        Err(resolve_error) => {
            error!(
                "could not resolve {}:{}: {}",
                cli.host, cli.port, resolve_error
            );
            return ExitCode::from(EXIT_CONFIG_FAILURE);
        }
    };

    let mut net = ClientNetworkManager::new(ClientConfig::new(server_addr, cli.name));
    let player_id = match net.connect() {
        Ok(player_id) => player_id,
        Err(client_error) => {
            error!("connection failed: {}", client_error);
            return ExitCode::from(EXIT_CONFIG_FAILURE);
        }
    };

    let mut driver = GameDriver::new(Role::Client, true, TickConfig::from_hz(60));
    driver.coordinator_mut().set_local_player(player_id);
    if let Err(ecs_error) = driver.coordinator_mut().register_systems() {
        error!("system registration failed: {}", ecs_error);
        return ExitCode::from(EXIT_CONFIG_FAILURE);
    }
    // Headless client reports ready immediately; a menu front-end would
    // gate this on user action.
    driver.coordinator_mut().queue_player_ready(true);

    let running = driver.running_flag();
    if let Err(signal_error) = ctrlc::set_handler(move || {
        info!("shutdown requested");
        running.store(false, std::sync::atomic::Ordering::SeqCst);
    }) {
        error!("could not install signal handler: {}", signal_error);
        return ExitCode::from(EXIT_CONFIG_FAILURE);
    }

    driver.run_client(&mut net);
    net.disconnect();
    info!("goodbye");
    ExitCode::SUCCESS
}
