/*
 *  main.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Host process: startup, frame loop, control socket and shutdown
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

use xlivebg::api::HostEnv;
use xlivebg::config::{self, Cli};
use xlivebg::control::{self, ControlRequest, ControlServer};
use xlivebg::host::Host;
use xlivebg::pacer::Pacer;
use xlivebg::render::HeadlessBackend;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Asynchronously waits for a SIGINT, SIGTERM, or SIGHUP signal.
///
/// Once a signal is caught it is logged and the function returns, letting
/// the main loop shut down cleanly.
async fn signal_handler() -> Result<(), std::io::Error> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(cli.log_filter()))
        .format_timestamp_secs()
        .init();

    info!("{} v.{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let mut store = config::load_store(&cli).context("loading config")?;
    config::apply_cli_overrides(&mut store, &cli).context("applying command line overrides")?;

    if cli.dump_config {
        print!("{}", config::dump_config(&store)?);
        return Ok(());
    }

    let env = HostEnv::new(cli.screens.clone());
    for (i, scr) in env.screens().iter().enumerate() {
        info!("screen {}: {}", i, scr);
    }

    let mut host = Host::new(store, env, Box::new(HeadlessBackend::new()));
    host.load_plugins(cli.plugin_dir.as_deref());

    if cli.list {
        for p in host.registry().iter() {
            println!("{:<16} {}", p.name(), p.description());
        }
        return Ok(());
    }

    host.init_plugins();
    if host.registry().is_empty() {
        warn!("no live wallpaper plugins found");
    } else if let Err(e) = host.activate_configured() {
        error!("failed to activate live wallpaper: {}", e);
    }

    let socket_path = cli.socket.clone().unwrap_or_else(control::socket_path);
    let (tx, mut rx) = mpsc::channel::<ControlRequest>(16);
    let server = match ControlServer::bind(&socket_path) {
        Ok(server) => Some(server),
        Err(e) => {
            warn!("{}; control socket disabled", e);
            None
        }
    };
    let serve = async {
        match &server {
            Some(server) => server.run(tx).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(serve);

    let shutdown = signal_handler();
    tokio::pin!(shutdown);

    let mut pacer = Pacer::new(host.frame_interval_usec());
    let mut serving = true;

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    error!("signal handler: {}", e);
                }
                break;
            }
            Some(request) = rx.recv() => {
                let reply = control::execute(&mut host, request.command);
                if request.reply.send(reply).is_err() {
                    warn!("control client went away before the reply");
                }
                pacer.set_interval(host.frame_interval_usec());
            }
            _ = tokio::time::sleep(pacer.until_next()) => {
                if pacer.should_draw() {
                    host.draw();
                    pacer.set_interval(host.frame_interval_usec());
                }
            }
            _ = &mut serve, if serving => {
                serving = false;
            }
        }
    }

    host.shutdown();
    drop(host);
    info!("bye");
    Ok(())
}
