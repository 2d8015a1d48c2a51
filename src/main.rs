/*
 *  main.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Entry point - configuration, logging, panel setup and the render loop
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use anyhow::Context;
use env_logger::Env;
use log::{error, info, warn};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

use showtime::config;
use showtime::display::{DisplayError, SerialDisplay};
use showtime::scheduler::{RotationScheduler, TabRegistry};
use showtime::tabs::AnyTab;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Asynchronously waits for a SIGINT, SIGTERM, or SIGHUP signal.
/// Once a signal is caught it logs the event and returns, allowing for
/// graceful shutdown.
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

/// Clear whatever the panel shows after power up and set the orientation
async fn prepare_panel(display: &mut SerialDisplay, rotation: u8) -> Result<(), DisplayError> {
    display.reset().await?;
    display.set_rotation(rotation).await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load().context("Unable to load configuration")?;

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_level()))
        .format_timestamp_secs()
        .init();

    info!("{} - tabs on a serial screen", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let registry = TabRegistry::<AnyTab>::from_config(&cfg).context("Unable to build tabs")?;
    info!("Tabs: {}", registry.titles().join(", "));
    let mut scheduler = RotationScheduler::new(registry, cfg.start_index(), cfg.interval())
        .context("Invalid rotation settings")?;

    let mut display = SerialDisplay::open(cfg.port())
        .with_context(|| format!("Unable to open display on {}", cfg.port()))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal_handler().await {
            Ok(()) => {
                let _ = shutdown_tx.send(true);
            }
            Err(e) => warn!("Signal handlers unavailable: {}", e),
        }
    });

    info!("Waiting {:?} for the panel to boot", cfg.boot_delay());
    display.flush(cfg.boot_delay()).await?;

    match prepare_panel(&mut display, cfg.rotation()).await {
        Ok(()) => scheduler.run(&mut display, shutdown_rx).await,
        Err(e) => error!("Panel setup failed: {}", e),
    }

    if let Err(e) = display.cleanup().await {
        warn!("Panel cleanup failed: {}", e);
    }
    info!("Stopped");
    Ok(())
}
