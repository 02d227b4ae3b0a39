// src/main.rs — operator console: connect, apply edits, report telemetry, record
use anyhow::{Context, Result};
use clap::Parser;
use ground_station::{Cli, LinkEngine, LinkEvent, PendingEdit, PendingEdits};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging(log_dir: &Path) -> Result<WorkerGuard> {
    let filter = EnvFilter::from_default_env()
        .add_directive("ground_station=info".parse()?)
        .add_directive("link_protocol=info".parse()?)
        .add_directive("tokio=warn".parse()?);

    let file = tracing_appender::rolling::daily(log_dir, "ground_station.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();
    Ok(guard)
}

fn print_event(event: &LinkEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "event not serializable"),
        }
        return;
    }
    match event {
        LinkEvent::StateChanged(s) => println!("state: {s:?}"),
        LinkEvent::Parameter(p) => println!("{} / {} (#{}) = {}", p.group, p.name, p.id, p.value),
        LinkEvent::EditApplied { location, color } => println!("edit {location} applied [{color}]"),
        LinkEvent::EditRejected { location, color } => println!("edit {location} rejected [{color}]"),
        LinkEvent::Notice(text) => println!("NOTICE: {text}"),
    }
}

const PRINTER_DRAIN: Duration = Duration::from_millis(50);

/// Give the printer a moment to show events already sent, then stop it.
async fn finish_printer(printer: JoinHandle<()>) {
    time::sleep(PRINTER_DRAIN).await;
    printer.abort();
}

fn write_recording(engine: &LinkEngine, path: &Path) -> Result<()> {
    let recorder = engine.recorder();
    let mut bb = recorder.lock();
    bb.stop();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    bb.write_csv(BufWriter::new(file))
        .with_context(|| format!("writing {}", path.display()))?;
    info!(rows = bb.index(), path = %path.display(), "recording saved");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = cli.build_config()?;

    if cli.dump_config {
        print!("{}", toml::to_string_pretty(&cfg)?);
        return Ok(());
    }

    let _log_guard = init_logging(&cli.log_dir)?;
    info!(?cfg, "ground station starting");

    let engine = Arc::new(LinkEngine::new(cfg.clone()));

    // -------- event printer ----------
    let mut events = engine.subscribe();
    let json = cli.json;
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event, json),
                Err(RecvError::Lagged(n)) => warn!(missed = n, "event printer lagging"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if cli.record.is_some() {
        engine.recorder().lock().start();
    }

    // -------- connect + handshake ----------
    if let Err(e) = engine.connect(&cfg.target).await {
        error!(error = %e, target = %cfg.target, "could not connect");
        finish_printer(printer).await;
        return Err(e.into());
    }

    // -------- operator edits ----------
    if !cli.apply.is_empty() {
        let mut pending: PendingEdits = cli
            .apply
            .iter()
            .enumerate()
            .map(|(i, &(id, value))| (format!("cli:{i}"), PendingEdit { id, value }))
            .collect();
        match engine.apply_config(&mut pending).await {
            Ok(report) => info!(
                applied = report.applied.len(),
                rejected = report.rejected.len(),
                "config write finished"
            ),
            Err(e) => warn!(error = %e, "config write refused"),
        }
        if !pending.is_empty() {
            warn!(left = ?pending.keys().collect::<Vec<_>>(), "edits still pending");
        }
    }

    // -------- report until ctrl-c or link loss ----------
    let mut state = engine.watch_state();
    let mut report = time::interval(Duration::from_millis(cli.report_ms.max(1)));
    report.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            r = tokio::signal::ctrl_c() => {
                if let Err(e) = r {
                    warn!(?e, "failed to install Ctrl+C handler");
                }
                info!("shutdown signal received");
                break;
            }
            r = state.changed() => {
                if r.is_err() || !state.borrow_and_update().is_connected() {
                    warn!("link lost");
                    break;
                }
            }
            _ = report.tick() => {
                let t = engine.telemetry();
                if json {
                    println!("{}", serde_json::json!({ "kind": "telemetry", "data": t }));
                } else {
                    println!(
                        "att {:>7.2} {:>7.2} {:>7.2} | eng {:.2} {:.2} {:.2} {:.2} | alt {} | volt {} | cyc {}ms | {}",
                        t.attitude[0], t.attitude[1], t.attitude[2],
                        t.engines[0], t.engines[1], t.engines[2], t.engines[3],
                        t.altitude, t.voltage, t.cycletime,
                        if t.armed { "ARMED" } else { "disarmed" },
                    );
                }
            }
        }
    }

    engine.disconnect().await;
    if let Some(path) = &cli.record {
        write_recording(&engine, path)?;
    }
    finish_printer(printer).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio::sync::broadcast;

    #[tokio::test]
    async fn finishing_the_printer_shows_events_already_sent() {
        let (tx, mut rx) = broadcast::channel(8);
        let shown = Arc::new(Mutex::new(Vec::new()));
        let sink = shown.clone();
        let printer = tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                sink.lock().push(event);
            }
        });

        tx.send(LinkEvent::Notice("Handshake failed: capability discovery".into())).unwrap();
        finish_printer(printer).await;

        assert_eq!(
            *shown.lock(),
            vec![LinkEvent::Notice("Handshake failed: capability discovery".into())]
        );
    }
}
