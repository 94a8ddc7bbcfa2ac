use anyhow::{bail, Context, Result};
use csiv_core::{logging, Config};
use csiv_sim::Simulation;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

const DEFAULT_TICKS: u64 = 600;

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    ticks: Option<u64>,
    seed: Option<u64>,
    json_logs: bool,
    sib: bool,
    toggle_at: Option<u64>,
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    ticks: u64,
    sim_time: f64,
    towers: usize,
    chunks: usize,
    observer: csiv_core::Position,
    snapshot: &'a [csiv_trust_mesh::TowerSnapshot],
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&args)?;

    if args.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let ticks = args.ticks.unwrap_or(DEFAULT_TICKS);
    let mut sim = Simulation::new(&config, args.seed)?;
    sim.set_sib_enabled(args.sib);

    info!(ticks, seed = ?args.seed.or(config.simulation.seed), sib = args.sib, "Simulation started");

    for tick in 1..=ticks {
        if args.toggle_at == Some(tick) {
            match sim.toggle_nearest()? {
                Some((id, is_rogue)) => info!(tower_id = %id, is_rogue, tick, "Toggled nearest tower"),
                None => warn!(tick, "No tower to toggle yet"),
            }
        }

        let report = sim.tick()?;
        for sib in &report.sibs {
            println!("{}", serde_json::to_string(sib)?);
        }
    }

    let snapshot = sim.snapshot();
    let summary = Summary {
        ticks,
        sim_time: sim.now(),
        towers: snapshot.len(),
        chunks: sim.world().generated_chunks(),
        observer: sim.observer(),
        snapshot: &snapshot,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    info!(towers = summary.towers, "Simulation finished");
    Ok(())
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value(&mut iter, arg)?)),
            "--ticks" => parsed.ticks = Some(number(&mut iter, arg)?),
            "--seed" => parsed.seed = Some(number(&mut iter, arg)?),
            "--toggle-at" => parsed.toggle_at = Some(number(&mut iter, arg)?),
            "--json-logs" => parsed.json_logs = true,
            "--sib" => parsed.sib = true,
            other => bail!("unknown argument {other}"),
        }
    }

    Ok(parsed)
}

fn value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<&'a String> {
    iter.next()
        .with_context(|| format!("{flag} was provided without a value"))
}

fn number<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<u64> {
    let raw = value(iter, flag)?;
    raw.parse()
        .with_context(|| format!("{flag} expects a non-negative integer, got {raw}"))
}
