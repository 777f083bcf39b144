//! Synthetic Spike Train Example
//!
//! Feeds eight action-potential-like waveforms sampled at 10 kHz through a
//! `TickDriver`, prints the metrics of every spike, then runs the same train
//! through the two-thread handle.
//!
//! Usage: `cargo run --example synthetic_train [config.toml]`
//! Set `RUST_LOG=debug` to see analyzer logging.

use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use spikemeter::builder::AnalyzerBuilder;
use spikemeter::config::{load_config, AnalyzerConfig};
use spikemeter::harness::Waveform;
use spikemeter::host::TickDriver;
use spikemeter::state::SpikeMetrics;

const PERIOD_MS: f64 = 0.1;

/// 2 ms at rest (-65 mV), up to +30 in 0.4 ms, down to -75 in 1.5 ms, back over 4 ms.
fn action_potential() -> Waveform {
    Waveform::new()
        .hold(-65.0, 20)
        .ramp(30.0, 4)
        .ramp(-75.0, 15)
        .ramp(-65.0, 40)
        .hold(-65.0, 121)
}

fn demo_config() -> AnalyzerConfig {
    AnalyzerConfig {
        threshold: -20.0,
        window_ms: 5.0,
        slope_ms: 0.2,
        filter_taps: 0,
        history_ms: 100.0,
        ..AnalyzerConfig::default()
    }
}

fn print_spike(i: usize, m: &SpikeMetrics) {
    println!(
        "spike {:>2} @ tick {:>5}: duration {:.2} ms, amplitude {:.1}, min {:.1}, max {:.1}, depol {:.1}, repol {:.1}",
        i, m.peak_tick, m.duration_ms, m.amplitude, m.v_min, m.v_max, m.depol_slope, m.repol_slope
    );
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => load_config(&path)?,
        None => demo_config(),
    };
    let train = Waveform::new().repeat(&action_potential(), 8);

    // Single thread: the host polls period and collects spikes through the driver.
    let analyzer = AnalyzerBuilder::from_config(config, PERIOD_MS).build()?;
    let mut driver = TickDriver::new(analyzer, PERIOD_MS, Vec::new())?;
    driver.run(train.samples())?;
    let (_, spikes) = driver.into_parts();
    println!("TickDriver: {} spikes in {} ticks", spikes.len(), train.len());
    for (i, m) in spikes.iter().enumerate() {
        print_spike(i, m);
    }

    // Two threads: ticks on a worker, metrics drained by the control side.
    let (mut handle, mut control) = AnalyzerBuilder::from_config(config, PERIOD_MS).build_rt()?;
    let samples = train.samples().to_vec();
    let worker = thread::spawn(move || {
        for &s in &samples {
            handle.execute(s);
        }
        handle.analyzer().spikes_completed()
    });
    let completed = worker
        .join()
        .map_err(|_| anyhow::anyhow!("tick thread panicked"))
        .context("running the analyzer handle")?;
    let drained = control.drain_metrics();
    println!(
        "AnalyzerHandle: {} spikes completed, {} delivered",
        completed,
        drained.len()
    );
    Ok(())
}
