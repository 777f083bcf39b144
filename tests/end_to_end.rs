//! Whole-pipeline behaviour on synthetic spikes.

use spikemeter::config::AnalyzerConfig;
use spikemeter::detector::SpikeAnalyzer;
use spikemeter::harness::{run_waveform, Waveform};
use spikemeter::state::TickEvent;

const PULSE: [f64; 9] = [0.25, 0.5, 1.0, 0.9, 0.75, 0.6, 0.45, 0.3, 0.15];

fn config() -> AnalyzerConfig {
    AnalyzerConfig {
        threshold: 0.5,
        window_ms: 10.0,
        slope_ms: 2.0,
        filter_taps: 0,
        history_ms: 100.0,
        ..AnalyzerConfig::default()
    }
}

fn single_spike() -> Waveform {
    Waveform::new().hold(0.0, 50).points(&PULSE).hold(0.0, 41)
}

#[test]
fn synthetic_spike_is_measured() {
    let mut analyzer = SpikeAnalyzer::new(config(), 1.0).unwrap();
    let rec = run_waveform(&mut analyzer, &single_spike());

    assert_eq!(rec.spikes.len(), 1, "exactly one spike");
    let spike = rec.spikes[0];
    // The peak test fires three ticks after the apex at 52.
    assert_eq!(spike.peak_tick, 55);
    assert_eq!(spike.pre_mid_tick, 54);
    assert_eq!(spike.post_mid_tick, 58);
    assert_eq!(spike.completed_tick, 61);

    assert!((spike.amplitude - 1.0).abs() < 1e-9);
    assert!(spike.v_min.abs() < 1e-9);
    assert!((spike.v_max - 1.0).abs() < 1e-9);
    // Duration spans the two mid-voltage crossings.
    let span = (spike.post_mid_tick - spike.pre_mid_tick) as f64 * 1.0;
    assert!((spike.duration_ms - span).abs() < 1e-9);
    assert!((spike.depol_slope - 0.125).abs() < 1e-9);
    assert!((spike.repol_slope + 0.075).abs() < 1e-9);
}

#[test]
fn indicator_tracks_post_peak_window() {
    let mut analyzer = SpikeAnalyzer::new(config(), 1.0).unwrap();
    let rec = run_waveform(&mut analyzer, &single_spike());
    assert_eq!(rec.in_spike_ticks(), (55..=60).collect::<Vec<_>>());
    assert_eq!(rec.ticks_with(TickEvent::SpikeDetected), vec![55]);
    assert_eq!(rec.ticks_with(TickEvent::SpikeCompleted), vec![61]);
    // Metrics stay held after completion.
    assert_eq!(rec.outputs[99].last_spike, Some(rec.spikes[0]));
}

#[test]
fn no_retrigger_while_tracking() {
    let mut pulse = PULSE;
    pulse[7] = 2.0;
    let w = Waveform::new().hold(0.0, 50).points(&pulse).hold(0.0, 41);
    let mut analyzer = SpikeAnalyzer::new(config(), 1.0).unwrap();
    let rec = run_waveform(&mut analyzer, &w);

    assert_eq!(rec.spikes.len(), 1);
    assert_eq!(rec.ticks_with(TickEvent::TriggerIgnored), vec![57]);
    assert_eq!(rec.spikes[0].peak_tick, 55);
    assert!((rec.spikes[0].v_max - 1.0).abs() < 1e-9);
}

#[test]
fn spike_train_survives_ring_wrap() {
    let period = Waveform::new().hold(0.0, 25).points(&PULSE).hold(0.0, 6);
    let train = Waveform::new().repeat(&period, 5);
    let mut analyzer = SpikeAnalyzer::new(config(), 1.0).unwrap();
    let rec = run_waveform(&mut analyzer, &train);

    assert_eq!(rec.spikes.len(), 5);
    for (i, spike) in rec.spikes.iter().enumerate() {
        assert_eq!(spike.peak_tick, 30 + 40 * i as i64);
        assert!((spike.duration_ms - 4.0).abs() < 1e-9);
        assert!((spike.amplitude - 1.0).abs() < 1e-9);
    }
    assert_eq!(analyzer.spikes_completed(), 5);
}

#[test]
fn flat_signal_never_fires() {
    let mut analyzer = SpikeAnalyzer::new(config(), 1.0).unwrap();
    let rec = run_waveform(&mut analyzer, &Waveform::new().hold(0.4, 300));
    assert!(rec.spikes.is_empty());
    assert!(rec.in_spike_ticks().is_empty());
}

#[test]
fn idempotent_reconfiguration_keeps_history() {
    let mut analyzer = SpikeAnalyzer::new(config(), 1.0).unwrap();
    let w = Waveform::new().ramp(1.0, 20);
    run_waveform(&mut analyzer, &w);
    let before: Vec<f64> = (0..20).map(|t| analyzer.ring().read(t)).collect();

    analyzer.reconfigure(config()).unwrap();
    analyzer.reconfigure(config()).unwrap();

    let after: Vec<f64> = (0..20).map(|t| analyzer.ring().read(t)).collect();
    assert_eq!(before, after);
    assert_eq!(analyzer.tick(), 20);
    assert!(analyzer.state().is_idle());
}

#[test]
fn reconfigure_mid_spike_abandons_it() {
    let mut analyzer = SpikeAnalyzer::new(config(), 1.0).unwrap();
    let head = Waveform::new().hold(0.0, 50).points(&PULSE[..6]);
    run_waveform(&mut analyzer, &head);
    assert!(!analyzer.state().is_idle());

    analyzer
        .reconfigure(AnalyzerConfig { threshold: 0.7, ..config() })
        .unwrap();
    let rec = run_waveform(&mut analyzer, &Waveform::new().points(&PULSE[6..]).hold(0.0, 20));
    assert!(rec.spikes.is_empty());
}
