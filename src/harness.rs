//! Test harness: synthetic waveforms and a runner that records every tick.

use crate::detector::SpikeAnalyzer;
use crate::rt::{process_block_safe, AnalyzerHandle};
use crate::state::{SpikeMetrics, TickEvent, TickOutputs};

/// Piecewise synthetic signal, one value per tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waveform {
    samples: Vec<f64>,
}

impl Waveform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repeat `value` for `ticks` ticks.
    pub fn hold(mut self, value: f64, ticks: usize) -> Self {
        self.samples.extend(std::iter::repeat(value).take(ticks));
        self
    }

    /// Linear ramp from the last sample (0.0 if empty) to `to`, ending exactly on `to`.
    pub fn ramp(mut self, to: f64, ticks: usize) -> Self {
        let from = self.samples.last().copied().unwrap_or(0.0);
        for i in 1..=ticks {
            self.samples.push(from + (to - from) * i as f64 / ticks as f64);
        }
        self
    }

    /// Append explicit samples.
    pub fn points(mut self, values: &[f64]) -> Self {
        self.samples.extend_from_slice(values);
        self
    }

    /// Append `count` copies of another waveform.
    pub fn repeat(mut self, other: &Waveform, count: usize) -> Self {
        for _ in 0..count {
            self.samples.extend_from_slice(&other.samples);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }
}

/// Everything an analyzer produced for a waveform.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    pub outputs: Vec<TickOutputs>,
    pub spikes: Vec<SpikeMetrics>,
}

impl Recording {
    /// Ticks carrying `event`.
    pub fn ticks_with(&self, event: TickEvent) -> Vec<usize> {
        self.outputs
            .iter()
            .enumerate()
            .filter(|(_, o)| o.event == event)
            .map(|(tick, _)| tick)
            .collect()
    }

    /// Ticks on which the in-spike indicator was set.
    pub fn in_spike_ticks(&self) -> Vec<usize> {
        self.outputs
            .iter()
            .enumerate()
            .filter(|(_, o)| o.in_spike)
            .map(|(tick, _)| tick)
            .collect()
    }
}

/// Feed `waveform` tick by tick and record every output.
pub fn run_waveform(analyzer: &mut SpikeAnalyzer, waveform: &Waveform) -> Recording {
    let mut recording = Recording {
        outputs: Vec::with_capacity(waveform.len()),
        spikes: Vec::new(),
    };
    for &raw in waveform.samples() {
        let out = analyzer.execute(raw);
        if let Some(metrics) = out.completed() {
            recording.spikes.push(*metrics);
        }
        recording.outputs.push(out);
    }
    recording
}

/// Feed `waveform` through a handle in blocks of `block` ticks.
pub fn run_handle_blocks(handle: &mut AnalyzerHandle, waveform: &Waveform, block: usize) -> Recording {
    let mut recording = Recording::default();
    let mut out = vec![TickOutputs::default(); block.max(1)];
    for chunk in waveform.samples().chunks(block.max(1)) {
        let out = &mut out[..chunk.len()];
        process_block_safe(handle, chunk, out);
        for o in out.iter() {
            if let Some(metrics) = o.completed() {
                recording.spikes.push(*metrics);
            }
        }
        recording.outputs.extend_from_slice(out);
    }
    recording
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerConfig;

    #[test]
    fn waveform_segments() {
        let w = Waveform::new().hold(0.0, 2).ramp(1.0, 4).points(&[0.5]);
        assert_eq!(w.samples(), &[0.0, 0.0, 0.25, 0.5, 0.75, 1.0, 0.5]);
        let twice = Waveform::new().repeat(&w, 2);
        assert_eq!(twice.len(), 14);
    }

    #[test]
    fn runners_agree() {
        let config = AnalyzerConfig {
            threshold: 0.5,
            window_ms: 10.0,
            history_ms: 100.0,
            ..AnalyzerConfig::default()
        };
        let w = Waveform::new()
            .hold(0.0, 5)
            .points(&[1.0, 0.95, 0.9, 0.8])
            .hold(0.0, 20);
        let mut analyzer = SpikeAnalyzer::new(config, 1.0).unwrap();
        let direct = run_waveform(&mut analyzer, &w);

        let (mut handle, _control) = AnalyzerHandle::new_with_channels(config, 1.0).unwrap();
        let blocked = run_handle_blocks(&mut handle, &w, 7);

        assert_eq!(direct.outputs, blocked.outputs);
        assert_eq!(direct.spikes.len(), 1);
        assert_eq!(direct.ticks_with(TickEvent::SpikeDetected), vec![8]);
    }
}
