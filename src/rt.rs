//! RT module: tick-thread side of a split analyzer.

// IMPORTANT: Do not call assert_invariant or any PPT logging in RT paths to avoid locks/allocs.

use crate::config::AnalyzerConfig;
use crate::control::{new_control_queue, new_metrics_queue, AnalyzerControl, ControlMsg};
use crate::detector::SpikeAnalyzer;
use crate::error::AnalyzerError;
use crate::invariant_rt::{
    new_invariant_queue, signal_invariant, INV_CONFIG_APPLIED, INV_CONTROL_MSG_PROCESSED,
    INV_CONTROL_REJECTED, INV_METRICS_DROPPED, INV_PERIOD_APPLIED, INV_SPIKE_COMPLETED,
    INV_SPIKE_DETECTED, INV_STATE_RESET, INV_TRIGGER_IGNORED,
};
use crate::state::{SpikeMetrics, TickEvent, TickOutputs};
use rtrb::{Consumer, Producer};

/// Tick-thread owner of a [`SpikeAnalyzer`].
///
/// Applies queued control messages at the start of each tick, then executes.
/// Completed metrics and invariant signals are pushed to the paired
/// [`AnalyzerControl`]; when its queues are full they are dropped.
pub struct AnalyzerHandle {
    analyzer: SpikeAnalyzer,
    control_rx: Consumer<ControlMsg>,
    metrics_tx: Producer<SpikeMetrics>,
    invariant_tx: Producer<u8>,
}

impl AnalyzerHandle {
    /// Build an analyzer and split it into its tick-thread and control-thread halves.
    pub fn new_with_channels(
        config: AnalyzerConfig,
        period_ms: f64,
    ) -> Result<(Self, AnalyzerControl), AnalyzerError> {
        let analyzer = SpikeAnalyzer::new(config, period_ms)?;
        Ok(Self::split(analyzer))
    }

    /// Split an already built analyzer.
    pub fn split(analyzer: SpikeAnalyzer) -> (Self, AnalyzerControl) {
        let (control_tx, control_rx) = new_control_queue();
        let (metrics_tx, metrics_rx) = new_metrics_queue();
        let (invariant_tx, invariant_rx) = new_invariant_queue();
        let control = AnalyzerControl::new(
            control_tx,
            metrics_rx,
            invariant_rx,
            *analyzer.config(),
            analyzer.period_ms(),
            analyzer.ring().capacity(),
        );
        let handle = Self {
            analyzer,
            control_rx,
            metrics_tx,
            invariant_tx,
        };
        (handle, control)
    }

    /// Drain pending control messages. Called at the start of every tick.
    fn apply_control(&mut self) {
        while let Ok(msg) = self.control_rx.pop() {
            let applied = match msg {
                ControlMsg::Reconfigure(config) => {
                    // Capacity changes are refused on the control side; a message
                    // that would still resize is rejected here instead of allocating.
                    if config.history_ms != self.analyzer.config().history_ms {
                        Err(())
                    } else {
                        self.analyzer
                            .reconfigure(config)
                            .map(|_| INV_CONFIG_APPLIED)
                            .map_err(|_| ())
                    }
                }
                ControlMsg::SetPeriod { period_ms } => self
                    .analyzer
                    .set_period(period_ms)
                    .map(|_| INV_PERIOD_APPLIED)
                    .map_err(|_| ()),
                ControlMsg::Reset => {
                    self.analyzer.reset();
                    Ok(INV_STATE_RESET)
                }
            };
            match applied {
                Ok(id) => signal_invariant(&mut self.invariant_tx, id),
                Err(()) => signal_invariant(&mut self.invariant_tx, INV_CONTROL_REJECTED),
            }
            signal_invariant(&mut self.invariant_tx, INV_CONTROL_MSG_PROCESSED);
        }
    }

    /// Process one raw sample.
    pub fn execute(&mut self, raw: f64) -> TickOutputs {
        self.apply_control();
        let out = self.analyzer.execute(raw);
        match out.event {
            TickEvent::None => {}
            TickEvent::SpikeDetected => signal_invariant(&mut self.invariant_tx, INV_SPIKE_DETECTED),
            TickEvent::TriggerIgnored => {
                signal_invariant(&mut self.invariant_tx, INV_TRIGGER_IGNORED)
            }
            TickEvent::SpikeCompleted => {
                signal_invariant(&mut self.invariant_tx, INV_SPIKE_COMPLETED);
                if let Some(metrics) = out.last_spike {
                    if self.metrics_tx.push(metrics).is_err() {
                        signal_invariant(&mut self.invariant_tx, INV_METRICS_DROPPED);
                    }
                }
            }
        }
        out
    }

    /// Process a block of samples, writing one output per input.
    ///
    /// Control messages are applied once per sample, as in [`execute`](Self::execute).
    pub fn process_block(
        &mut self,
        input: &[f64],
        out: &mut [TickOutputs],
    ) -> Result<(), &'static str> {
        if input.len() != out.len() {
            return Err("input and output blocks differ in length");
        }
        for (o, &raw) in out.iter_mut().zip(input) {
            *o = self.execute(raw);
        }
        Ok(())
    }

    pub fn analyzer(&self) -> &SpikeAnalyzer {
        &self.analyzer
    }
}

/// Run [`AnalyzerHandle::process_block`] with panic containment.
///
/// On panic the outputs are cleared to idle and the handle keeps running.
pub fn process_block_safe(handle: &mut AnalyzerHandle, input: &[f64], out: &mut [TickOutputs]) {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        handle.process_block(input, out)
    }));
    if !matches!(result, Ok(Ok(()))) {
        // Fail closed: report no activity
        out.fill(TickOutputs::default());
    }
}
