use spikemeter::config::AnalyzerConfig;
use spikemeter::detector::SpikeAnalyzer;
use spikemeter::rt::AnalyzerHandle;
use spikemeter::state::TickOutputs;
use std::alloc::{GlobalAlloc, Layout};
use std::cell::RefCell;

thread_local! {
    static ALLOC_COUNT: RefCell<usize> = RefCell::new(0);
}

struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOC_COUNT.with(|c| *c.borrow_mut() += 1);
        unsafe { std::alloc::System.alloc(layout) }
    }
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { std::alloc::System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static A: CountingAllocator = CountingAllocator;

fn config() -> AnalyzerConfig {
    AnalyzerConfig {
        threshold: 0.5,
        window_ms: 10.0,
        slope_ms: 2.0,
        filter_taps: 4,
        history_ms: 100.0,
        ..AnalyzerConfig::default()
    }
}

/// Spiky test signal, precomputed so generating it does not count.
fn signal() -> Vec<f64> {
    (0..10_000)
        .map(|i| match i % 40 {
            25 => 1.5,
            26 => 3.0,
            27 => 2.5,
            28 => 2.0,
            29 => 1.5,
            30 => 1.0,
            _ => 0.0,
        })
        .collect()
}

#[test]
fn rt_alloc_invariant() {
    let samples = signal();
    let mut analyzer = SpikeAnalyzer::new(config(), 1.0).unwrap();
    let after_new = ALLOC_COUNT.with(|c| *c.borrow());
    for &s in &samples {
        analyzer.execute(s);
    }
    let final_count = ALLOC_COUNT.with(|c| *c.borrow());
    assert_eq!(final_count, after_new, "execute should not allocate");
    assert!(analyzer.spikes_completed() > 0, "signal should contain spikes");
}

#[test]
fn rt_alloc_invariant_handle() {
    let samples = signal();
    let (mut handle, mut control) = AnalyzerHandle::new_with_channels(config(), 1.0).unwrap();
    control.set_period(0.5).unwrap();
    control.reset().unwrap();
    let mut out = vec![TickOutputs::default(); 64];
    let after_new = ALLOC_COUNT.with(|c| *c.borrow());
    for block in samples.chunks(64) {
        handle.process_block(block, &mut out[..block.len()]).unwrap();
    }
    let final_count = ALLOC_COUNT.with(|c| *c.borrow());
    assert_eq!(
        final_count, after_new,
        "handle process_block should not allocate, control messages included"
    );
}
