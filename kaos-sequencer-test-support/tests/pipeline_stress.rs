//! Time-boxed pipeline stress: producers feed a chain of consumer stages,
//! each gated on the one before it. Shutdown is driven by barrier alerts.
//!
//! Run with: cargo test -p kaos-sequencer-test-support --test pipeline_stress -- --nocapture

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{ unbounded, Sender };
use kaos_sequencer::{
    AnyWaitStrategy,
    BatchDescriptor,
    Sequence,
    SequenceBarrier,
    Sequencer,
    SequencerConfig,
    SequencerError,
    WaitStrategyOption,
};
use kaos_sequencer_test_support::{ print_summary, SlotRing, StressConfig, StressCounters, StressRunner };
use rand::{ thread_rng, Rng };

#[derive(Debug)]
struct StageReport {
    stage: usize,
    processed: u64,
    violations: u64,
    last: i64,
}

/// One pipeline stage. Every sequence it sees must carry its own stamp and
/// must already have been processed by the upstream stage, if any.
fn spawn_stage(
    stage: usize,
    barrier: Arc<SequenceBarrier<AnyWaitStrategy>>,
    upstream: Option<Arc<Sequence>>,
    progress: Arc<Sequence>,
    slots: Arc<SlotRing>,
    counters: Option<Arc<StressCounters>>,
    reports: Sender<StageReport>
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut report = StageReport { stage, processed: 0, violations: 0, last: progress.get() };
        loop {
            let next = report.last + 1;
            let available = match barrier.wait_for(next) {
                Ok(available) => available,
                Err(SequencerError::Alerted) => break,
                Err(e) => panic!("stage {stage}: unexpected {e}"),
            };

            for sequence in next..=available {
                let behind_upstream = upstream.as_ref().is_some_and(|u| u.get() < sequence);
                if slots.read(sequence) != sequence || behind_upstream {
                    report.violations += 1;
                }
            }
            let count = (available - report.last) as u64;
            report.processed += count;
            report.last = available;
            progress.set(available);

            if let Some(counters) = &counters {
                counters.record_consume(count);
            }
        }
        let _ = reports.send(report);
    })
}

fn run_pipeline(config: StressConfig, wait: WaitStrategyOption, stages: usize) {
    let sequencer = Arc::new(
        SequencerConfig::new(config.capacity)
            .unwrap()
            .with_claim_strategy(config.claim_strategy())
            .with_wait_strategy(wait)
            .build()
    );
    let slots = SlotRing::new(config.capacity);
    let progress: Vec<Arc<Sequence>> = (0..stages).map(|_| Arc::new(Sequence::default())).collect();
    sequencer.set_gating_sequences(vec![progress[stages - 1].clone()]);

    let runner = StressRunner::new(config.clone());
    let (tx, rx) = unbounded();

    let barriers: Vec<_> = (0..stages)
        .map(|stage| {
            let dependents = if stage == 0 { Vec::new() } else { vec![progress[stage - 1].clone()] };
            Arc::new(sequencer.new_barrier(dependents))
        })
        .collect();

    let stage_handles: Vec<_> = (0..stages)
        .map(|stage| {
            spawn_stage(
                stage,
                barriers[stage].clone(),
                (stage > 0).then(|| progress[stage - 1].clone()),
                progress[stage].clone(),
                slots.clone(),
                (stage == stages - 1).then(|| runner.counters()),
                tx.clone()
            )
        })
        .collect();
    drop(tx);

    let metrics = runner.run_with_progress(|counters| {
        let producers: Vec<_> = (0..config.producers)
            .map(|_| {
                let sequencer = sequencer.clone();
                let slots = slots.clone();
                let counters = counters.clone();
                let max_batch = config.max_batch;
                thread::spawn(move || {
                    let mut rng = thread_rng();
                    while counters.is_running() {
                        let mut batch = BatchDescriptor::new(rng.gen_range(1..=max_batch));
                        sequencer.next_batch(&mut batch);
                        for sequence in batch.iter() {
                            slots.write(sequence);
                        }
                        sequencer.publish_batch(&batch);
                        counters.record_publish(batch.size() as u64);
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        // Drain, then alert every stage out of its wait
        let last_published = sequencer.cursor();
        while progress[stages - 1].get() < last_published {
            thread::sleep(Duration::from_millis(1));
        }
        for barrier in &barriers {
            barrier.alert();
        }
    });

    for handle in stage_handles {
        handle.join().unwrap();
    }

    let mut reports: Vec<StageReport> = rx.iter().collect();
    reports.sort_by_key(|r| r.stage);
    assert_eq!(reports.len(), stages);

    print_summary(&format!("pipeline {wait:?} x{stages}"), &metrics);
    for report in &reports {
        eprintln!("  stage {}: {:?}", report.stage, report);
        assert_eq!(report.violations, 0, "stage {} saw unpublished or unprocessed slots", report.stage);
        assert_eq!(report.last, sequencer.cursor());
        assert_eq!(report.processed, metrics.published);
    }
    assert_eq!(metrics.consumed, metrics.published);
    assert!(metrics.published > 0);
    assert_eq!(sequencer.metrics().alerts, stages as u64);
}

#[test]
fn test_pipeline_single_producer() {
    let config = StressConfig::new(Duration::from_secs(1)).with_capacity(256).with_max_batch(8);
    run_pipeline(config, WaitStrategyOption::Yielding, 3);
}

#[test]
fn test_pipeline_multi_producer_blocking() {
    let config = StressConfig::new(Duration::from_secs(1))
        .with_producers(3)
        .with_capacity(128)
        .with_max_batch(4);
    run_pipeline(config, WaitStrategyOption::Blocking, 2);
}

#[test]
fn test_pipeline_multi_producer_sleeping() {
    let config = StressConfig::new(Duration::from_secs(1))
        .with_producers(2)
        .with_capacity(64)
        .with_max_batch(2);
    run_pipeline(config, WaitStrategyOption::Sleeping, 3);
}

#[test]
#[ignore] // Long-running: cargo test --test pipeline_stress -- --ignored --nocapture
fn test_pipeline_long_running() {
    let config = StressConfig::new(Duration::from_secs(30))
        .with_producers(4)
        .with_capacity(1024)
        .with_max_batch(32);
    run_pipeline(config, WaitStrategyOption::Yielding, 4);
}
