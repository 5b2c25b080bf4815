//! Two-stage pipeline - 2 Producers, journal stage, then sum stage
//!
//! Producers write numbers 1..=N into a shared slot array. The journal stage
//! counts what it sees; the sum stage only reads what the journal has already
//! handled. The ring is gated on the sum stage.

use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use kaos_sequencer::{ ClaimStrategyOption, Sequence, SequencerConfig, WaitStrategyOption };

const RING_SIZE: usize = 1024;
const NUM_PRODUCERS: u64 = 2;
const MESSAGES_PER_PRODUCER: u64 = 500_000;
const TOTAL: u64 = NUM_PRODUCERS * MESSAGES_PER_PRODUCER;

fn main() {
    println!("\nPipeline: {NUM_PRODUCERS} producers -> journal -> sum ({TOTAL} numbers)\n");

    let sequencer = Arc::new(
        SequencerConfig::new(RING_SIZE)
            .expect("valid ring size")
            .with_claim_strategy(ClaimStrategyOption::MultiThreaded)
            .with_wait_strategy(WaitStrategyOption::Yielding)
            .build()
    );
    let slots: Arc<Vec<AtomicU64>> = Arc::new((0..RING_SIZE).map(|_| AtomicU64::new(0)).collect());

    let journal_progress = Arc::new(Sequence::default());
    let sum_progress = Arc::new(Sequence::default());
    sequencer.set_gating_sequences(vec![sum_progress.clone()]);

    let journal_barrier = sequencer.new_barrier(Vec::new());
    let sum_barrier = sequencer.new_barrier(vec![journal_progress.clone()]);
    let last = (TOTAL as i64) - 1;
    let start = Instant::now();

    let journal = {
        let progress = journal_progress.clone();
        thread::spawn(move || {
            let mut seen = 0u64;
            let mut next = 0i64;
            while next <= last {
                let available = journal_barrier.wait_for(next).expect("journal stage alerted");
                seen += (available - next + 1) as u64;
                progress.set(available);
                next = available + 1;
            }
            seen
        })
    };

    let summer = {
        let slots = slots.clone();
        thread::spawn(move || {
            let mut sum = 0u64;
            let mut next = 0i64;
            while next <= last {
                let available = sum_barrier.wait_for(next).expect("sum stage alerted");
                for sequence in next..=available {
                    sum += slots[(sequence as usize) % RING_SIZE].load(Ordering::Relaxed);
                }
                sum_progress.set(available);
                next = available + 1;
            }
            sum
        })
    };

    let producers: Vec<_> = (0..NUM_PRODUCERS)
        .map(|id| {
            let sequencer = sequencer.clone();
            let slots = slots.clone();
            thread::spawn(move || {
                let first = id * MESSAGES_PER_PRODUCER + 1;
                for number in first..first + MESSAGES_PER_PRODUCER {
                    let sequence = sequencer.next();
                    slots[(sequence as usize) % RING_SIZE].store(number, Ordering::Relaxed);
                    sequencer.publish(sequence);
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().expect("producer panicked");
    }
    let seen = journal.join().expect("journal panicked");
    let sum = summer.join().expect("summer panicked");
    let duration = start.elapsed();

    let expected = (TOTAL * (TOTAL + 1)) / 2;
    println!("  Journal saw:  {seen}");
    println!("  Sum:          {sum} (expected {expected})");
    println!("  Cursor:       {}", sequencer.cursor());
    println!("  Metrics:      {}", sequencer.metrics());
    println!("  Time taken:   {:.3}s", duration.as_secs_f64());
    println!("  Throughput:   {:.2}M/s\n", (TOTAL as f64) / duration.as_secs_f64() / 1_000_000.0);

    if seen == TOTAL && sum == expected {
        println!("  VERIFICATION PASSED");
    } else {
        println!("  VERIFICATION FAILED");
        std::process::exit(1);
    }
}
