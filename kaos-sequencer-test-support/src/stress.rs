//! Stress testing utilities for long-running sequencer tests.

use std::sync::atomic::{ AtomicBool, AtomicU64, Ordering };
use std::sync::Arc;
use std::time::{ Duration, Instant };

use kaos_sequencer::ClaimStrategyOption;

/// Configuration for stress tests
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Duration to run the test
    pub duration: Duration,
    /// Number of producer threads
    pub producers: usize,
    /// Number of consumer threads
    pub consumers: usize,
    /// Largest batch a producer claims at once
    pub max_batch: i64,
    /// Ring capacity
    pub capacity: usize,
    /// Print progress every N seconds
    pub report_interval: Duration,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(2),
            producers: 1,
            consumers: 1,
            max_batch: 1,
            capacity: 1024,
            report_interval: Duration::from_millis(500),
        }
    }
}

impl StressConfig {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            ..Default::default()
        }
    }

    pub fn with_producers(mut self, n: usize) -> Self {
        self.producers = n;
        self
    }

    pub fn with_consumers(mut self, n: usize) -> Self {
        self.consumers = n;
        self
    }

    pub fn with_max_batch(mut self, size: i64) -> Self {
        self.max_batch = size;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Claim strategy matching the producer count
    pub fn claim_strategy(&self) -> ClaimStrategyOption {
        if self.producers > 1 {
            ClaimStrategyOption::MultiThreaded
        } else {
            ClaimStrategyOption::SingleThreaded
        }
    }
}

/// Metrics collected during stress testing
#[derive(Debug, Clone, Default)]
pub struct StressMetrics {
    pub published: u64,
    pub consumed: u64,
    pub errors: u64,
    pub duration: Duration,
    pub peak_rate: f64,
}

impl StressMetrics {
    pub fn publish_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn consume_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.consumed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Shared counters for stress testing
pub struct StressCounters {
    pub published: AtomicU64,
    pub consumed: AtomicU64,
    pub errors: AtomicU64,
    pub running: AtomicBool,
}

impl StressCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_publish(&self, count: u64) {
        self.published.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_consume(&self, count: u64) {
        self.consumed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StressMetrics {
        StressMetrics {
            published: self.published.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            ..Default::default()
        }
    }
}

impl Default for StressCounters {
    fn default() -> Self {
        Self {
            published: AtomicU64::new(0),
            consumed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            running: AtomicBool::new(true),
        }
    }
}

/// Runner for stress tests with progress reporting
pub struct StressRunner {
    config: StressConfig,
    counters: Arc<StressCounters>,
}

impl StressRunner {
    pub fn new(config: StressConfig) -> Self {
        Self {
            config,
            counters: StressCounters::new(),
        }
    }

    pub fn counters(&self) -> Arc<StressCounters> {
        self.counters.clone()
    }

    pub fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Run `test_fn` until it returns. The reporter flips `running` off once
    /// the configured duration has elapsed; `test_fn` is expected to watch it.
    pub fn run_with_progress<F>(&self, test_fn: F) -> StressMetrics
    where
        F: FnOnce(Arc<StressCounters>),
    {
        let start = Instant::now();
        let counters = self.counters.clone();
        let duration = self.config.duration;
        let report_interval = self.config.report_interval;

        let report_counters = counters.clone();
        let reporter = std::thread::spawn(move || {
            let mut last_published = 0u64;
            let mut peak_rate = 0.0f64;

            while report_counters.is_running() {
                std::thread::sleep(report_interval);

                let published = report_counters.published.load(Ordering::Relaxed);
                let consumed = report_counters.consumed.load(Ordering::Relaxed);
                let errors = report_counters.errors.load(Ordering::Relaxed);

                let rate = (published - last_published) as f64 / report_interval.as_secs_f64();
                peak_rate = peak_rate.max(rate);
                last_published = published;

                let elapsed = start.elapsed();
                eprintln!(
                    "[{:>5.1}s] published: {:>10}, consumed: {:>10}, rate: {:>10.0}/s, errors: {}",
                    elapsed.as_secs_f64(),
                    published,
                    consumed,
                    rate,
                    errors
                );

                if elapsed >= duration {
                    report_counters.stop();
                    break;
                }
            }

            peak_rate
        });

        test_fn(counters.clone());

        counters.stop();
        let peak_rate = reporter.join().unwrap_or(0.0);

        let mut metrics = counters.snapshot();
        metrics.duration = start.elapsed();
        metrics.peak_rate = peak_rate;

        metrics
    }
}

/// Print a summary of stress test results
pub fn print_summary(name: &str, metrics: &StressMetrics) {
    eprintln!("\n=== {} ===", name);
    eprintln!("  Duration:     {:>12.2}s", metrics.duration.as_secs_f64());
    eprintln!("  Published:    {:>12}", metrics.published);
    eprintln!("  Consumed:     {:>12}", metrics.consumed);
    eprintln!("  Publish rate: {:>12.0}/s", metrics.publish_rate());
    eprintln!("  Consume rate: {:>12.0}/s", metrics.consume_rate());
    eprintln!("  Peak rate:    {:>12.0}/s", metrics.peak_rate);
    eprintln!("  Errors:       {:>12}", metrics.errors);
}
