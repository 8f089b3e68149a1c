//! Recovery simulation
//!
//! This binary wires the recovery manager to:
//! - a synthetic alive feed (system + session heartbeats per producer)
//! - a simulated issuer that answers recovery requests with snapshot completes
//! - an optional stall injector that silences one producer for a while
//!
//! Watch the logs for the down → recovery → up cycle of the stalled producer.

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use feedwatch_bins::common::{init_logging, print_stats, CommonArgs};
use feedwatch_core::core::{CommunicationError, MessageInterest, ProducerId, RecoveryId};
use feedwatch_core::monitoring::RecoveryMetrics;
use feedwatch_core::producer::{ProducerManager, ProducerRegistry};
use feedwatch_core::recovery::{RecoveryManager, RecoveryRequest, RecoveryRequestIssuer, ShutdownSignal};
use feedwatch_core::runtime::{SystemClock, ThreadTaskScheduler, TimeSource};
use feedwatch_core::utils::install_panic_handler;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulate producer outages and recoveries")]
struct SimArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Period between alives per producer (ms)
    #[arg(long, default_value = "1000")]
    alive_period_ms: u64,

    /// Producer to silence
    #[arg(long)]
    stall_producer: Option<ProducerId>,

    /// Seconds after startup at which the stall begins
    #[arg(long, default_value = "30")]
    stall_after_secs: u64,

    /// Length of the stall in seconds
    #[arg(long, default_value = "40")]
    stall_secs: u64,

    /// Delay before the simulated upstream confirms a recovery (ms)
    #[arg(long, default_value = "2000")]
    recovery_delay_ms: u64,

    /// Probability that a recovery request is rejected
    #[arg(long, default_value = "0.1")]
    failure_rate: f64,

    /// Stop after this many seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "0")]
    duration_secs: u64,
}

struct PendingCompletion {
    producer_id: ProducerId,
    recovery_id: RecoveryId,
    interests: Vec<MessageInterest>,
    due: Instant,
}

/// Upstream stand-in: accepts requests and schedules their snapshot completes
struct SimulatedIssuer {
    completions: Sender<PendingCompletion>,
    delay: Duration,
    failure_rate: f64,
}

impl RecoveryRequestIssuer for SimulatedIssuer {
    fn request_recovery(&self, request: &RecoveryRequest) -> Result<(), CommunicationError> {
        if rand::thread_rng().gen_bool(self.failure_rate) {
            return Err(CommunicationError::Rejected {
                producer_id: request.producer_id,
                recovery_id: request.recovery_id,
                status: 503,
            });
        }

        tracing::info!(
            producer_id = request.producer_id,
            recovery_id = request.recovery_id,
            full = request.is_full(),
            "Upstream accepted recovery request"
        );

        self.completions
            .send(PendingCompletion {
                producer_id: request.producer_id,
                recovery_id: request.recovery_id,
                interests: request.interests.iter().copied().collect(),
                due: Instant::now() + self.delay,
            })
            .map_err(|_| CommunicationError::Transport {
                producer_id: request.producer_id,
                recovery_id: request.recovery_id,
                message: "completion channel closed".to_string(),
            })
    }
}

fn main() -> Result<()> {
    let args = SimArgs::parse();

    init_logging(&args.common.log_level, args.common.json_logs)?;
    install_panic_handler();

    let config = args.common.recovery_config()?;
    tracing::info!("=== Feedwatch: recovery simulation ===");
    tracing::info!("Producers: {}", config.producers.len());

    let registry = Arc::new(ProducerRegistry::from_config(&config)?);
    let producer_ids = registry.producer_ids();
    let scheduler = Arc::new(ThreadTaskScheduler::new().context("Failed to start scheduler")?);
    let metrics = RecoveryMetrics::new()?;
    let (completion_tx, completion_rx) = unbounded();
    let issuer = Arc::new(SimulatedIssuer {
        completions: completion_tx,
        delay: Duration::from_millis(args.recovery_delay_ms),
        failure_rate: args.failure_rate.clamp(0.0, 1.0),
    });

    let manager = RecoveryManager::builder(config, registry, issuer)
        .scheduler(scheduler.clone())
        .metrics(metrics)
        .build()?;
    manager.start();

    // Setup Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, shutting down...");
        r.store(false, Ordering::SeqCst);
    })?;

    let started = Instant::now();
    let completer = {
        let manager = Arc::clone(&manager);
        let running = Arc::clone(&running);
        thread::Builder::new()
            .name("sim-upstream".to_string())
            .spawn(move || run_upstream(manager, completion_rx, running))?
    };
    let feeder = {
        let manager = Arc::clone(&manager);
        let running = Arc::clone(&running);
        let stall = args.stall_producer.map(|id| {
            let from = Duration::from_secs(args.stall_after_secs);
            (id, from, from + Duration::from_secs(args.stall_secs))
        });
        let period = Duration::from_millis(args.alive_period_ms.max(1));
        thread::Builder::new()
            .name("sim-alives".to_string())
            .spawn(move || run_alive_feed(manager, producer_ids, period, stall, started, running))?
    };

    let mut last_report = Instant::now();
    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));

        if args.duration_secs > 0 && started.elapsed() >= Duration::from_secs(args.duration_secs) {
            running.store(false, Ordering::SeqCst);
        }
        if last_report.elapsed() >= Duration::from_secs(10) {
            manager.stats().log();
            last_report = Instant::now();
        }
    }

    for handle in [completer, feeder] {
        if handle.join().is_err() {
            tracing::warn!("Simulation thread panicked");
        }
    }

    manager.shutdown_completed(ShutdownSignal::Requested);
    scheduler.shutdown();
    print_stats(&manager.stats());

    Ok(())
}

/// Deliver snapshot completes once they are due
fn run_upstream(manager: Arc<RecoveryManager>, pending: Receiver<PendingCompletion>, running: Arc<AtomicBool>) {
    while running.load(Ordering::SeqCst) {
        let completion = match pending.recv_timeout(Duration::from_millis(100)) {
            Ok(completion) => completion,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let wait = completion.due.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            thread::sleep(wait);
        }

        let now = SystemClock.now_millis();
        for interest in completion.interests {
            manager.on_snapshot_complete_received(
                completion.producer_id,
                now,
                completion.recovery_id,
                interest,
            );
        }
    }
}

/// Heartbeats and processed messages for every producer, skipping a stalled one
fn run_alive_feed(
    manager: Arc<RecoveryManager>,
    producer_ids: Vec<ProducerId>,
    period: Duration,
    stall: Option<(ProducerId, Duration, Duration)>,
    started: Instant,
    running: Arc<AtomicBool>,
) {
    let mut rng = rand::thread_rng();
    let mut stalled = false;

    while running.load(Ordering::SeqCst) {
        let elapsed = started.elapsed();
        let stalled_id = stall.and_then(|(id, from, until)| (elapsed >= from && elapsed < until).then_some(id));
        if stalled_id.is_some() != stalled {
            stalled = stalled_id.is_some();
            tracing::warn!(producer = ?stall.map(|(id, _, _)| id), stalled, "Stall injector toggled");
        }

        let now = SystemClock.now_millis();
        for (session, &id) in producer_ids.iter().enumerate() {
            if stalled_id == Some(id) {
                continue;
            }
            let lag = rng.gen_range(5..250);
            manager.on_alive_received(id, now - lag, now, true, true);

            let session_id = -(session as i64) - 1;
            manager.on_message_processing_started(session_id, id, None, now);
            manager.on_message_processing_ended(session_id, id, now - lag, None);
        }

        thread::sleep(period);
    }
}
