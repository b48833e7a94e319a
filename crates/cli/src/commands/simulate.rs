//! `simulate` command implementation.
//!
//! Feeds synthetic production area changes through a `ChangeDispatcher`
//! and reports what reached the topic.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use uuid::Uuid;

use contracts::{
    ChangeRecord, DispatcherConfig, EntityState, ProductionArea, ProductionAreaUpsert,
    TopicAdmin, TopicConnector,
};
use dispatcher::transports::Delivery;
use dispatcher::{ChangeDispatcher, FailureKind, InMemoryBroker, LogTransport, MetricsSnapshot};
use observability::DeliveryStatsAggregator;

use crate::cli::{SimulateArgs, TransportKind};
use crate::error::CliError;

/// Execute the `simulate` command
pub async fn run_simulate(args: &SimulateArgs) -> Result<()> {
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    info!(config = %args.config.display(), "Loading configuration");
    let service = config_loader::ConfigLoader::load_from_path(&args.config)
        .map_err(CliError::from)
        .context("Failed to load configuration")?;
    let config = dispatcher_config(&service, args);

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    print_config_summary(&config, args);

    let report = match args.transport {
        TransportKind::Memory => {
            let broker = InMemoryBroker::new();
            if args.fail_first > 0 {
                let kind = if args.connectivity {
                    FailureKind::Connectivity
                } else {
                    FailureKind::Transport
                };
                broker.fail_next_sends(args.fail_first, kind);
            }
            let mut report = drive(config, &broker, broker.clone(), args).await?;
            report.deliveries = Some(broker.deliveries());
            report
        }
        TransportKind::Log => {
            if args.fail_first > 0 {
                warn!("--fail-first only applies to the memory transport, ignoring");
            }
            let transport = LogTransport::new("simulate");
            drive(config, &transport, transport.clone(), args).await?
        }
    };

    report.print_summary();

    if report.pending > 0 {
        return Err(CliError::Undelivered {
            pending: report.pending,
        }
        .into());
    }
    Ok(())
}

/// Service config plus command-line overrides
fn dispatcher_config(
    service: &contracts::ServiceConfig,
    args: &SimulateArgs,
) -> DispatcherConfig {
    let mut config = DispatcherConfig::from(service);
    if let Some(ms) = args.retry_base_ms {
        config.retry.base_delay = Duration::from_millis(ms);
    }
    config
}

/// Outcome of one simulation run
struct SimulationReport {
    units: usize,
    records: usize,
    enqueued: usize,
    /// Undelivered count returned by `shutdown()`
    pending: usize,
    metrics: MetricsSnapshot,
    elapsed: Duration,
    deliveries: Option<Vec<Delivery>>,
}

async fn drive<A, C>(
    config: DispatcherConfig,
    admin: &A,
    connector: C,
    args: &SimulateArgs,
) -> Result<SimulationReport>
where
    A: TopicAdmin,
    C: TopicConnector,
{
    let dispatcher = ChangeDispatcher::new(config, admin, connector)
        .await
        .map_err(CliError::from)?;

    let units = generate_units(args.changes, args.stores.max(1));
    let records = units.iter().map(Vec::len).sum();
    let start = std::time::Instant::now();

    // Each unit of work commits on its own task, like concurrent requests would.
    let mut handles = Vec::with_capacity(units.len());
    for unit in units {
        let dispatcher = dispatcher.clone();
        handles.push(tokio::spawn(async move { dispatcher.dispatch_changes(unit) }));
    }

    let mut enqueued = 0;
    for handle in handles {
        enqueued += handle.await.context("Trigger task panicked")??;
    }
    info!(records, enqueued, "All units of work committed");

    let timeout = async {
        if args.timeout == 0 {
            std::future::pending::<()>().await;
        } else {
            tokio::time::sleep(Duration::from_secs(args.timeout)).await;
        }
    };

    tokio::select! {
        _ = dispatcher.wait_until_idle() => {
            info!("All messages delivered");
        }
        _ = timeout => {
            warn!(timeout_secs = args.timeout, "Timed out waiting for delivery");
        }
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping dispatcher...");
        }
    }

    let pending = dispatcher.shutdown().await;
    if pending > 0 {
        warn!(pending, "Simulation ended with undelivered messages");
    }

    Ok(SimulationReport {
        units: args.changes,
        records,
        enqueued,
        pending,
        metrics: dispatcher.metrics(),
        elapsed: start.elapsed(),
        deliveries: None,
    })
}

/// Build `count` units of work over `stores` stores
///
/// Units cycle through create, update and delete. Every unit also carries an
/// unchanged record, which the dispatcher filters out.
fn generate_units(count: usize, stores: usize) -> Vec<Vec<ChangeRecord<ProductionArea>>> {
    let store_ids: Vec<Uuid> = (0..stores).map(|_| Uuid::new_v4()).collect();
    let mut live: Vec<ProductionArea> = Vec::new();
    let mut units = Vec::with_capacity(count);

    for i in 0..count {
        let store_id = store_ids[i % stores];
        let upsert = ProductionAreaUpsert {
            store_name: format!("store-{}", i % stores),
            restrictions: if i % 2 == 0 {
                vec!["gluten".to_string()]
            } else {
                Vec::new()
            },
            on: i % 4 != 3,
        };

        let change = match (i % 3, live.pop()) {
            (1, Some(mut area)) => {
                upsert.apply_to(&mut area);
                live.push(area.clone());
                ChangeRecord::updated(area)
            }
            (2, Some(area)) => ChangeRecord::deleted(area),
            (_, existing) => {
                live.extend(existing);
                let area = upsert.into_production_area(store_id);
                live.push(area.clone());
                ChangeRecord::created(area)
            }
        };

        let untouched = ChangeRecord::new(
            ProductionArea::new(store_id, Vec::new(), true),
            EntityState::Unchanged,
        );
        units.push(vec![change, untouched]);
    }

    units
}

impl SimulationReport {
    fn print_summary(&self) {
        println!("\n=== Simulation Summary ===");
        println!("Units of work: {}", self.units);
        println!(
            "Records: {} ({} filtered)",
            self.records,
            self.records.saturating_sub(self.enqueued)
        );
        println!("Messages enqueued: {}", self.enqueued);
        println!("Messages sent: {}", self.metrics.sent_count);
        println!("Send failures: {}", self.metrics.failure_count);
        println!("Close failures: {}", self.metrics.close_failure_count);
        println!("Dispatch loops: {}", self.metrics.loops_started);
        println!("Still pending: {}", self.pending);
        println!("Duration: {:.2}s", self.elapsed.as_secs_f64());

        if let Some(ref deliveries) = self.deliveries {
            let mut stats = DeliveryStatsAggregator::new();
            for delivery in deliveries {
                let latency = (delivery.delivered_at - delivery.message.enqueued_at)
                    .to_std()
                    .unwrap_or_default();
                stats.record_delivery(latency);
            }
            stats.record_failures(self.metrics.failure_count);
            println!("\n{}", stats.summary());
        }
    }
}

fn print_config_summary(config: &DispatcherConfig, args: &SimulateArgs) {
    println!("\n=== Simulation Configuration ===");
    println!("Transport: {:?}", args.transport);
    println!("Topic: {} ({} MB)", config.topic, config.topic_size_mb);
    println!(
        "Retry: base {:?}, multiplier cap {}",
        config.retry.base_delay, config.retry.max_multiplier
    );
    println!("Units of work: {} across {} stores", args.changes, args.stores.max(1));
    if args.fail_first > 0 {
        println!("Scripted failures: {}", args.fail_first);
    }
}

/// Ctrl+C and SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
