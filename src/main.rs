use clap::Parser;
use lease_settlement::application::orchestrator::PaymentOrchestrator;
use lease_settlement::application::poller::{PollConfig, PollOutcome};
use lease_settlement::application::recorder::SettlementRecorder;
use lease_settlement::config::{DEFAULT_CHANNEL, Settings};
use lease_settlement::domain::ports::{EventTransportRef, LedgerStoreRef, PaymentStoreRef};
use lease_settlement::infrastructure::channel::InMemoryChannel;
use lease_settlement::infrastructure::directory::StaticLeaseDirectory;
use lease_settlement::infrastructure::in_memory::{
    InMemoryDeadLetters, InMemoryLedgerStore, InMemoryPaymentStore,
};
use lease_settlement::infrastructure::ledger::SimulatedLedger;
use lease_settlement::infrastructure::rails::standard_registry;
use lease_settlement::interfaces::csv::payment_writer::PaymentWriter;
use lease_settlement::interfaces::csv::request_reader::RequestReader;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input payment requests CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "LEASE_SETTLEMENT_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Redis URL for settlement events (optional). Defaults to an in-process channel.
    #[arg(long, env = "LEASE_SETTLEMENT_REDIS_URL")]
    redis_url: Option<String>,

    #[arg(long, env = "LEASE_SETTLEMENT_CHANNEL", default_value = DEFAULT_CHANNEL)]
    channel: String,

    #[arg(long, default_value_t = 500)]
    publish_timeout_ms: u64,

    #[arg(
        long,
        env = "LEASE_SETTLEMENT_POLL_INTERVAL_MS",
        default_value_t = 5_000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    poll_interval_ms: u64,

    #[arg(long, env = "LEASE_SETTLEMENT_CONFIRM_DEADLINE_SECS", default_value_t = 300)]
    confirm_deadline_secs: u64,

    /// How long to wait for in-flight settlement events after the last request.
    #[arg(long, default_value_t = 2_000)]
    drain_timeout_ms: u64,

    /// Bank rail endpoint. An empty value disables the bank rail.
    #[arg(long, env = "LEASE_SETTLEMENT_BANK_ENDPOINT", default_value = "https://bank.example/api")]
    bank_endpoint: String,

    #[arg(long, env = "LEASE_SETTLEMENT_LEDGER_WALLET", default_value = "0:lease-settlement")]
    ledger_wallet: String,

    /// Status checks before the simulated ledger reports a transfer confirmed.
    #[arg(long, default_value_t = 1)]
    ledger_confirm_after: u32,

    /// Ledger address for leases without a `--recipient` entry.
    #[arg(long, default_value = "0:lessor-treasury")]
    default_recipient: String,

    /// Per-lease ledger address, as `LEASE_ID=ADDRESS`. Repeatable.
    #[arg(long = "recipient", value_parser = parse_recipient)]
    recipients: Vec<(String, String)>,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            channel: self.channel.clone(),
            publish_timeout: Duration::from_millis(self.publish_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            confirmation_deadline: Duration::from_secs(self.confirm_deadline_secs),
            bank_endpoint: Some(self.bank_endpoint.clone()).filter(|e| !e.is_empty()),
            ledger_wallet: self.ledger_wallet.clone(),
            default_recipient: self.default_recipient.clone(),
            ledger_confirm_after: self.ledger_confirm_after,
            db_path: self.db_path.clone(),
            redis_url: self.redis_url.clone(),
        }
    }
}

fn parse_recipient(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((lease, address)) if !lease.trim().is_empty() && !address.trim().is_empty() => {
            Ok((lease.trim().to_string(), address.trim().to_string()))
        }
        _ => Err(format!("expected LEASE_ID=ADDRESS, got {:?}", s)),
    }
}

fn open_stores(db_path: Option<&Path>) -> Result<(PaymentStoreRef, LedgerStoreRef)> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(path) = db_path {
        use lease_settlement::infrastructure::rocksdb::RocksDBStore;
        let store = RocksDBStore::open(path).into_diagnostic()?;
        return Ok((Arc::new(store.clone()), Arc::new(store)));
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }

    Ok((
        Arc::new(InMemoryPaymentStore::new()),
        Arc::new(InMemoryLedgerStore::new()),
    ))
}

fn open_transport(redis_url: Option<&str>) -> Result<EventTransportRef> {
    #[cfg(feature = "transport-redis")]
    if let Some(url) = redis_url {
        use lease_settlement::infrastructure::redis::RedisTransport;
        let transport = RedisTransport::open(url).into_diagnostic()?;
        return Ok(Arc::new(transport));
    }

    #[cfg(not(feature = "transport-redis"))]
    if redis_url.is_some() {
        eprintln!(
            "WARNING: Redis transport requested via --redis-url, but 'transport-redis' feature is not enabled. Falling back to In-Process channel."
        );
    }

    Ok(Arc::new(InMemoryChannel::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();

    let (payments, ledger_store) = open_stores(settings.db_path.as_deref())?;
    let transport = open_transport(settings.redis_url.as_deref())?;
    let dead_letters = Arc::new(InMemoryDeadLetters::new());

    let directory = cli.recipients.iter().fold(
        StaticLeaseDirectory::new(payments.clone(), settings.default_recipient.clone()),
        |directory, (lease, address)| directory.with_recipient(lease.clone(), address.clone()),
    );
    let recorder = Arc::new(SettlementRecorder::new(
        payments.clone(),
        ledger_store.clone(),
        Arc::new(SimulatedLedger::new(
            settings.ledger_wallet.clone(),
            settings.ledger_confirm_after,
        )),
        Arc::new(directory),
        dead_letters.clone(),
        PollConfig::from(&settings),
    ));

    // Subscribe before the first publish; the transport does not replay.
    let events = transport.subscribe(&settings.channel).await.into_diagnostic()?;
    let stop_consumer = CancellationToken::new();
    let mut consumer = tokio::spawn({
        let recorder = Arc::clone(&recorder);
        let token = stop_consumer.clone();
        async move { recorder.run(events, token).await }
    });

    let orchestrator = PaymentOrchestrator::new(
        payments.clone(),
        standard_registry(&settings),
        transport.clone(),
        &settings,
    );

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = RequestReader::new(file);
    for request in reader.requests() {
        match request {
            Ok(request) => match orchestrator.create_payment(&request).await {
                Ok(receipt) => tracing::debug!(
                    payment_id = %receipt.payment_id,
                    status = %receipt.status,
                    "payment processed"
                ),
                Err(e) if e.is_provider_error() => {
                    eprintln!("Payment rejected for lease {}: {}", request.lease_id, e);
                }
                Err(e) => {
                    eprintln!("Error processing payment for lease {}: {}", request.lease_id, e);
                }
            },
            Err(e) => {
                eprintln!("Error reading payment request: {}", e);
            }
        }
    }

    // Let the consumer drain what was published, then stop it.
    transport.close(&settings.channel).await.into_diagnostic()?;
    let drain = Duration::from_millis(cli.drain_timeout_ms);
    let recorded = match tokio::time::timeout(drain, &mut consumer).await {
        Ok(joined) => joined.into_diagnostic()?,
        Err(_) => {
            stop_consumer.cancel();
            consumer.await.into_diagnostic()?
        }
    };

    let pollers = recorder.pollers();
    let outcomes = tokio::select! {
        outcomes = pollers.wait() => outcomes,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, cancelling confirmation pollers");
            pollers.shutdown().await
        }
    };
    let count = |wanted: PollOutcome| {
        outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == wanted)
            .count()
    };
    tracing::info!(
        recorded,
        confirmed = count(PollOutcome::Confirmed),
        timed_out = count(PollOutcome::TimedOut),
        cancelled = count(PollOutcome::Cancelled),
        aborted = count(PollOutcome::Aborted),
        "settlement run finished"
    );

    let letters = dead_letters.letters().await;
    if !letters.is_empty() {
        tracing::warn!(count = letters.len(), "settlement run left dead letters");
    }

    let all_payments = payments.all_payments().await.into_diagnostic()?;
    let all_ledger = ledger_store.all_ledger_transactions().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = PaymentWriter::new(stdout.lock());
    writer.write_payments(&all_payments, &all_ledger).into_diagnostic()?;

    Ok(())
}
