use std::path::PathBuf;
use std::time::Duration;

/// Channel the payment side publishes settlement events on.
pub const DEFAULT_CHANNEL: &str = "payments";

/// Runtime settings shared by both halves of the pipeline.
///
/// Built once at startup and handed to each component when it is constructed.
#[derive(Debug, Clone)]
pub struct Settings {
    pub channel: String,
    /// Upper bound on how long a settlement event publish may hold up a request.
    pub publish_timeout: Duration,
    pub poll_interval: Duration,
    pub confirmation_deadline: Duration,
    /// Bank rail endpoint. The bank strategy is unavailable without one.
    pub bank_endpoint: Option<String>,
    pub ledger_wallet: String,
    /// Destination used for leases without a configured address.
    pub default_recipient: String,
    /// Number of status checks after which the simulated ledger confirms.
    pub ledger_confirm_after: u32,
    pub db_path: Option<PathBuf>,
    pub redis_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            publish_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_secs(5),
            confirmation_deadline: Duration::from_secs(300),
            bank_endpoint: Some("https://bank.example/api".to_string()),
            ledger_wallet: "0:lease-settlement".to_string(),
            default_recipient: "0:lessor-treasury".to_string(),
            ledger_confirm_after: 1,
            db_path: None,
            redis_url: None,
        }
    }
}
