//! Parcl v3 Liquidation Bot
//!
//! Polling liquidator for the Parcl v3 exchange program on Solana.
//! Features:
//! - Full program scan until margined accounts appear, then a narrowed working set
//! - Liquidation of flagged and under-margined accounts
//! - Priority-fee-aware transaction submission with send retries
//! - Crash-and-restart supervision
//!
//! Account layouts, margin math and instruction encoding come from the
//! protocol SDK through the capability traits in [`protocol`]. A binary wires
//! its SDK into [`launch`]:
//!
//! ```rust,ignore
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     parcl_liquidator::launch(|client| {
//!         Ok(ProtocolComponents::new(
//!             Arc::new(RpcAccountFetcher::new(client, ParclDecoder)),
//!             Arc::new(ParclMargins),
//!             Arc::new(ParclInstructions),
//!         ))
//!     })
//!     .await
//! }
//! ```

use std::sync::Arc;

use anyhow::Result;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::signature::Signer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use liquidator_api::PriorityFeeClient;
use liquidator_chain::{connect, parse_commitment, RpcTransactionSender};
use liquidator_core::{BotConfig, LogFormat, Liquidator, Scanner, ScannerConfig, Settings};

pub use liquidator_chain::protocol;
pub use liquidator_chain::{AccountDecoder, RpcAccountFetcher};

/// Default log filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info,liquidator_core=debug,liquidator_chain=debug";

/// Protocol SDK capabilities the bot runs on.
pub struct ProtocolComponents<P: protocol::Protocol> {
    pub fetcher: Arc<dyn protocol::AccountFetcher<P>>,
    pub evaluator: Arc<dyn protocol::MarginEvaluator<P>>,
    pub instructions: Arc<dyn protocol::LiquidationInstructions<P>>,
}

impl<P: protocol::Protocol> ProtocolComponents<P> {
    pub fn new(
        fetcher: Arc<dyn protocol::AccountFetcher<P>>,
        evaluator: Arc<dyn protocol::MarginEvaluator<P>>,
        instructions: Arc<dyn protocol::LiquidationInstructions<P>>,
    ) -> Self {
        Self {
            fetcher,
            evaluator,
            instructions,
        }
    }
}

/// Initialize the global tracing subscriber.
pub fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
    }
}

/// Start the bot and supervise it forever.
///
/// Returns only on startup failure: bad configuration, an unreachable RPC
/// endpoint, a failing `build`, or an exchange that does not exist.
pub async fn launch<P, F>(build: F) -> Result<()>
where
    P: protocol::Protocol,
    F: FnOnce(Arc<RpcClient>) -> Result<ProtocolComponents<P>>,
{
    // Load environment variables
    dotenvy::dotenv().ok();

    let bot_config = BotConfig::from_env()?;
    init_tracing(bot_config.log_format);
    bot_config.log_config();

    let settings = Settings::from_env()?;

    info!("Starting Parcl v3 Liquidation Bot");
    info!(
        liquidator = %settings.signer.pubkey(),
        margin_account = %settings.liquidator_margin_account,
        "Liquidator identity"
    );

    let commitment = parse_commitment(Some(bot_config.commitment()))?;
    let client = connect(&settings.rpc_url, commitment).await?;

    let components = build(client.clone())?;

    let liquidator = Liquidator::new(
        components.instructions.clone(),
        Arc::new(RpcTransactionSender::new(client)),
        Arc::new(PriorityFeeClient::new(settings.rpc_url.clone())),
        settings.signer.clone(),
        settings.liquidator_margin_account,
    )
    .with_priority_level(bot_config.priority_level)
    .with_max_send_attempts(bot_config.max_send_attempts);

    let scanner = Scanner::new(
        components.fetcher,
        components.evaluator,
        components.instructions,
        Arc::new(liquidator),
        ScannerConfig::from(&bot_config),
    );

    // The first bootstrap is fatal; later ones run under the supervisor
    info!("Bootstrapping...");
    let state = scanner.bootstrap().await?;

    scanner.supervise(state).await;

    Ok(())
}
