use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rust_decimal::Decimal;
use tokio::time::{Instant, sleep};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use settler_core::SettlerBuilder;
use settler_core::config::Settings;
use settler_core::domain::{NewPayment, PaymentId, PaymentStatus};
use settler_core::impls::{InMemoryPaymentStore, SimulatedGateway, StaticIdentityResolver};

/// Run the settlement daemon against in-memory adapters until every seeded
/// payment has been paid out.
#[derive(Debug, Parser)]
#[command(name = "settler", version)]
struct Args {
    /// Number of payments to create.
    #[arg(long, default_value_t = 3)]
    payments: u32,

    /// Status checks each payment answers `pending` before `success`.
    #[arg(long, default_value_t = 2)]
    pending_polls: u32,

    /// Transfers the gateway refuses before accepting (exercises the revert path).
    #[arg(long, default_value_t = 0)]
    refuse_transfers: u32,

    /// Overrides `daemon.poll_interval_ms`.
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Give up waiting after this many seconds.
    #[arg(long, default_value_t = 30)]
    max_wait_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args = Args::parse();

    // (A) 設定とログ
    let mut settings = Settings::load()?;
    if let Some(ms) = args.poll_interval_ms {
        settings.daemon.poll_interval_ms = ms;
    }
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log.filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // (B) 開発用 adapter を用意
    let store = Arc::new(InMemoryPaymentStore::new());
    let gateway = Arc::new(SimulatedGateway::new(
        settings.gateway.quickpay_base_url.clone(),
        args.pending_polls,
    ));
    gateway.refuse_next_transfers(args.refuse_transfers).await;
    let mut identity = StaticIdentityResolver::new();
    for i in 0..args.payments {
        identity = identity.link(format!("merchant-{i}"), format!("41001{i:011}"));
    }

    // (C) ワイヤリングして daemon を起動
    let app = SettlerBuilder::new()
        .store(store)
        .gateway(gateway)
        .identity(Arc::new(identity))
        .settings(&settings)
        .build()?;
    let restored = app.service.restore_unsettled().await?;
    let daemon = app.daemon.clone().spawn();
    info!(restored, "daemon running");

    // (D) 支払いを作ってリンクを発行（= queue に投入）
    let mut ids: Vec<PaymentId> = Vec::with_capacity(args.payments as usize);
    for i in 0..args.payments {
        let amount = Decimal::new(10_000 + i64::from(i) * 250, 2);
        let request = NewPayment::new(format!("user-{i}"), format!("merchant-{i}"), amount, "RUB");
        let id = app.service.create_payment(request).await?;
        let url = app.service.payment_link(&id).await?;
        println!("{id}: {url}");
        ids.push(id);
    }

    // (E) 全件 COMPLETE になるまでポーリング
    let deadline = Instant::now() + Duration::from_secs(args.max_wait_secs);
    loop {
        let mut settled = 0;
        for id in &ids {
            if app.service.get_payment(id).await?.status == PaymentStatus::Complete {
                settled += 1;
            }
        }
        if settled == ids.len() {
            info!(settled, "all payments complete");
            break;
        }
        if Instant::now() >= deadline {
            warn!(settled, total = ids.len(), "gave up waiting for settlement");
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }

    let counts = daemon.shutdown_and_join().await;
    println!("{}", serde_json::to_string_pretty(&counts)?);
    Ok(())
}
