//! courier - 出荷フルフィルメント Worker
//!
//! ```bash
//! # 環境変数の設定で起動（in-memory ストア + HTTP 入口）
//! courier serve --seed ORD-1,ORD-2
//!
//! # 開発用設定で起動
//! courier --backend lookup-patch serve
//!
//! # 1 注文を投入して Delivered まで待つ
//! courier demo --order-id ORD-1 --postal-code K1A0B1
//! ```

mod http;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

use courier_core::app::{
    BackendKind, CourierConfig, InMemoryBackend, ShippingIngress, WorkerBuilder,
};
use courier_core::domain::{OrderId, OrderStatus, ShippingInfo, ShippingRequest};
use courier_core::impls::InMemoryMessageQueue;
use courier_core::observability::{LogFormat, init_tracing};

#[derive(Debug, Parser)]
#[command(name = "courier")]
#[command(about = "Records shipments for queued orders and simulates their delivery")]
#[command(version)]
struct Args {
    /// Use the built-in development configuration with this backend
    /// instead of reading the environment.
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendArg>,

    /// Log output format (`json` or `pretty`).
    #[arg(long, env = "LOG_FORMAT", global = true, default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    LookupPatch,
    KeyedUpdate,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::LookupPatch => BackendKind::LookupPatch,
            BackendArg::KeyedUpdate => BackendKind::KeyedUpdate,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the worker and the HTTP ingress until Ctrl-C.
    Serve {
        /// HTTP port (defaults to `PORT` from the configuration).
        #[arg(long)]
        port: Option<u16>,

        /// Orders to create before starting, comma separated.
        #[arg(long, value_delimiter = ',')]
        seed: Vec<String>,
    },

    /// Queue one order and wait until it is delivered.
    Demo {
        #[arg(long, default_value = "ORD-1")]
        order_id: String,

        #[arg(long, default_value = "K1A0B1")]
        postal_code: String,

        /// Give up after this many seconds.
        #[arg(long, default_value = "120")]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(LogFormat::parse(&args.log_format));

    match args.command {
        Commands::Serve { port, seed } => {
            let config = load_config(args.backend)?;
            serve(config, port, seed).await
        }
        Commands::Demo {
            order_id,
            postal_code,
            timeout_secs,
        } => {
            let kind = args.backend.map_or(BackendKind::LookupPatch, BackendKind::from);
            let config = CourierConfig::development(kind);
            demo(
                config,
                OrderId::new(order_id),
                postal_code,
                Duration::from_secs(timeout_secs),
            )
            .await
        }
    }
}

fn load_config(backend: Option<BackendArg>) -> Result<CourierConfig> {
    match backend {
        Some(kind) => Ok(CourierConfig::development(kind.into())),
        None => CourierConfig::from_env().context("failed to read configuration"),
    }
}

async fn serve(config: CourierConfig, port: Option<u16>, seed: Vec<String>) -> Result<()> {
    let backend = InMemoryBackend::from_config(&config.database);
    for order_id in seed.iter().filter(|id| !id.is_empty()) {
        backend.seed_order(&OrderId::new(order_id.as_str())).await?;
        tracing::info!(order_id = %order_id, "order seeded");
    }

    let queue = InMemoryMessageQueue::with_max_delivery_count(config.worker.max_delivery_count);
    let worker = WorkerBuilder::new(config.worker.clone())
        .store(backend.store())
        .queue(Arc::new(queue.clone()))
        .build()?;
    let handle = worker.spawn();

    let router = http::router(ShippingIngress::new(Arc::new(queue.clone())));
    let addr = SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(config.http_port)));
    tracing::info!(address = %addr, queue = %config.queue.name, "starting shipping ingress");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    handle.shutdown_and_join().await;
    tracing::info!(counts = ?queue.counts_by_state().await, "shutdown complete");
    Ok(())
}

async fn demo(
    config: CourierConfig,
    order_id: OrderId,
    postal_code: String,
    timeout: Duration,
) -> Result<()> {
    let backend = InMemoryBackend::from_config(&config.database);
    backend.seed_order(&order_id).await?;

    let queue = InMemoryMessageQueue::with_max_delivery_count(config.worker.max_delivery_count);
    let handle = WorkerBuilder::new(config.worker.clone())
        .store(backend.store())
        .queue(Arc::new(queue.clone()))
        .build()?
        .spawn();

    let ingress = ShippingIngress::new(Arc::new(queue.clone()));
    let request = ShippingRequest::new(order_id.clone(), ShippingInfo::with_postal_code(postal_code));
    let ack = ingress.submit(&request).await?;
    println!("{}: {}", order_id, ack.status);

    let delivered = tokio::time::timeout(timeout, async {
        loop {
            if backend.order_status(&order_id).await? == Some(OrderStatus::Delivered) {
                return anyhow::Ok(());
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    })
    .await;

    handle.shutdown_and_join().await;
    match delivered {
        Ok(result) => result?,
        Err(_) => bail!("order {order_id} was not delivered within {}s", timeout.as_secs()),
    }

    let doc = backend
        .find_order(&order_id)
        .await?
        .context("order disappeared")?;
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown requested");
}
