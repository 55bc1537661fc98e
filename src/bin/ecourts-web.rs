use ecourts_scraper::core::config::load_config;
use ecourts_scraper::web::{router, shutdown_signal, DEFAULT_PORT};
use ecourts_scraper::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

fn arg_value(name: &str) -> Option<String> {
    let mut args = std::env::args();
    let prefix = format!("{}=", name);
    while let Some(a) = args.next() {
        if a == name {
            return args.next();
        } else if let Some(rest) = a.strip_prefix(&prefix) {
            return Some(rest.to_string());
        }
    }
    None
}

fn parse_port_from_args() -> Option<u16> {
    arg_value("--port").and_then(|v| v.trim().parse::<u16>().ok())
}

fn port_from_env() -> Option<u16> {
    for k in ["ECOURTS_PORT", "PORT"] {
        if let Ok(v) = std::env::var(k) {
            if let Ok(p) = v.trim().parse::<u16>() {
                return Some(p);
            }
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config_path = arg_value("--config").map(PathBuf::from);
    let config = load_config(config_path.as_deref());
    info!(
        "starting eCourts web front-end (portal {}, output {})",
        config.base_url,
        config.output_dir.display()
    );

    let state = Arc::new(AppState::new(config));
    let app = router(state.clone());

    let port: u16 = parse_port_from_args()
        .or_else(port_from_env)
        .unwrap_or(DEFAULT_PORT);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Address already in use: {}. Stop the existing process or run with --port {} (or set PORT/ECOURTS_PORT).",
                bind_addr,
                port.saturating_add(1)
            )
        }
        Err(e) => return Err(e.into()),
    };
    info!("listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    Ok(())
}
