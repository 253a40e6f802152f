use clap::Parser;
use prepdeck::{db::Db, router, AppState};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Database address: a `file:` path or a remote sqld server URL.
    #[arg(env)]
    url: String,

    /// Authentication token for a remote database.
    #[arg(env, default_value = "")]
    auth_token: String,

    /// The address to bind to.
    #[arg(short, long, env, default_value = "127.0.0.1:1414")]
    address: String,

    /// Mark cookies Secure (behind TLS).
    #[arg(long, env, default_value_t = false)]
    secure_cookies: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tracing=info,prepdeck=debug".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let args = Args::parse();

    let db = Db::new(args.url, args.auth_token).await?;
    let app = router(AppState {
        db,
        secure_cookies: args.secure_cookies,
    });

    let listener = tokio::net::TcpListener::bind(&args.address).await?;
    tracing::info!("listening on {}", args.address);
    axum::serve(listener, app).await?;

    Ok(())
}
