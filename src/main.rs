/// SpeedPay - banking ledger backend
///
/// Customers, accounts and money movements for the back office, plus the
/// mobile app and point-of-sale channels.
use speedpay::{config::ServerConfig, context::AppContext, error::BankResult, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> BankResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.logging.level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    let ctx = AppContext::new(config).await?;

    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
   _____                     ______
  / ___/____  ___  ___  ____/ / __ \____ ___  __
  \__ \/ __ \/ _ \/ _ \/ __  / /_/ / __ `/ / / /
 ___/ / /_/ /  __/  __/ /_/ / ____/ /_/ / /_/ /
/____/ .___/\___/\___/\__,_/_/    \__,_/\__, /
    /_/                                /____/

        Banking ledger backend v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
