/// Loyalty points backend server binary
use loyalty_points::{config::ServerConfig, context::AppContext, error::PointsResult, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> PointsResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loyalty_points=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    let config = ServerConfig::from_env()?;

    let ctx = AppContext::new(config).await?;

    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    __                   ____
   / /   ____  __  __   / __ \____  (_)___  / /______
  / /   / __ \/ / / /  / /_/ / __ \/ / __ \/ __/ ___/
 / /___/ /_/ / /_/ /  / ____/ /_/ / / / / / /_(__  )
/_____/\____/\__, /  /_/    \____/_/_/ /_/\__/____/
            /____/

        Loyalty Points Backend v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
