//! List platforms matching a name filter.
//!
//! ```text
//! STRATUM_HOST=server STRATUM_USERNAME=me STRATUM_PASSWORD=secret \
//!     RUST_LOG=stratum_client=debug cargo run --example platforms -- linux
//! ```

use serde::Deserialize;
use stratum_client::{Client, Config};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct Platform {
    id: i64,
    name: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let filter = std::env::args().nth(1).unwrap_or_else(|| "linux".to_string());

    let client = Client::connect(Config::from_env()?.with_user_agent("platforms-demo"))?;

    let platforms: Vec<Platform> = client
        .get(&format!(
            "platform/?orderby=name&select=id,name&where=name~{}",
            filter
        ))?
        .apply()?;

    for platform in &platforms {
        println!("[{}] {}", platform.id, platform.name);
    }

    Ok(())
}
