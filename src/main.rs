use anyhow::Result;
use target_attention::server;
use target_attention::state::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    server::run(cfg).await
}
