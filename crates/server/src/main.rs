#[tokio::main]
async fn main() -> anyhow::Result<()> {
    claimintake_server::start().await
}
