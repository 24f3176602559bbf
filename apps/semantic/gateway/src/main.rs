#[tokio::main]
async fn main() -> eyre::Result<()> {
    semantic_gateway::run().await
}
