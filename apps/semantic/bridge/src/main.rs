//! Semantic Bridge - Entry Point
//!
//! Consumes insert/search requests from the inbound stream and answers searches.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    semantic_bridge::run().await
}
