use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    formfill_cli::cli::app::run().await
}
