use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    ragline_cli::main_entry().await
}
