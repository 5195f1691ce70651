use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    advisor_cli::main_entry().await
}
