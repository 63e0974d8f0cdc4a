#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = qbank_api::run().await {
        eprintln!("qbank-api fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
