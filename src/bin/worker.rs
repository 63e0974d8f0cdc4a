#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = qbank_api::run_worker().await {
        eprintln!("qbank-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
