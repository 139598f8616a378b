#[tokio::main]
async fn main() -> anyhow::Result<()> {
    loanbook_lib::run().await
}
