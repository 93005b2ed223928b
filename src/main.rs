#[tokio::main]
async fn main() -> eyre::Result<()> {
    keyrot::run().start().await
}
