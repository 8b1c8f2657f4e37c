#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bookchat_lib::run().await
}
