#[tokio::main]
async fn main() -> anyhow::Result<()> {
    docqa_lib::run().await
}
