#[tokio::main]
async fn main() -> anyhow::Result<()> {
    folder_recorder_lib::run().await
}
