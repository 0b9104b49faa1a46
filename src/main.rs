use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    reservation_client::run().await
}
