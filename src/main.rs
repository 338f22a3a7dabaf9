#[tokio::main]
async fn main() -> std::process::ExitCode {
    microblog_client_lib::run().await
}
