pub mod app;
pub mod endpoints;
pub mod http;
pub mod logging;
mod redact;
pub mod settings;
pub mod state;
pub mod storage;
pub mod types;

pub use app::App;

pub async fn run() -> std::process::ExitCode {
    logging::init_tracing("info");
    app::run().await
}
