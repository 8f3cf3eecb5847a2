use std::process::ExitCode;

use blog_server::App;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let app = match App::new().await {
        Ok(app) => app,
        Err(e) => {
            error!("failed to start the blog server: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("blog server is ready");
    match app.serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("blog server stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}
