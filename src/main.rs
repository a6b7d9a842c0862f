mod app;
mod application;
mod config;
mod domain;
mod engine;
mod settings;
mod ui;
mod utils;

use tracing_subscriber::EnvFilter;

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ytdl_desk=info")),
        )
        .init();

    let config = config::AppConfig::detect();
    tracing::info!(platform = ?config.platform, engine = %config.engine_program.display(), "starting");

    iced::application(app::boot(config), app::update, app::view)
        .title(app::DownloadApp::title)
        .subscription(app::subscription)
        .window_size((820.0, 680.0))
        .run()
}
