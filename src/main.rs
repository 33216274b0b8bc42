use log::error;

use xchange::config::AppConfig;
use xchange::server;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = AppConfig::load();
    if let Err(e) = server::start_server(config).await {
        error!("서버 실행 실패: {}", e);
        std::process::exit(1);
    }
}
