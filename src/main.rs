use blog::config::Settings;
use log::error;

#[rocket::main]
async fn main() {
    let settings = Settings::from_env().expect("Failed to read configuration");
    let rocket = blog::rocket(settings).expect("Failed to set up the application");
    if let Err(e) = rocket.launch().await {
        error!("server stopped: {}", e);
        std::process::exit(1);
    }
}
