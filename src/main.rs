#[tokio::main]
async fn main() {
    if let Err(e) = pinboard_lib::run().await {
        eprintln!("pinboard: {}", e);
        std::process::exit(1);
    }
}
