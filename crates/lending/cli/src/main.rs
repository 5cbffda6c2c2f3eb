#[tokio::main]
async fn main() {
    if let Err(e) = lending_cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
