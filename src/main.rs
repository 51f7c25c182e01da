#[tokio::main]
async fn main() {
    if let Err(e) = tabulon_lib::run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
