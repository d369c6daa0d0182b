use std::env;

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = cf_download::cli::run(args).await {
        eprintln!("\nError: {e}");
        std::process::exit(1);
    }
}
