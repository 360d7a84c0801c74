#![forbid(unsafe_code)]

//! Binary entrypoint for the `cassvault` CLI.

#[tokio::main]
async fn main() {
    let exit_code = cassvault_cli::run().await;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
