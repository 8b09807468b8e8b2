mod cli;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dualcare=info".into()),
        )
        .init();

    match cli::run() {
        cli::RunOutcome::Serve { config, addr } => {
            println!("listening on http://{addr}");
            dualcare::serve(addr, config).await;
        }
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    }
}
