use aerospacer_cli::args::{parse_args, USAGE};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aerospacer_cli::init_tracing()?;

    let cli = match parse_args(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    aerospacer_cli::run(cli).await
}
