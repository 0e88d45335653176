use clap::Parser;
use fixture_cli::{run, Args};

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "dal_fixture=info,db_infra=info".into()),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("fixture failed: {e}");
        std::process::exit(1);
    }
}
