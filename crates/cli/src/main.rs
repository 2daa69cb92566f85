use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use bucketfs::BucketFs;

mod cli;

use cli::{Args, Op, OpContext};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.fs_config().context("invalid configuration")?;
    let fs = BucketFs::from_config(&config).context("failed to open bucket")?;
    let ctx = OpContext::new(fs);

    let result = args.command.execute(&ctx).await;
    // Flush anything a failed command left open before reporting
    let closed = ctx.fs.close_all().await;

    let output = result?;
    closed.context("failed to flush open files")?;
    println!("{output}");
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();

    if let Err(err) = run(args).await {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        std::process::exit(1);
    }
}
