use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::fs::OpenOptions;
use std::io::Write;
use std::process;
use zoneharvest::{Args, Harvester};

const BUILD: &str = concat!(env!("GIT_HASH"), ", built ", env!("BUILD_TIME"));

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(&args) {
        eprintln!("{:#}", e);
        process::exit(1);
    }

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    info!("zoneharvest {} ({})", zoneharvest::VERSION, BUILD);

    let mut harvester = Harvester::new(args).await?;
    let report = harvester.run().await.context("Harvest failed")?;

    info!(
        "Harvest completed: {} zones checked, {} transfers ({} delegated), {} failed attempts in {:.2}s",
        report.stats.zones_checked,
        report.stats.successful_transfers,
        report.stats.delegated_transfers,
        report.stats.failed_attempts,
        report.stats.duration.as_secs_f64()
    );

    Ok(())
}

/// One line per record: `[2024-01-01 12:00:00][INFO] message`.
fn init_logging(args: &Args) -> Result<()> {
    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        });

    if let Some(path) = &args.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Log file {} cannot be created", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}
