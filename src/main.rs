use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use dining_philosophers::{SimConfig, SyncLog, Table};

fn main() -> Result<()> {
    let config = parse_args(env::args().skip(1))?;

    let log = Arc::new(SyncLog::stdout());
    let table = Table::new(config.philosophers, Arc::clone(&log))
        .context("failed to set the table")?;

    for protocol in config.protocol.runs() {
        println!(
            "{}",
            format!(
                "== {} protocol: {} philosophers, {} bites of {} ms ==",
                protocol, config.philosophers, config.bites, config.bite_millis
            )
            .bold()
        );

        let summary = table
            .run(&config.options(protocol))
            .with_context(|| format!("{protocol} protocol run failed"))?;

        println!(
            "{} {} protocol finished in {:.3} seconds",
            "ok".green(),
            summary.protocol,
            summary.elapsed.as_secs_f64()
        );
    }

    Ok(())
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<SimConfig> {
    let mut config = SimConfig::default();
    let mut args = args;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a file path")?;
                config = SimConfig::load(Path::new(&path))
                    .with_context(|| format!("failed to load {path}"))?;
            }
            "--philosophers" => {
                config.philosophers = parse_value(&mut args, "--philosophers")?;
            }
            "--bites" => {
                config.bites = parse_value(&mut args, "--bites")?;
            }
            "--bite-millis" => {
                config.bite_millis = parse_value(&mut args, "--bite-millis")?;
            }
            "--protocol" => {
                let value = args.next().context("--protocol needs a value")?;
                config.protocol = value.parse()?;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => bail!("unknown argument '{other}' (try --help)"),
        }
    }

    config.validate()?;
    Ok(config)
}

fn parse_value<T>(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = args.next().with_context(|| format!("{flag} needs a value"))?;
    value
        .parse()
        .with_context(|| format!("invalid value '{value}' for {flag}"))
}

fn print_usage() {
    println!("Simulates dining philosophers around a ring of shared forks.");
    println!();
    println!("Usage: dining-philosophers [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config FILE        load settings from a TOML file (later flags override)");
    println!("  --philosophers N     number of seats at the table (default 10)");
    println!("  --bites N            bites per philosopher (default 10)");
    println!("  --bite-millis N      how long one bite is held, in ms (default 1000)");
    println!("  --protocol NAME      backoff, ordered, or both (default both)");
    println!("  --help               show this message");
}
