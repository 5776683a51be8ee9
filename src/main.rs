//! Entry point for machsym.
//!
//! This file handles high-level application flow:
//! 1. Parse command-line arguments using `clap`.
//! 2. Install the `tracing` subscriber.
//! 3. Load the Mach-O file into an in-memory image.
//! 4. Run the requested passes in order.
//! 5. Write the recovered address to name map.
//!
//! Error handling is done via `anyhow`.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use machsym::config::{Config, Pass};
use machsym::image::MemoryImage;
use machsym::pass::PassOutcome;
use machsym::{bind, macho, objc, selrefs};

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn log_skip<R>(pass: Pass, outcome: &PassOutcome<R>) {
    if let PassOutcome::Skipped(reason) = outcome {
        info!("{:?} pass skipped: {}", pass, reason);
    }
}

fn run_pass(config: &Config, image: &mut MemoryImage, pass: Pass) -> Result<()> {
    match pass {
        Pass::ObjcMethods => {
            let outcome = objc::run(image).context("objc method naming failed")?;
            log_skip(pass, &outcome);
        }
        Pass::Selrefs => {
            let outcome = selrefs::run(image);
            log_skip(pass, &outcome);
        }
        Pass::Bind => {
            let listing = match &config.bind_listing {
                Some(path) => fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => match bind::capture(&config.input) {
                    Ok(listing) => listing,
                    Err(err) => {
                        warn!("bind pass skipped: {:#}", err);
                        return Ok(());
                    }
                },
            };
            let entries = bind::parse(&listing);
            let outcome = bind::run(image, &entries);
            log_skip(pass, &outcome);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(&config.log_level);

    let mut image = macho::open(&config.input)?;
    for &pass in &config.passes {
        run_pass(&config, &mut image, pass)?;
    }

    match &config.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            image.write_names(&mut out)?;
            out.flush()?;
            info!("Wrote names to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            image.write_names(stdout.lock())?;
        }
    }
    Ok(())
}
