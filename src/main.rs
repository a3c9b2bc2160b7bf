use anyhow::Result;
use clap::Parser;

use spatial_allocator::cli::{Cli, Commands};
use spatial_allocator::commands::allocate;

fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Allocate(args) => allocate::run(&cli, args),
    }
}
