// src/bin/generate_grid.rs - Write a (sigma, order, sigma_noise) grid for `sweep --grid`

use std::path::PathBuf;

use clap::Parser;
use sweep::cli::GridArgs;

#[derive(Parser)]
struct Cli {
    #[command(flatten)]
    axes: GridArgs,

    /// Output file
    #[arg(long, default_value = "grid.csv")]
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    let grid = args.axes.grid()?;
    grid.to_path(&args.output)?;

    println!("Generated {} points in {}", grid.len(), args.output.display());
    if let (Some(first), Some(last)) = (grid.iter().next(), grid.iter().last()) {
        println!("First: {first}");
        println!("Last:  {last}");
    }

    Ok(())
}
