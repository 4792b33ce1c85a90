use anyhow::{Context, Result};
use clap::Parser;
use saleval::{
    backend::create_device,
    cli::{Cli, Commands},
    logging::init_logging,
    run_evaluation, NAME,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Evaluate(args) => {
            let config = args.to_config()?;

            let report = run_evaluation(&config, create_device()).context("evaluation failed")?;
            print!("{report}");

            if let Some(path) = &args.json {
                report.write_json(path)?;
            }
            if let Some(path) = &args.curve_csv {
                report.write_curve_csv(path)?;
            }
            Ok(())
        }

        Commands::Info => {
            println!("saleval Information:");
            println!("  Backend: {NAME}");
            println!("  Device: {:?}", create_device());
            Ok(())
        }
    }
}
