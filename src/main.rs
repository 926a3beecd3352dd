use anyhow::Result;
use clap::Parser;

mod commands;

use commands::{
    build_store, build_store_from_config, fetch_value, inspect_store, BuildArgs, Cli, Commands,
};

fn main() -> Result<()> {
    let args = Cli::parse();
    pathstore::logging::init_logger(args.verbose);

    match args.command {
        Commands::Build {
            output,
            end_date,
            months,
            sources,
            statistics,
            practice_list,
            test_code_list,
            retain_empty,
        } => build_store(BuildArgs {
            output,
            end_date,
            months,
            sources,
            statistics,
            practice_list,
            test_code_list,
            retain_empty,
        }),

        Commands::BuildFromConfig { config } => build_store_from_config(&config),

        Commands::Fetch {
            store,
            test_code,
            category,
            practice,
            date,
            statistic,
        } => fetch_value(
            &store,
            test_code.as_deref(),
            category,
            &practice,
            &date,
            statistic.as_deref(),
        ),

        Commands::Inspect {
            store,
            test_code,
            dump,
        } => inspect_store(&store, test_code.as_deref(), dump),
    }
}
