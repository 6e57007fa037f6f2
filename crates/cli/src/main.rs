//! This is the CLI driver for inspecting LLVM IR. For more detail, please see
//! the documentation for the [`irlens_binding`] crate.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies

mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use irlens_binding::{ConstantOptions, OptimizationOptions, PipelineLevel, SourceContext};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::report::ReportOptions;

#[derive(Parser)]
#[command(name = "irlens")]
#[command(about = "Prints the structure of an LLVM IR module")]
#[command(version)]
struct Cli {
    /// The textual LLVM IR file to inspect
    file: PathBuf,

    /// Only print the function with this name
    #[arg(short, long)]
    function: Option<String>,

    /// Read integer constants as two's-complement signed values
    #[arg(long)]
    signed: bool,

    /// Round floating-point constants that do not fit in a double
    #[arg(long)]
    round_fp: bool,

    /// Print the attributes of functions and call sites
    #[arg(short, long)]
    attributes: bool,

    /// Optimize the module with this pipeline (O0, O1, O2, O3, Os, or Oz)
    /// before printing it
    #[arg(short = 'O', long, value_name = "LEVEL")]
    optimize: Option<PipelineLevel>,

    /// Do not unroll loops when optimizing
    #[arg(long, requires = "optimize")]
    disable_unroll: bool,

    /// Vectorize loops when optimizing
    #[arg(long, requires = "optimize")]
    loop_vectorize: bool,

    /// Vectorize straight-line code when optimizing
    #[arg(long, requires = "optimize")]
    slp_vectorize: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Gets the optimizations to run before printing, if any were asked for.
    fn optimization(&self) -> Option<OptimizationOptions> {
        self.optimize.map(|level| {
            OptimizationOptions::new()
                .with_level(level)
                .with_loop_unrolling(!self.disable_unroll)
                .with_loop_vectorization(self.loop_vectorize)
                .with_slp_vectorization(self.slp_vectorize)
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let mut ctx = SourceContext::create();
    ctx.add_module(cli.file.as_path())
        .with_context(|| format!("Failed to load {}", cli.file.display()))?;
    info!(file = %cli.file.display(), "loaded module");

    if let Some(optimization) = cli.optimization() {
        ctx.modify_modules(|module| module.optimize(&optimization))
            .with_context(|| format!("Failed to optimize {}", cli.file.display()))?;
        info!(level = %optimization.level(), "optimized module");
    }

    let options = ReportOptions {
        function:   cli.function,
        constants:  ConstantOptions::new()
            .with_signed_int(cli.signed)
            .with_round_fp(cli.round_fp),
        attributes: cli.attributes,
    };

    for lines in ctx.analyze_modules(|module| report::describe_module(module, &options))? {
        for line in lines {
            println!("{line}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use clap::Parser;
    use irlens_binding::PipelineLevel;

    use crate::Cli;

    #[test]
    fn leaves_modules_unoptimized_by_default() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["irlens", "input.ll"])?;
        assert!(cli.optimization().is_none());
        Ok(())
    }

    #[test]
    fn reads_optimization_flags() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["irlens", "input.ll", "-O", "3", "--disable-unroll", "--slp-vectorize"])?;
        let options = cli.optimization().expect("optimization was requested");
        assert_eq!(options.level(), PipelineLevel::O3);
        assert!(!options.loop_unrolling());
        assert!(!options.loop_vectorization());
        assert!(options.slp_vectorization());

        let cli = Cli::try_parse_from(["irlens", "input.ll", "--optimize", "Os"])?;
        let options = cli.optimization().expect("optimization was requested");
        assert_eq!(options.level(), PipelineLevel::Os);
        assert!(options.loop_unrolling());
        Ok(())
    }

    #[test]
    fn rejects_tuning_without_a_level() {
        assert!(Cli::try_parse_from(["irlens", "input.ll", "--loop-vectorize"]).is_err());
        assert!(Cli::try_parse_from(["irlens", "input.ll", "-O", "4"]).is_err());
    }
}
