use anyhow::Result;
use clap::{Args, Subcommand};
use xshell::{Shell, cmd};

use super::common;

#[derive(Args)]
pub struct Ci {
    #[command(subcommand)]
    command: Option<CiCommand>,
}

#[derive(Subcommand)]
pub enum CiCommand {
    /// Run cargo fmt check
    Fmt,
    /// Run cargo clippy
    Clippy,
    /// Build the docs with warnings denied
    Doc,
    /// Compile the benchmarks without running them
    Bench,
    /// Run cargo test over every target
    Test(TestArgs),
}

#[derive(Args, Default)]
pub struct TestArgs {
    /// Additional arguments to pass to cargo test
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Ci {
    pub fn run(&self, sh: &Shell) -> Result<()> {
        match &self.command {
            Some(cmd) => cmd.run(sh),
            None => {
                // Run all CI checks
                CiCommand::Fmt.run(sh)?;
                CiCommand::Clippy.run(sh)?;
                CiCommand::Doc.run(sh)?;
                CiCommand::Bench.run(sh)?;
                CiCommand::Test(TestArgs::default()).run(sh)?;
                Ok(())
            }
        }
    }
}

impl CiCommand {
    pub fn run(&self, sh: &Shell) -> Result<()> {
        match self {
            CiCommand::Fmt => common::run_fmt_check(sh),
            CiCommand::Clippy => common::run_clippy(sh),
            CiCommand::Doc => {
                eprintln!("Running cargo doc...");
                let _env = sh.push_env("RUSTDOCFLAGS", "-D warnings");
                cmd!(sh, "cargo doc --workspace --no-deps").run()?;
                Ok(())
            }
            CiCommand::Bench => {
                eprintln!("Compiling benchmarks...");
                cmd!(sh, "cargo bench --workspace --no-run").run()?;
                Ok(())
            }
            CiCommand::Test(test_args) => {
                eprintln!("Running cargo test...");
                let args = &test_args.args;
                cmd!(sh, "cargo test --workspace --all-targets {args...}").run()?;
                Ok(())
            }
        }
    }
}
