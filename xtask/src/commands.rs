use anyhow::Result;
use clap::Subcommand;
use xshell::Shell;

pub mod bench;
pub mod ci;
pub mod common;
pub mod fmt;

/// Workspace tasks; `bench` and `test --skip-native` are specific to the
/// kinetica evaluator backends.
#[derive(Subcommand)]
pub enum Command {
    /// Run the evaluator benchmarks
    Bench(bench::Bench),
    /// Run CI checks (fmt, clippy, doc, bench build, test). Runs all if no subcommand specified.
    Ci(ci::Ci),
    /// Apply rustfmt to all files, or check them with `--check`
    Fmt(fmt::Fmt),
    /// Run the workspace tests
    Test(test::Test),
}

impl Command {
    pub fn run(self, sh: &Shell) -> Result<()> {
        match self {
            Command::Bench(cmd) => cmd.run(sh),
            Command::Ci(cmd) => cmd.run(sh),
            Command::Fmt(cmd) => cmd.run(sh),
            Command::Test(cmd) => cmd.run(sh),
        }
    }
}
