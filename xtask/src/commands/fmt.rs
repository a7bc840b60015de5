use anyhow::Result;
use clap::Args;
use xshell::Shell;

use super::common;

#[derive(Args)]
pub struct Fmt {
    /// Only report unformatted files across the kinetica crates
    #[arg(long)]
    check: bool,
}

impl Fmt {
    pub fn run(&self, sh: &Shell) -> Result<()> {
        if self.check {
            common::run_fmt_check(sh)
        } else {
            common::run_fmt(sh)
        }
    }
}
