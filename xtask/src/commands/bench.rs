use anyhow::Result;
use clap::Args;
use xshell::{Shell, cmd};

#[derive(Args)]
pub struct Bench {
    /// Only run benchmarks whose id contains this string, e.g. `native`
    filter: Option<String>,
    /// Save results as a named criterion baseline
    #[arg(long)]
    save_baseline: Option<String>,
    /// Compare against a previously saved baseline
    #[arg(long, conflicts_with = "save_baseline")]
    baseline: Option<String>,
}

impl Bench {
    pub fn run(&self, sh: &Shell) -> Result<()> {
        let mut criterion_args = Vec::new();
        criterion_args.extend(self.filter.iter().cloned());
        if let Some(name) = &self.save_baseline {
            criterion_args.extend(["--save-baseline".to_string(), name.clone()]);
        }
        if let Some(name) = &self.baseline {
            criterion_args.extend(["--baseline".to_string(), name.clone()]);
        }

        eprintln!("Running benchmarks...");
        cmd!(sh, "cargo bench -p kinetica --bench evaluate -- {criterion_args...}").run()?;
        Ok(())
    }
}
