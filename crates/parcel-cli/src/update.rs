//! Update command - fetch and unpack the dependencies of a manifest.

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parcel_pm::{DistributionError, ParcelError, UpdateReport};

use crate::progress::ProgressReporter;
use crate::CommandContext;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Path to the manifest listing the dependencies
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,
}

pub fn execute(args: UpdateArgs, ctx: &CommandContext) -> Result<i32> {
    let manifest_path = ctx.resolve(&args.manifest);
    let reporter = Arc::new(ProgressReporter::new(ctx.output.clone(), ctx.progress));

    ctx.output.info(&format!(
        "Updating dependencies into {}",
        ctx.working_dir.display()
    ));
    let result = install(ctx, &manifest_path, reporter.clone());
    reporter.clear();

    match result {
        Ok(report) if report.applied.is_empty() => {
            ctx.output.info("Nothing to update");
            Ok(0)
        }
        Ok(report) => {
            ctx.output.success(&format!(
                "{} dependencies installed",
                report.applied.len()
            ));
            Ok(0)
        }
        Err(e) => {
            if let ParcelError::Distribution(DistributionError::Dependency { index, .. }) = &e {
                if *index > 0 {
                    ctx.output.warning(&format!(
                        "{} earlier dependencies stay applied; running update again starts from the first one",
                        index
                    ));
                }
            }
            Err(e.into())
        }
    }
}

fn install(
    ctx: &CommandContext,
    manifest_path: &Path,
    reporter: Arc<ProgressReporter>,
) -> parcel_pm::Result<UpdateReport> {
    let distributor = ctx.distributor()?.with_listener(reporter);
    Ok(distributor.update(manifest_path)?)
}
