//! Create command - build a package archive and publish it.

use anyhow::Result;
use clap::Args;
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parcel_pm::{CreateReport, DistributionError, ParcelError};

use crate::progress::ProgressReporter;
use crate::CommandContext;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Path to the package manifest
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,
}

pub fn execute(args: CreateArgs, ctx: &CommandContext) -> Result<i32> {
    let manifest_path = ctx.resolve(&args.manifest);
    let reporter = Arc::new(ProgressReporter::new(ctx.output.clone(), ctx.progress));

    ctx.output.verbose(&format!("Reading {}", manifest_path.display()));
    let result = publish(ctx, &manifest_path, reporter.clone());
    reporter.clear();

    match result {
        Ok((report, endpoint)) => {
            ctx.output.success(&format!(
                "Published {} to {}",
                style(&report.handle).bold(),
                endpoint
            ));
            Ok(0)
        }
        Err(e) => {
            if let ParcelError::Distribution(DistributionError::Upload { archive, .. }) = &e {
                ctx.output
                    .warning(&format!("The archive was kept at {}", archive.display()));
            }
            Err(e.into())
        }
    }
}

/// Build and upload the archive, returning the store it was published to
fn publish(
    ctx: &CommandContext,
    manifest_path: &Path,
    reporter: Arc<ProgressReporter>,
) -> parcel_pm::Result<(CreateReport, String)> {
    let distributor = ctx.distributor()?.with_listener(reporter);
    let report = distributor.create(manifest_path)?;
    Ok((report, distributor.transport().endpoint()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Output;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_publish_to_directory_store() {
        let work = TempDir::new().unwrap();
        let store = TempDir::new().unwrap();
        fs::write(work.path().join("lib.so"), "object").unwrap();
        fs::write(
            work.path().join("parcel.json"),
            r#"{ "name": "lib", "ver": "2", "targets": ["lib.so"] }"#,
        )
        .unwrap();

        let ctx = CommandContext {
            working_dir: work.path().to_path_buf(),
            remote: Some(store.path().to_string_lossy().into_owned()),
            output: Output::new(),
            progress: false,
        };
        let reporter = Arc::new(ProgressReporter::new(Output::new(), false));

        let (report, endpoint) =
            publish(&ctx, &ctx.resolve(Path::new("parcel.json")), reporter).unwrap();

        assert_eq!(report.handle.name(), "lib_2.zip");
        assert_eq!(endpoint, store.path().display().to_string());
        assert!(store.path().join("lib_2.zip").exists());
    }
}
