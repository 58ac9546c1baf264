//! Build, deploy and publish commands
//!
//! Each command maps onto one [`LifecycleAction`] run against either the
//! filesystem store or (with `--vcs`) the package's remote repository.

use crate::core::context::ReleaseContext;
use crate::core::error::{PkgError, PkgResult};
use crate::core::vcs::VcsClient;
use crate::release::lifecycle::{LifecycleAction, LifecycleOutcome, LogTrace, PublishReport, ReleaseLifecycle};
use crate::release::policy::ReleaseKind;
use crate::release::record::BuildRecord;
use crate::release::store::TagStore;

/// Flags shared by the lifecycle commands
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
  /// Replace existing destinations
  pub force: bool,
  /// Discover and record tags in the package's remote repository
  pub vcs: bool,
  /// Install the debug trace hook
  pub debug: bool,
  /// Commit the working copy before building (VCS only)
  pub commit: Option<String>,
}

/// Run the build command
pub fn run_build(ctx: &ReleaseContext, options: &RunOptions) -> PkgResult<()> {
  println!("🔨 Building '{}'", ctx.package.name);
  match dispatch(ctx, LifecycleAction::Build, options)? {
    LifecycleOutcome::Built(record) => print_promotion("Built", &record),
    other => return Err(unexpected(other)),
  }
  Ok(())
}

/// Run the deploy command
pub fn run_deploy(ctx: &ReleaseContext, release: ReleaseKind, options: &RunOptions) -> PkgResult<()> {
  println!("🚀 Deploying '{}' ({} release)", ctx.package.name, release);
  match dispatch(ctx, LifecycleAction::Deploy(release), options)? {
    LifecycleOutcome::Deployed(record) => print_promotion("Deployed", &record),
    other => return Err(unexpected(other)),
  }
  Ok(())
}

/// Run the publish command
pub fn run_publish(
  ctx: &ReleaseContext,
  version: String,
  project: String,
  notes: Option<String>,
  options: &RunOptions,
) -> PkgResult<()> {
  println!("📦 Publishing '{}' {} to '{}'", ctx.package.name, version, project);
  let action = LifecycleAction::Publish {
    version,
    project,
    notes,
  };
  match dispatch(ctx, action, options)? {
    LifecycleOutcome::Published(report) => print_publish(&report),
    other => return Err(unexpected(other)),
  }
  Ok(())
}

/// Pick the store, then run the action
fn dispatch(ctx: &ReleaseContext, action: LifecycleAction, options: &RunOptions) -> PkgResult<LifecycleOutcome> {
  if !options.vcs {
    if options.commit.is_some() {
      return Err(PkgError::with_help(
        "--commit requires --vcs",
        "Only VCS-backed packages have a working copy to commit.",
      ));
    }
    return execute(ctx, ctx.filesystem_store(), action, options);
  }

  let store = ctx.vcs_store()?;
  store.sync(options.force)?;
  if let Some(message) = &options.commit {
    store.client().commit(message)?;
    println!("   Committed working copy: {}", message);
  }
  execute(ctx, store, action, options)
}

fn execute<S: TagStore>(
  ctx: &ReleaseContext,
  store: S,
  action: LifecycleAction,
  options: &RunOptions,
) -> PkgResult<LifecycleOutcome> {
  let registry = ctx.registry()?;
  let mut lifecycle = ReleaseLifecycle::new(&ctx.config, ctx.package.clone(), store, registry).with_force(options.force);
  if options.debug {
    lifecycle = lifecycle.with_trace(Box::new(LogTrace));
  }
  lifecycle.run(action)
}

fn unexpected(outcome: LifecycleOutcome) -> PkgError {
  PkgError::message(format!("unexpected lifecycle outcome: {:?}", outcome))
}

fn print_promotion(verb: &str, record: &BuildRecord) {
  println!();
  println!("✅ {} {} {}", verb, record.package.name, record.tag.name);
  println!("   Path:   {}", record.tag.path.display());
  if let Some(commit) = &record.tag.commit {
    println!("   Commit: {}", commit);
  }
  if let Some(branch) = &record.tag.branch {
    println!("   Branch: {}", branch);
  }
}

fn print_publish(report: &PublishReport) {
  println!();
  let created = if report.created_entry { " (new)" } else { "" };
  println!(
    "✅ Published {} {} to project '{}' [id {}{}]",
    report.package, report.version, report.project, report.entry_id, created
  );
  if let Some(path) = &report.notes_path {
    println!("   Release notes: {}", path.display());
  }
  if let Some(root) = &report.mirrored_to {
    println!("   Mirrored to:   {}", root.display());
  }
}
