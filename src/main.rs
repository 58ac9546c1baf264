use clap::{Parser, Subcommand};
use pkgrail::commands::{self, RunOptions};
use pkgrail::core::config::{EnvConfig, Operator};
use pkgrail::core::context::ReleaseContext;
use pkgrail::core::error::{PkgError, PkgResult, print_error};
use pkgrail::release::lifecycle::DEFAULT_PROJECT;
use pkgrail::release::policy::ReleaseKind;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable naming the default publish project
const PROJECT_VAR: &str = "PROJECT_NAME";

/// Promote packages through build, deploy and publish
#[derive(Parser)]
#[command(name = "pkgrail")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  /// Verbose diagnostics and transition tracing
  #[arg(long, global = true)]
  debug: bool,

  /// Read roots from a TOML file instead of the environment
  #[arg(long, global = true, value_name = "PATH")]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Copy the working copy into the build root under the next build tag
  Build {
    /// Package name
    package: String,
    /// Replace an existing build
    #[arg(long)]
    force: bool,
    /// Use the package's remote repository for tags
    #[arg(long)]
    vcs: bool,
    /// Commit the working copy before building (requires --vcs)
    #[arg(long, value_name = "MESSAGE")]
    commit: Option<String>,
  },

  /// Build, then promote into the deploy root under the next version
  Deploy {
    /// Package name
    package: String,
    /// Which version component to bump
    #[arg(long, value_enum)]
    release: ReleaseKind,
    /// Replace existing destinations
    #[arg(long)]
    force: bool,
    /// Use the package's remote repository for tags
    #[arg(long)]
    vcs: bool,
  },

  /// Pin a deployed version under a project
  Publish {
    /// Package name
    package: String,
    /// Deployed version to publish (x.y.z)
    #[arg(long)]
    version: String,
    /// Project code (default: $PROJECT_NAME or "default")
    #[arg(long)]
    project: Option<String>,
    /// Text for the release notes
    #[arg(long)]
    notes: Option<String>,
  },

  /// List build or version tags in order
  Tags {
    /// Package name
    package: String,
    /// List build tags instead of versions
    #[arg(long)]
    builds: bool,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
    /// Read tags from the package's remote repository
    #[arg(long)]
    vcs: bool,
  },
}

impl Commands {
  fn package(&self) -> &str {
    match self {
      Commands::Build { package, .. }
      | Commands::Deploy { package, .. }
      | Commands::Publish { package, .. }
      | Commands::Tags { package, .. } => package,
    }
  }
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.debug);

  // Environment is read here and nowhere else
  let config = match load_config(cli.config.as_deref()) {
    Ok(config) => config,
    Err(e) => handle_error(e),
  };
  let default_project = std::env::var(PROJECT_VAR)
    .ok()
    .filter(|p| !p.is_empty())
    .unwrap_or_else(|| DEFAULT_PROJECT.to_string());

  let ctx = match ReleaseContext::build(config, cli.command.package()) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    Commands::Build {
      force, vcs, commit, ..
    } => commands::run_build(
      &ctx,
      &RunOptions {
        force,
        vcs,
        debug: cli.debug,
        commit,
      },
    ),
    Commands::Deploy {
      release, force, vcs, ..
    } => commands::run_deploy(
      &ctx,
      release,
      &RunOptions {
        force,
        vcs,
        debug: cli.debug,
        commit: None,
      },
    ),
    Commands::Publish {
      version,
      project,
      notes,
      ..
    } => commands::run_publish(
      &ctx,
      version,
      project.unwrap_or(default_project),
      notes,
      &RunOptions {
        debug: cli.debug,
        ..Default::default()
      },
    ),
    Commands::Tags {
      builds, json, vcs, ..
    } => commands::run_tags(&ctx, builds, json, vcs),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` for pkgrail under `--debug`
fn init_tracing(debug: bool) {
  let default = if debug { "pkgrail=debug,info" } else { "info" };
  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false),
    )
    .init();
}

fn load_config(path: Option<&Path>) -> PkgResult<EnvConfig> {
  let config = match path {
    Some(path) => EnvConfig::load(path)?,
    None => EnvConfig::from_env()?,
  };
  Ok(config.with_operator(Operator::detect()))
}

fn handle_error(err: PkgError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
