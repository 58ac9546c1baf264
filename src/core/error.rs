//! Error types for pkgrail with contextual messages and exit codes
//!
//! Every failure a lifecycle operation can produce is categorized here. Low-level
//! I/O and process errors are wrapped once where they are detected (with package
//! and tag names attached through [`ResultExt`]) and then propagated unchanged.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::release::lifecycle::Stage;
use crate::release::tag::TagKind;

/// Exit codes for pkgrail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (environment, unknown version, existing destination)
  User = 1,
  /// System error (git, remote, I/O)
  System = 2,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for pkgrail
#[derive(Debug)]
pub enum PkgError {
  /// Required external configuration is missing
  Environment(EnvironmentError),

  /// Git / remote store errors
  Git(GitError),

  /// Lifecycle transition errors
  Release(ReleaseError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl PkgError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    PkgError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    PkgError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  ///
  /// I/O errors are folded into a message so the context (package, tag, path)
  /// is not lost on the way up.
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      PkgError::Message { message, context, help } => PkgError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      PkgError::Io(err) => PkgError::Message {
        message: format!("I/O error: {}", err),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      PkgError::Environment(_) => ExitCode::User,
      PkgError::Git(_) => ExitCode::System,
      PkgError::Release(_) => ExitCode::User,
      PkgError::Io(_) => ExitCode::System,
      PkgError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      PkgError::Environment(e) => e.help_message(),
      PkgError::Git(e) => e.help_message(),
      PkgError::Release(e) => e.help_message(),
      PkgError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }

  /// True when the error means "the requested version does not exist"
  pub fn is_tag_not_found(&self) -> bool {
    matches!(self, PkgError::Release(ReleaseError::TagNotFound { .. }))
  }

  /// True when the error is a destination conflict that `--force` would resolve
  pub fn is_transition_conflict(&self) -> bool {
    matches!(self, PkgError::Release(ReleaseError::TransitionConflict { .. }))
  }

  /// True when the remote tag listing itself failed
  pub fn is_store_unreachable(&self) -> bool {
    matches!(self, PkgError::Git(GitError::StoreUnreachable { .. }))
  }
}

impl fmt::Display for PkgError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PkgError::Environment(e) => write!(f, "{}", e),
      PkgError::Git(e) => write!(f, "{}", e),
      PkgError::Release(e) => write!(f, "{}", e),
      PkgError::Io(e) => write!(f, "I/O error: {}", e),
      PkgError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for PkgError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      PkgError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for PkgError {
  fn from(err: io::Error) -> Self {
    PkgError::Io(err)
  }
}

impl From<String> for PkgError {
  fn from(msg: String) -> Self {
    PkgError::message(msg)
  }
}

impl From<&str> for PkgError {
  fn from(msg: &str) -> Self {
    PkgError::message(msg)
  }
}

impl From<EnvironmentError> for PkgError {
  fn from(err: EnvironmentError) -> Self {
    PkgError::Environment(err)
  }
}

impl From<GitError> for PkgError {
  fn from(err: GitError) -> Self {
    PkgError::Git(err)
  }
}

impl From<ReleaseError> for PkgError {
  fn from(err: ReleaseError) -> Self {
    PkgError::Release(err)
  }
}

impl From<serde_json::Error> for PkgError {
  fn from(err: serde_json::Error) -> Self {
    PkgError::message(format!("JSON error: {}", err))
  }
}

impl From<toml_edit::de::Error> for PkgError {
  fn from(err: toml_edit::de::Error) -> Self {
    PkgError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<toml_edit::ser::Error> for PkgError {
  fn from(err: toml_edit::ser::Error) -> Self {
    PkgError::message(format!("TOML serialization error: {}", err))
  }
}

impl From<semver::Error> for PkgError {
  fn from(err: semver::Error) -> Self {
    PkgError::message(format!("Version error: {}", err))
  }
}

impl From<std::num::ParseIntError> for PkgError {
  fn from(err: std::num::ParseIntError) -> Self {
    PkgError::message(format!("Parse error: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for PkgError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    PkgError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<std::path::StripPrefixError> for PkgError {
  fn from(err: std::path::StripPrefixError) -> Self {
    PkgError::message(format!("Path strip prefix error: {}", err))
  }
}

/// Missing external configuration. Fatal at construction, never recovered.
#[derive(Debug)]
pub enum EnvironmentError {
  /// A required environment variable (or config key) is not set
  MissingVariable { name: String },

  /// A root needed by this operation is not configured
  MissingRoot { name: String, purpose: String },
}

impl EnvironmentError {
  fn help_message(&self) -> Option<String> {
    match self {
      EnvironmentError::MissingVariable { name } => Some(format!(
        "Export {} or pass --config <path> with the equivalent key.",
        name
      )),
      EnvironmentError::MissingRoot { name, .. } => Some(format!("Set {} before running this command.", name)),
    }
  }
}

impl fmt::Display for EnvironmentError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EnvironmentError::MissingVariable { name } => {
        write!(f, "Required environment variable [{}] not found", name)
      }
      EnvironmentError::MissingRoot { name, purpose } => {
        write!(f, "Root [{}] is required to {}", name, purpose)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// A git primitive exited non-zero or could not be spawned.
  /// `output` carries the combined stdout/stderr diagnostic.
  CommandFailed { command: String, output: String },

  /// The remote tag listing failed. Distinct from "zero tags found".
  StoreUnreachable { remote: String, output: String },

  /// Path exists but is not a git working copy
  NotARepository { path: PathBuf },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::StoreUnreachable { output, .. } => {
        if output.contains("Permission denied") || output.contains("publickey") {
          Some("Check that your SSH key is registered with the repository server.".to_string())
        } else {
          Some("Check GT_REPO_SERVER / GT_REPO_ROOT and network access to the server.".to_string())
        }
      }
      GitError::NotARepository { path } => Some(format!(
        "Remove {} or re-run with --force to re-clone it.",
        path.display()
      )),
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, output } => {
        write!(f, "Git command failed: {}\n{}", command, output)
      }
      GitError::StoreUnreachable { remote, output } => {
        write!(f, "Unable to list tags on [{}]\n{}", remote, output)
      }
      GitError::NotARepository { path } => {
        write!(f, "[{}] is not a valid repo", path.display())
      }
    }
  }
}

/// Lifecycle transition errors
#[derive(Debug)]
pub enum ReleaseError {
  /// The requested tag does not exist in its store
  TagNotFound { package: String, tag: String },

  /// Destination already exists and no force flag was given
  TransitionConflict {
    package: String,
    stage: Stage,
    tag: String,
    path: PathBuf,
  },

  /// A copy or record step failed part-way through a transition
  Transition {
    package: String,
    stage: Stage,
    tag: String,
    message: String,
  },

  /// A tag label does not parse under its kind
  InvalidTag { name: String, kind: TagKind },

  /// Version promotion attempted from a protected branch
  ProtectedBranch { branch: String },
}

impl ReleaseError {
  fn help_message(&self) -> Option<String> {
    match self {
      ReleaseError::TagNotFound { package, .. } => Some(format!(
        "List available versions with `pkgrail tags {}`.",
        package
      )),
      ReleaseError::TransitionConflict { .. } => {
        Some("Re-run with --force to replace the existing destination.".to_string())
      }
      ReleaseError::ProtectedBranch { .. } => {
        Some("Check out a release branch before deploying a new version.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ReleaseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseError::TagNotFound { package, tag } => {
        write!(f, "[{}] [{}] does not exist", package, tag)
      }
      ReleaseError::TransitionConflict {
        package,
        stage,
        tag,
        path,
      } => write!(
        f,
        "[{}] {} of [{}] would overwrite {}",
        package,
        stage,
        tag,
        path.display()
      ),
      ReleaseError::Transition {
        package,
        stage,
        tag,
        message,
      } => write!(f, "[{}] {} of [{}] failed: {}", package, stage, tag, message),
      ReleaseError::InvalidTag { name, kind } => {
        write!(f, "[{}] is not a valid {} tag", name, kind)
      }
      ReleaseError::ProtectedBranch { branch } => {
        write!(f, "Versioning [{}] branch is prohibited", branch)
      }
    }
  }
}

/// Result type alias for pkgrail
pub type PkgResult<T> = Result<T, PkgError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> PkgResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> PkgResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<PkgError>,
{
  fn context(self, ctx: impl Into<String>) -> PkgResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> PkgResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &PkgError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
