//! Version and build information
//!
//! Provides access to build-time embedded information.

use std::fmt;

/// Build information embedded at compile time
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Package version from Cargo.toml
    pub version: &'static str,
    /// Git commit hash (short)
    pub git_hash: &'static str,
    /// Git branch name
    pub git_branch: &'static str,
    /// Raw git dirty string ("true" or "false")
    git_dirty_str: &'static str,
    /// Build timestamp
    pub build_timestamp: &'static str,
    /// Target triple (e.g., x86_64-unknown-linux-gnu)
    pub target: &'static str,
    /// Triple of the machine that built the binary
    pub host: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
    /// Rustc version used to build
    pub rustc_version: &'static str,
}

impl BuildInfo {
    /// Get the current build information
    pub const fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_hash: env!("TASK_BOOTSTRAP_GIT_HASH"),
            git_branch: env!("TASK_BOOTSTRAP_GIT_BRANCH"),
            git_dirty_str: env!("TASK_BOOTSTRAP_GIT_DIRTY"),
            build_timestamp: env!("TASK_BOOTSTRAP_BUILD_TIMESTAMP"),
            target: env!("TASK_BOOTSTRAP_TARGET"),
            host: env!("TASK_BOOTSTRAP_HOST"),
            profile: env!("TASK_BOOTSTRAP_PROFILE"),
            rustc_version: env!("TASK_BOOTSTRAP_RUSTC_VERSION"),
        }
    }

    /// Whether the working directory was dirty at build time
    pub fn git_dirty(&self) -> bool {
        self.git_dirty_str == "true"
    }

    /// Get the full version string (e.g., "0.1.0-abc1234")
    pub fn full_version(&self) -> String {
        if self.git_dirty() {
            format!("{}-{}-dirty", self.version, self.git_hash)
        } else {
            format!("{}-{}", self.version, self.git_hash)
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.full_version())?;
        writeln!(f, "  Git Branch: {}", self.git_branch)?;
        writeln!(f, "  Built:      {} ({})", self.build_timestamp, self.profile)?;
        writeln!(f, "  Target:     {}", self.target)?;
        writeln!(f, "  Host:       {}", self.host)?;
        write!(f, "  Compiler:   {}", self.rustc_version)
    }
}

/// Get the current build info
pub fn build_info() -> BuildInfo {
    BuildInfo::current()
}

/// Long version text for `--version`
pub fn long_version() -> String {
    build_info().to_string()
}
