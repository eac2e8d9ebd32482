//! Executable path resolution for check and agent plugins.
//!
//! Probes may be shipped with the product, overridden site-locally, or live
//! in a plugin family's own `libexec` directory. The finder returns the
//! first existing match in that priority order, rewriting the site root
//! prefix to a portable marker so centrally generated configuration stays
//! valid on hosts with a different absolute layout.

use std::path::{Path, PathBuf};

/// Marker substituted for the site root in generated command paths.
pub const SITE_ROOT_MARKER: &str = "$SITE_ROOT$";

/// Search roots for executable resolution.
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Installation root whose prefix is rewritten to [`SITE_ROOT_MARKER`].
    pub site_root: PathBuf,
    /// Directory containing per-family plugin trees
    /// (`<families_root>/<family>/libexec/<executable>`).
    pub families_root: PathBuf,
    /// Site-local override directory for check executables.
    pub local_checks_root: PathBuf,
    /// Shipped check executables.
    pub shipped_checks_root: PathBuf,
    /// Site-local override directory for agent executables.
    pub local_agents_root: PathBuf,
    /// Shipped agent executables.
    pub shipped_agents_root: PathBuf,
}

impl PathConfig {
    /// The conventional layout below a single site root.
    #[must_use]
    pub fn under_site_root(site_root: impl Into<PathBuf>) -> Self {
        let site_root = site_root.into();
        Self {
            families_root: site_root.join("lib/plugin-families"),
            local_checks_root: site_root.join("local/lib/nagios/plugins"),
            shipped_checks_root: site_root.join("lib/nagios/plugins"),
            local_agents_root: site_root.join("local/share/agents"),
            shipped_agents_root: site_root.join("share/agents"),
            site_root,
        }
    }
}

/// Resolves plugin executables against the configured search roots.
#[derive(Debug, Clone)]
pub struct ExecutableFinder {
    paths: PathConfig,
}

impl ExecutableFinder {
    /// Finder over the given roots.
    #[must_use]
    pub const fn new(paths: PathConfig) -> Self {
        Self { paths }
    }

    /// Resolve a check executable.
    ///
    /// Search order: the family `libexec` directory (if a family hint is
    /// given), the local override root, the shipped root. If nothing
    /// exists the bare name is returned and resolution is deferred to the
    /// PATH lookup at execution time.
    #[must_use]
    pub fn find_check(&self, executable: &str, family: Option<&str>) -> String {
        let mut candidates = Vec::with_capacity(3);
        if let Some(family) = family {
            candidates.push(
                self.paths
                    .families_root
                    .join(family)
                    .join("libexec")
                    .join(executable),
            );
        }
        candidates.push(self.paths.local_checks_root.join(executable));
        candidates.push(self.paths.shipped_checks_root.join(executable));
        candidates
            .into_iter()
            .find(|candidate| candidate.exists())
            .map_or_else(|| executable.to_string(), |found| self.portable(&found))
    }

    /// Resolve a special agent's source path (`special/agent_<name>`).
    ///
    /// The local override wins if it exists; otherwise the shipped path is
    /// returned unconditionally, since agent executables are not expected
    /// on PATH.
    #[must_use]
    pub fn agent_source(&self, agent_name: &str) -> String {
        let file = Path::new("special").join(format!("agent_{agent_name}"));
        let local = self.paths.local_agents_root.join(&file);
        if local.exists() {
            return self.portable(&local);
        }
        self.portable(&self.paths.shipped_agents_root.join(&file))
    }

    fn portable(&self, path: &Path) -> String {
        match path.strip_prefix(&self.paths.site_root) {
            Ok(relative) => format!("{SITE_ROOT_MARKER}/{}", relative.display()),
            Err(_) => path.display().to_string(),
        }
    }
}
