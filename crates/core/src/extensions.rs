//! Editor extension mapping
//!
//! Manifests list editor extensions by marketplace id. The notebook image
//! installs them from the open registry (Open VSX), where some ids do not
//! exist (proprietary, marketplace-only extensions) and some live under a
//! different publisher. Each declared id is therefore classified as blocked,
//! remapped, or passed through.
//!
//! Lookups are case-insensitive, matching how editors treat extension ids.
//! Declaration order and duplicates are preserved.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::{debug, warn};

/// Reason attached to every built-in blocklist entry.
pub const MARKETPLACE_ONLY: &str =
    "only available from the proprietary Visual Studio Marketplace";

/// Reason attached to every remap entry.
pub const PUBLISHER_DIFFERS: &str = "published under a different id on Open VSX";

/// Extensions that cannot be installed outside the proprietary marketplace.
static BUILTIN_BLOCKLIST: &[&str] = &[
    "github.copilot",
    "github.copilot-chat",
    "ms-python.vscode-pylance",
    "ms-vscode-remote.remote-containers",
    "ms-vscode-remote.remote-ssh-edit",
    "ms-vscode-remote.remote-wsl",
    "ms-vscode-remote.vscode-remote-extensionpack",
    "ms-vscode.cpptools",
    "ms-vscode.cpptools-extension-pack",
    "ms-vsliveshare.vsliveshare",
    "ms-dotnettools.csdevkit",
    "ms-dotnettools.vscodeintellicode-csharp",
    "visualstudioexptteam.vscodeintellicode",
];

/// Extensions whose open-registry counterpart has a different id.
static BUILTIN_REMAP: &[(&str, &str)] = &[
    ("ms-dotnettools.csharp", "muhammad-sammy.csharp"),
    ("ms-vscode-remote.remote-ssh", "jeanp413.open-remote-ssh"),
    ("rust-lang.rust", "rust-lang.rust-analyzer"),
];

static BUILTIN_TABLES: Lazy<ExtensionTables> = Lazy::new(|| {
    let mut tables = ExtensionTables::empty();
    for id in BUILTIN_BLOCKLIST {
        tables.block(id, MARKETPLACE_ONLY);
    }
    for (from, to) in BUILTIN_REMAP {
        tables.remap(from, to);
    }
    tables
});

/// Blocklist and remap table used by [`map_extensions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionTables {
    blocked: IndexMap<String, String>,
    remapped: IndexMap<String, String>,
}

impl ExtensionTables {
    /// Tables with no entries; every id passes through.
    pub fn empty() -> Self {
        Self {
            blocked: IndexMap::new(),
            remapped: IndexMap::new(),
        }
    }

    /// The built-in tables.
    pub fn builtin() -> Self {
        BUILTIN_TABLES.clone()
    }

    /// Block `id` with the given reason. A blocked id is never remapped.
    pub fn block(&mut self, id: &str, reason: &str) -> &mut Self {
        self.blocked.insert(id.to_lowercase(), reason.to_string());
        self
    }

    /// Install `to` whenever `from` is declared.
    pub fn remap(&mut self, from: &str, to: &str) -> &mut Self {
        self.remapped.insert(from.to_lowercase(), to.to_string());
        self
    }

    fn lookup_block(&self, id: &str) -> Option<&str> {
        self.blocked.get(&id.to_lowercase()).map(String::as_str)
    }

    fn lookup_remap(&self, id: &str) -> Option<&str> {
        self.remapped.get(&id.to_lowercase()).map(String::as_str)
    }
}

impl Default for ExtensionTables {
    fn default() -> Self {
        Self::builtin()
    }
}

/// What happens to one declared extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum ExtensionDecision {
    /// Not installed
    Blocked { id: String, reason: String },
    /// Installed under a different id
    Remapped {
        id: String,
        #[serde(rename = "newId")]
        new_id: String,
        reason: String,
    },
    /// Installed as declared
    Passthrough { id: String },
}

impl ExtensionDecision {
    /// The id to install, if any.
    pub fn install_id(&self) -> Option<&str> {
        match self {
            ExtensionDecision::Blocked { .. } => None,
            ExtensionDecision::Remapped { new_id, .. } => Some(new_id.as_str()),
            ExtensionDecision::Passthrough { id } => Some(id.as_str()),
        }
    }

    /// Human-readable message for blocked and remapped ids.
    pub fn warning(&self) -> Option<String> {
        match self {
            ExtensionDecision::Blocked { id, reason } => Some(format!(
                "Extension '{}' is blocked and will not be installed: {}",
                id, reason
            )),
            ExtensionDecision::Remapped { id, new_id, reason } => Some(format!(
                "Extension '{}' will be installed as '{}': {}",
                id, new_id, reason
            )),
            ExtensionDecision::Passthrough { .. } => None,
        }
    }
}

/// Result of mapping a manifest's extension list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionPlan {
    /// One decision per declared id, in declaration order
    pub decisions: Vec<ExtensionDecision>,
    /// Ids to install, in declaration order, blocked ids removed
    pub install: Vec<String>,
    /// One message per blocked or remapped id
    pub warnings: Vec<String>,
}

impl ExtensionPlan {
    pub fn is_empty(&self) -> bool {
        self.install.is_empty()
    }
}

/// Classify `declared` extension ids against `tables`.
///
/// Duplicates are kept: an id declared twice is classified (and installed)
/// twice.
pub fn map_extensions<S: AsRef<str>>(declared: &[S], tables: &ExtensionTables) -> ExtensionPlan {
    let mut plan = ExtensionPlan::default();

    for id in declared {
        let id = id.as_ref();
        let decision = if let Some(reason) = tables.lookup_block(id) {
            ExtensionDecision::Blocked {
                id: id.to_string(),
                reason: reason.to_string(),
            }
        } else if let Some(new_id) = tables.lookup_remap(id) {
            ExtensionDecision::Remapped {
                id: id.to_string(),
                new_id: new_id.to_string(),
                reason: PUBLISHER_DIFFERS.to_string(),
            }
        } else {
            ExtensionDecision::Passthrough { id: id.to_string() }
        };

        if let Some(install) = decision.install_id() {
            plan.install.push(install.to_string());
        }
        match decision.warning() {
            Some(message) => {
                warn!("{}", message);
                plan.warnings.push(message);
            }
            None => debug!("Extension '{}' passes through", id),
        }
        plan.decisions.push(decision);
    }

    plan
}
