//! Process-wide and per-session variable bags.
//!
//! Every mutation of one bag happens under that bag's lock, so concurrent `set`/`clear` calls on
//! the same bag never lose updates. Each session bag has its own lock; the session table lock is
//! only held to look up or create a bag.

use parking_lot::{Mutex, RwLock};
use postman_mcp_http_tools::template::VarMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Which bag a `set_vars` style call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    #[default]
    Session,
    Global,
}

impl ScopeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeKind::Session => "session",
            ScopeKind::Global => "global",
        }
    }

    /// Resolve against the caller's session. Without a session id, `Session` means the global bag.
    #[must_use]
    pub fn target(self, session_id: Option<&str>) -> ScopeTarget<'_> {
        match (self, session_id) {
            (ScopeKind::Session, Some(id)) => ScopeTarget::Session(id),
            _ => ScopeTarget::Global,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeTarget<'a> {
    Global,
    Session(&'a str),
}

/// A composite mutation applied atomically: reset, then clear, then set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarUpdate {
    pub reset_to_baseline: bool,
    pub clear: Vec<String>,
    pub set: VarMap,
}

impl VarUpdate {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.reset_to_baseline && self.clear.is_empty() && self.set.is_empty()
    }
}

#[derive(Debug)]
pub struct VariableScopeStore {
    baseline: Arc<VarMap>,
    global: Mutex<VarMap>,
    sessions: RwLock<HashMap<String, Arc<Mutex<VarMap>>>>,
}

impl Default for VariableScopeStore {
    fn default() -> Self {
        Self::new(VarMap::new())
    }
}

impl VariableScopeStore {
    /// Seed the global bag with `baseline`. New session bags are seeded from it too.
    #[must_use]
    pub fn new(baseline: VarMap) -> Self {
        Self {
            global: Mutex::new(baseline.clone()),
            baseline: Arc::new(baseline),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of the session bag (created lazily), or of the global bag without a session.
    #[must_use]
    pub fn read(&self, session_id: Option<&str>) -> VarMap {
        match session_id {
            Some(id) => self.session_bag(id).lock().clone(),
            None => self.global.lock().clone(),
        }
    }

    /// Merge every layer for one call, lowest priority first:
    /// `defaults < baseline < global < session < call`.
    ///
    /// `defaults` are document-level values (collection variables). Nothing is mutated.
    #[must_use]
    pub fn merge_call_vars(
        &self,
        session_id: Option<&str>,
        defaults: &VarMap,
        call: &VarMap,
    ) -> VarMap {
        let mut merged = defaults.clone();
        merged.extend(self.baseline.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged.extend(self.global.lock().clone());
        if let Some(id) = session_id {
            let bag = self.session_bag(id);
            merged.extend(bag.lock().iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged.extend(call.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub fn set(&self, target: ScopeTarget<'_>, vars: &VarMap) {
        self.with_bag(target, |bag| {
            bag.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        });
    }

    pub fn clear(&self, target: ScopeTarget<'_>, keys: &[String]) {
        self.with_bag(target, |bag| {
            for key in keys {
                bag.remove(key);
            }
        });
    }

    pub fn reset_to_baseline(&self, target: ScopeTarget<'_>) {
        let baseline = Arc::clone(&self.baseline);
        self.with_bag(target, |bag| {
            bag.clone_from(&baseline);
        });
    }

    /// Apply `update` in a single critical section on the target bag.
    pub fn apply(&self, target: ScopeTarget<'_>, update: &VarUpdate) {
        let baseline = Arc::clone(&self.baseline);
        self.with_bag(target, |bag| {
            if update.reset_to_baseline {
                bag.clone_from(&baseline);
            }
            for key in &update.clear {
                bag.remove(key);
            }
            bag.extend(update.set.iter().map(|(k, v)| (k.clone(), v.clone())));
        });
    }

    fn with_bag(&self, target: ScopeTarget<'_>, f: impl FnOnce(&mut VarMap)) {
        match target {
            ScopeTarget::Global => f(&mut *self.global.lock()),
            ScopeTarget::Session(id) => f(&mut *self.session_bag(id).lock()),
        }
    }

    fn session_bag(&self, id: &str) -> Arc<Mutex<VarMap>> {
        if let Some(bag) = self.sessions.read().get(id) {
            return Arc::clone(bag);
        }
        let mut sessions = self.sessions.write();
        let bag = sessions.entry(id.to_string()).or_insert_with(|| {
            tracing::debug!(session = %id, "creating session variable scope");
            Arc::new(Mutex::new((*self.baseline).clone()))
        });
        Arc::clone(bag)
    }
}
