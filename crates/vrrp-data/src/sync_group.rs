//! Sync groups: instances that change state together.

use crate::container::{Describe, DumpSink};
use crate::instance::InstanceId;
use crate::types::{TransitionScripts, VRRPState};
use tracing::debug;

/// Named set of instances forced to transition together
#[derive(Debug, Clone)]
pub struct SyncGroup {
    pub(crate) name: String,

    /// Monitored instance names, as configured
    pub(crate) monitored: Vec<String>,

    /// Resolved members, filled by the link step
    pub(crate) members: Vec<InstanceId>,

    pub state: VRRPState,

    pub scripts: TransitionScripts,

    pub smtp_alert: bool,
}

impl SyncGroup {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            monitored: Vec::new(),
            members: Vec::new(),
            state: VRRPState::Init,
            scripts: TransitionScripts::default(),
            smtp_alert: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn monitored(&self) -> &[String] {
        &self.monitored
    }

    /// Members resolved by [`crate::ConfigStore::link_sync_groups`].
    pub fn members(&self) -> &[InstanceId] {
        &self.members
    }

    pub fn is_linked(&self) -> bool {
        self.members.len() == self.monitored.len()
    }

    pub(crate) fn destroy(self) {
        debug!(
            group = %self.name,
            monitored = self.monitored.len(),
            "Released VRRP sync group"
        );
    }
}

impl Describe for SyncGroup {
    fn describe(&self, sink: &mut dyn DumpSink) {
        let state = if self.state == VRRPState::Master {
            "MASTER"
        } else {
            "BACKUP"
        };
        sink.line(format!(" VRRP Sync Group = {}, {}", self.name, state));
        for name in &self.monitored {
            sink.line(format!("   monitor = {}", name));
        }
        self.scripts.describe_into(sink);
        if self.smtp_alert {
            sink.line("   Using smtp notification".to_string());
        }
    }
}
