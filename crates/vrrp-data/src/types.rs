//! VRRP data types shared by instances, sync groups and the dispatch indexes.

use std::fmt;
use std::time::Duration;

/// One base timer tick. Advertisement intervals default to a single tick.
pub const TIMER_HZ: Duration = Duration::from_secs(1);

/// Default advertisement interval
pub const DEFAULT_ADVERT_INTERVAL: Duration = TIMER_HZ;

/// Default priority for a backup router
pub const DEFAULT_PRIORITY: u8 = 100;

/// Number of distinct router IDs (the VRID is an 8-bit field)
pub const ROUTER_ID_SPACE: usize = 256;

/// Default number of descriptor buckets (descriptors 0..=1024)
pub const DEFAULT_DESCRIPTOR_BUCKETS: usize = 1024 + 1;

/// Simple-text passwords are carried in an 8 byte field
pub const AUTH_PASS_LEN: usize = 8;

/// VRRP state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VRRPState {
    /// Initial state - not yet initialized
    #[default]
    Init,
    /// Backup state - monitoring for master failures
    Backup,
    /// Master state - sending advertisements
    Master,
}

impl fmt::Display for VRRPState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VRRPState::Init => write!(f, "INIT"),
            VRRPState::Backup => write!(f, "BACKUP"),
            VRRPState::Master => write!(f, "MASTER"),
        }
    }
}

impl std::str::FromStr for VRRPState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INIT" => Ok(VRRPState::Init),
            "BACKUP" => Ok(VRRPState::Backup),
            "MASTER" => Ok(VRRPState::Master),
            other => Err(format!("unknown state '{}'", other)),
        }
    }
}

/// Authentication scheme for advertisements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    /// Simple text password
    Pass,
    /// IPSEC Authentication Header
    Ah,
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthType::Pass => write!(f, "SIMPLE_PASSWORD"),
            AuthType::Ah => write!(f, "IPSEC_AH"),
        }
    }
}

impl std::str::FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASS" => Ok(AuthType::Pass),
            "AH" => Ok(AuthType::Ah),
            other => Err(format!("unknown auth type '{}'", other)),
        }
    }
}

/// Replay-protection counter used in authenticated (AH) mode.
///
/// Owned by its instance and only ever advanced by the protocol engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceCounter {
    /// Whether the peer's sequence number has been seen yet
    pub cycle: bool,

    /// Last sequence number sent or accepted
    pub seq_number: u32,
}

impl SequenceCounter {
    /// Advance and return the next outgoing sequence number.
    pub fn advance(&mut self) -> u32 {
        self.seq_number = self.seq_number.wrapping_add(1);
        if self.seq_number == 0 {
            self.cycle = true;
        }
        self.seq_number
    }

    /// Check an incoming sequence number and remember it when it moves forward.
    pub fn accept(&mut self, seq: u32) -> bool {
        if self.cycle && seq <= self.seq_number {
            return false;
        }
        self.cycle = true;
        self.seq_number = seq;
        true
    }
}

/// Which transition a script is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Backup,
    Master,
    Fault,
    Generic,
}

/// Scripts run on state transitions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionScripts {
    pub backup: Option<String>,
    pub master: Option<String>,
    pub fault: Option<String>,
    /// Generic script, called with the new state as argument
    pub generic: Option<String>,
}

impl TransitionScripts {
    /// Attach `path` to a transition, replacing any previous script.
    pub fn set(&mut self, kind: ScriptKind, path: &str) {
        let slot = match kind {
            ScriptKind::Backup => &mut self.backup,
            ScriptKind::Master => &mut self.master,
            ScriptKind::Fault => &mut self.fault,
            ScriptKind::Generic => &mut self.generic,
        };
        *slot = Some(path.to_string());
    }

    pub(crate) fn describe_into(&self, sink: &mut dyn crate::container::DumpSink) {
        if let Some(script) = &self.backup {
            sink.line(format!("   Backup state transition script = {}", script));
        }
        if let Some(script) = &self.master {
            sink.line(format!("   Master state transition script = {}", script));
        }
        if let Some(script) = &self.fault {
            sink.line(format!("   Fault state transition script = {}", script));
        }
        if let Some(script) = &self.generic {
            sink.line(format!("   Generic state transition script = '{}'", script));
        }
    }
}
