//! VRRP instance: the unit of failover.

use crate::address::{TrackedInterface, VirtualAddress, VirtualRoute};
use crate::container::{Describe, DumpSink, OrderedContainer, destroy_optional};
use crate::interface::InterfaceRef;
use crate::types::{
    AuthType, DEFAULT_ADVERT_INTERVAL, DEFAULT_PRIORITY, SequenceCounter, TransitionScripts,
    VRRPState,
};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

/// Position of an instance inside its store.
///
/// Dispatch indexes and sync groups refer to instances through this
/// handle; it never keeps an instance alive on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub(crate) usize);

impl InstanceId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Advertisement authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    pub auth_type: AuthType,
    pub data: Vec<u8>,
}

/// A VRRP router instance
#[derive(Debug, Clone)]
pub struct Instance {
    pub(crate) name: String,

    /// State requested by configuration
    pub wanted_state: VRRPState,

    /// State the protocol engine starts in
    pub init_state: VRRPState,

    /// Virtual Router ID; zero until configured
    pub router_id: u8,

    pub priority: u8,

    pub advert_interval: Duration,

    pub preempt: bool,

    pub auth: Option<Authentication>,

    /// Bound interface (shared, never owned)
    pub interface: Option<InterfaceRef>,

    /// Source address for advertisements
    pub mcast_src: Option<IpAddr>,

    /// Interface to run the LVS sync daemon on while MASTER
    pub lvs_sync_interface: Option<String>,

    /// Delay before repeating gratuitous ARPs after becoming MASTER
    pub garp_delay: Option<Duration>,

    pub scripts: TransitionScripts,

    pub smtp_alert: bool,

    pub(crate) counter: SequenceCounter,

    pub(crate) track_interfaces: Option<OrderedContainer<TrackedInterface>>,
    pub(crate) virtual_ips: Option<OrderedContainer<VirtualAddress>>,
    pub(crate) excluded_virtual_ips: Option<OrderedContainer<VirtualAddress>>,
    pub(crate) virtual_routes: Option<OrderedContainer<VirtualRoute>>,
}

impl Instance {
    pub(crate) fn new(name: &str, advert_interval: Duration, priority: u8) -> Self {
        Self {
            name: name.to_string(),
            wanted_state: VRRPState::Backup,
            init_state: VRRPState::Backup,
            router_id: 0,
            priority,
            advert_interval,
            preempt: false,
            auth: None,
            interface: None,
            mcast_src: None,
            lvs_sync_interface: None,
            garp_delay: None,
            scripts: TransitionScripts::default(),
            smtp_alert: false,
            counter: SequenceCounter::default(),
            track_interfaces: None,
            virtual_ips: None,
            excluded_virtual_ips: None,
            virtual_routes: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replay counter, mutated by the protocol engine only.
    pub fn sequence_counter(&self) -> &SequenceCounter {
        &self.counter
    }

    pub fn sequence_counter_mut(&mut self) -> &mut SequenceCounter {
        &mut self.counter
    }

    /// `None` until the first `track_interface` entry.
    pub fn track_interfaces(&self) -> Option<&OrderedContainer<TrackedInterface>> {
        self.track_interfaces.as_ref()
    }

    /// `None` until the first `virtual_ipaddress` entry.
    pub fn virtual_ips(&self) -> Option<&OrderedContainer<VirtualAddress>> {
        self.virtual_ips.as_ref()
    }

    /// `None` until the first `virtual_ipaddress_excluded` entry.
    pub fn excluded_virtual_ips(&self) -> Option<&OrderedContainer<VirtualAddress>> {
        self.excluded_virtual_ips.as_ref()
    }

    /// `None` until the first `virtual_routes` entry.
    pub fn virtual_routes(&self) -> Option<&OrderedContainer<VirtualRoute>> {
        self.virtual_routes.as_ref()
    }

    /// Whether the instance carries a usable router ID.
    pub fn has_router_id(&self) -> bool {
        self.router_id != 0
    }

    /// Release the instance and everything it owns.
    ///
    /// Returns the number of sublist elements released.
    pub(crate) fn destroy(self) -> usize {
        let Instance {
            name,
            track_interfaces,
            virtual_ips,
            excluded_virtual_ips,
            virtual_routes,
            ..
        } = self;

        let released = destroy_optional(track_interfaces)
            + destroy_optional(virtual_ips)
            + destroy_optional(excluded_virtual_ips)
            + destroy_optional(virtual_routes);
        debug!(instance = %name, elements = released, "Released VRRP instance");
        released
    }
}

/// Whole seconds as `Nsec`, anything finer as `Nms`.
fn format_interval(interval: Duration) -> String {
    if interval.subsec_nanos() == 0 {
        format!("{}sec", interval.as_secs())
    } else {
        format!("{}ms", interval.as_millis())
    }
}

fn describe_sublist<T: Describe>(
    sink: &mut dyn DumpSink,
    title: &str,
    list: Option<&OrderedContainer<T>>,
) {
    if let Some(list) = list.filter(|l| !l.is_empty()) {
        sink.line(format!("   {} = {}", title, list.len()));
        list.describe_all(sink);
    }
}

impl Describe for Instance {
    fn describe(&self, sink: &mut dyn DumpSink) {
        sink.line(format!(" VRRP Instance = {}", self.name));
        if self.init_state == VRRPState::Master {
            sink.line("   Want State = MASTER".to_string());
        } else {
            sink.line("   Want State = BACKUP".to_string());
        }
        match &self.interface {
            Some(ifp) => sink.line(format!("   Running on device = {}", ifp)),
            None => sink.line("   Running on device = (none)".to_string()),
        }
        if let Some(addr) = self.mcast_src {
            sink.line(format!("   Using mcast src_ip = {}", addr));
        }
        if let Some(ifname) = &self.lvs_sync_interface {
            sink.line(format!("   Running LVS sync daemon on interface = {}", ifname));
        }
        if let Some(delay) = self.garp_delay {
            sink.line(format!("   Gratuitous ARP delay = {}", delay.as_secs()));
        }
        sink.line(format!("   Virtual Router ID = {}", self.router_id));
        sink.line(format!("   Priority = {}", self.priority));
        sink.line(format!(
            "   Advert interval = {}",
            format_interval(self.advert_interval)
        ));
        if self.preempt {
            sink.line("   Preempt Active".to_string());
        }
        if let Some(auth) = &self.auth {
            sink.line(format!("   Authentication type = {}", auth.auth_type));
            sink.line(format!(
                "   Password = {}",
                String::from_utf8_lossy(&auth.data)
            ));
        }
        describe_sublist(sink, "Tracked interfaces", self.track_interfaces());
        describe_sublist(sink, "Virtual IP", self.virtual_ips());
        describe_sublist(sink, "Virtual IP Excluded", self.excluded_virtual_ips());
        describe_sublist(sink, "Virtual Routes", self.virtual_routes());
        self.scripts.describe_into(sink);
        if self.smtp_alert {
            sink.line("   Using smtp notification".to_string());
        }
    }
}
