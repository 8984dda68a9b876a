//! Builders for the instance or sync group currently being configured.
//!
//! [`crate::ConfigStore::create_instance`] and
//! [`crate::ConfigStore::create_sync_group`] hand these out; every
//! instance- or group-scoped directive goes through them.

use crate::address::{TrackedInterface, VirtualAddress, VirtualRoute};
use crate::container::OrderedContainer;
use crate::error::{BuildError, Result};
use crate::instance::{Authentication, Instance, InstanceId};
use crate::interface::InterfaceResolver;
use crate::sync_group::SyncGroup;
use crate::types::{AUTH_PASS_LEN, AuthType, ScriptKind, VRRPState};
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

/// Mutable view of the instance being built
pub struct InstanceBuilder<'a> {
    id: InstanceId,
    instance: &'a mut Instance,
    resolver: &'a dyn InterfaceResolver,
}

impl std::fmt::Debug for InstanceBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceBuilder")
            .field("id", &self.id)
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

impl<'a> InstanceBuilder<'a> {
    pub(crate) fn new(
        id: InstanceId,
        instance: &'a mut Instance,
        resolver: &'a dyn InterfaceResolver,
    ) -> Self {
        Self {
            id,
            instance,
            resolver,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn instance(&self) -> &Instance {
        self.instance
    }

    /// Requested start state; sets both the wanted and initial state.
    pub fn set_state(&mut self, state: VRRPState) -> &mut Self {
        self.instance.wanted_state = state;
        self.instance.init_state = state;
        self
    }

    /// Bind the instance to a network interface.
    pub fn set_interface(&mut self, name: &str) -> Result<&mut Self> {
        let ifp = self
            .resolver
            .resolve(name)
            .ok_or_else(|| BuildError::UnknownInterface(name.to_string()))?;
        self.instance.interface = Some(ifp);
        Ok(self)
    }

    pub fn set_router_id(&mut self, router_id: u8) -> Result<&mut Self> {
        if router_id == 0 {
            return Err(BuildError::invalid(
                "virtual_router_id",
                "must be between 1 and 255",
            ));
        }
        self.instance.router_id = router_id;
        Ok(self)
    }

    pub fn set_priority(&mut self, priority: u8) -> Result<&mut Self> {
        if priority == 0 {
            return Err(BuildError::invalid("priority", "must be between 1 and 255"));
        }
        self.instance.priority = priority;
        Ok(self)
    }

    pub fn set_advert_interval(&mut self, interval: Duration) -> Result<&mut Self> {
        if interval.is_zero() {
            return Err(BuildError::invalid("advert_int", "must be non-zero"));
        }
        self.instance.advert_interval = interval;
        Ok(self)
    }

    pub fn set_preempt(&mut self, preempt: bool) -> &mut Self {
        self.instance.preempt = preempt;
        self
    }

    /// Select the authentication scheme, keeping any password already set.
    pub fn set_auth_type(&mut self, auth_type: AuthType) -> &mut Self {
        match &mut self.instance.auth {
            Some(auth) => auth.auth_type = auth_type,
            None => {
                self.instance.auth = Some(Authentication {
                    auth_type,
                    data: Vec::new(),
                })
            }
        }
        self
    }

    /// Set the password, truncated to the 8 byte authentication field.
    pub fn set_auth_pass(&mut self, pass: &str) -> &mut Self {
        let data = pass.as_bytes()[..pass.len().min(AUTH_PASS_LEN)].to_vec();
        match &mut self.instance.auth {
            Some(auth) => auth.data = data,
            None => {
                self.instance.auth = Some(Authentication {
                    auth_type: AuthType::Pass,
                    data,
                })
            }
        }
        self
    }

    pub fn set_mcast_src(&mut self, addr: IpAddr) -> &mut Self {
        self.instance.mcast_src = Some(addr);
        self
    }

    pub fn set_lvs_sync_interface(&mut self, name: &str) -> &mut Self {
        self.instance.lvs_sync_interface = Some(name.to_string());
        self
    }

    pub fn set_garp_delay(&mut self, delay: Duration) -> &mut Self {
        self.instance.garp_delay = Some(delay);
        self
    }

    pub fn set_script(&mut self, kind: ScriptKind, path: &str) -> &mut Self {
        self.instance.scripts.set(kind, path);
        self
    }

    pub fn set_smtp_alert(&mut self, enabled: bool) -> &mut Self {
        self.instance.smtp_alert = enabled;
        self
    }

    /// Add a `track_interface` entry.
    pub fn add_tracked_interface(&mut self, tokens: &[&str]) -> Result<&mut Self> {
        let track = TrackedInterface::from_tokens("track_interface", tokens, self.resolver)?;
        self.instance
            .track_interfaces
            .get_or_insert_with(OrderedContainer::new)
            .append(track);
        debug!(instance = %self.instance.name(), "Added tracked interface");
        Ok(self)
    }

    /// Add a `virtual_ipaddress` entry.
    pub fn add_virtual_ip(&mut self, tokens: &[&str]) -> Result<&mut Self> {
        let vip = VirtualAddress::from_tokens(
            "virtual_ipaddress",
            tokens,
            self.instance.interface.as_ref(),
            self.resolver,
        )?;
        self.instance
            .virtual_ips
            .get_or_insert_with(OrderedContainer::new)
            .append(vip);
        debug!(instance = %self.instance.name(), "Added virtual IP");
        Ok(self)
    }

    /// Add a `virtual_ipaddress_excluded` entry.
    pub fn add_excluded_virtual_ip(&mut self, tokens: &[&str]) -> Result<&mut Self> {
        let vip = VirtualAddress::from_tokens(
            "virtual_ipaddress_excluded",
            tokens,
            self.instance.interface.as_ref(),
            self.resolver,
        )?;
        self.instance
            .excluded_virtual_ips
            .get_or_insert_with(OrderedContainer::new)
            .append(vip);
        debug!(instance = %self.instance.name(), "Added excluded virtual IP");
        Ok(self)
    }

    /// Add a `virtual_routes` entry.
    pub fn add_virtual_route(&mut self, tokens: &[&str]) -> Result<&mut Self> {
        let route = VirtualRoute::from_tokens("virtual_routes", tokens, self.resolver)?;
        self.instance
            .virtual_routes
            .get_or_insert_with(OrderedContainer::new)
            .append(route);
        debug!(instance = %self.instance.name(), "Added virtual route");
        Ok(self)
    }
}

/// Mutable view of the sync group being built
pub struct SyncGroupBuilder<'a> {
    group: &'a mut SyncGroup,
}

impl<'a> SyncGroupBuilder<'a> {
    pub(crate) fn new(group: &'a mut SyncGroup) -> Self {
        Self { group }
    }

    pub fn group(&self) -> &SyncGroup {
        self.group
    }

    /// Monitor an instance by name. Names are resolved when the store is
    /// linked.
    pub fn add_monitored(&mut self, name: &str) -> Result<&mut Self> {
        if self.group.monitored.iter().any(|n| n == name) {
            return Err(BuildError::invalid(
                "group",
                format!("instance '{}' listed twice", name),
            ));
        }
        self.group.monitored.push(name.to_string());
        Ok(self)
    }

    pub fn set_script(&mut self, kind: ScriptKind, path: &str) -> &mut Self {
        self.group.scripts.set(kind, path);
        self
    }

    pub fn set_smtp_alert(&mut self, enabled: bool) -> &mut Self {
        self.group.smtp_alert = enabled;
        self
    }
}
