//! Top-level configuration store.
//!
//! Owns every instance, sync group and static address/route of one
//! configuration generation, plus the dispatch indexes the protocol
//! engine uses to route incoming traffic. Built sequentially by a single
//! loader, then treated as read-mostly.

use crate::address::{VirtualAddress, VirtualRoute};
use crate::builder::{InstanceBuilder, SyncGroupBuilder};
use crate::container::{DumpSink, OrderedContainer, TracingSink, destroy_optional};
use crate::error::{BuildError, Result};
use crate::index::{Descriptor, DescriptorIndex, RouterIndex, RouterKey};
use crate::instance::{Instance, InstanceId};
use crate::interface::{InterfaceResolver, SystemInterfaces};
use crate::settings::{InstanceDefaults, Settings};
use crate::sync_group::SyncGroup;
use crate::types::ROUTER_ID_SPACE;
use std::collections::HashMap;
use std::os::fd::RawFd;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a [`ConfigStore::destroy`] call released
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub static_addresses: usize,
    pub static_routes: usize,
    pub router_buckets: usize,
    pub descriptor_buckets: usize,
    pub instances: usize,
    /// Sublist elements released together with their instances
    pub instance_elements: usize,
    pub sync_groups: usize,
}

/// All VRRP objects of one configuration generation
pub struct ConfigStore {
    // Field order is drop order: leaf lists, indexes, then owners.
    static_addresses: Option<OrderedContainer<VirtualAddress>>,
    static_routes: Option<OrderedContainer<VirtualRoute>>,
    router_index: RouterIndex,
    descriptor_index: DescriptorIndex,
    instances: OrderedContainer<Instance>,
    sync_groups: OrderedContainer<SyncGroup>,
    instance_names: HashMap<String, InstanceId>,
    defaults: InstanceDefaults,
    resolver: Arc<dyn InterfaceResolver>,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("instances", &self.instances.len())
            .field("sync_groups", &self.sync_groups.len())
            .field("router_index", &self.router_index.len())
            .field("descriptor_index", &self.descriptor_index.len())
            .finish()
    }
}

impl ConfigStore {
    /// Create an empty store sized by `settings`.
    pub fn new(settings: &Settings, resolver: Arc<dyn InterfaceResolver>) -> Self {
        debug!(
            descriptor_buckets = settings.indexes.descriptor_buckets,
            "Creating VRRP configuration store"
        );

        Self {
            static_addresses: None,
            static_routes: None,
            router_index: RouterIndex::new("router_id", ROUTER_ID_SPACE),
            descriptor_index: DescriptorIndex::new(
                "descriptor",
                settings.indexes.descriptor_buckets,
            ),
            instances: OrderedContainer::new(),
            sync_groups: OrderedContainer::new(),
            instance_names: HashMap::new(),
            defaults: settings.instance_defaults.clone(),
            resolver,
        }
    }

    /// Store with default settings resolving interfaces against the kernel.
    pub fn with_system_interfaces() -> Self {
        Self::new(&Settings::default(), Arc::new(SystemInterfaces::new()))
    }

    // Build phase

    /// Declare a new instance; it becomes the current instance.
    pub fn create_instance(&mut self, name: &str) -> Result<InstanceBuilder<'_>> {
        if self.instance_names.contains_key(name) {
            return Err(BuildError::DuplicateInstance(name.to_string()));
        }

        let id = InstanceId(self.instances.len());
        self.instances.append(Instance::new(
            name,
            self.defaults.advert_interval,
            self.defaults.priority,
        ));
        self.instance_names.insert(name.to_string(), id);
        debug!(instance = name, %id, "Created VRRP instance");

        self.current_instance("vrrp_instance")
    }

    /// Builder for the most recently declared instance.
    ///
    /// Fails with [`BuildError::NoCurrentTarget`] naming `directive` when no
    /// instance exists yet.
    pub fn current_instance(&mut self, directive: &str) -> Result<InstanceBuilder<'_>> {
        let id = InstanceId(self.instances.len().saturating_sub(1));
        let instance = self
            .instances
            .tail_mut()
            .map_err(|_| BuildError::NoCurrentTarget {
                directive: directive.to_string(),
                scope: "vrrp_instance",
            })?;
        Ok(InstanceBuilder::new(id, instance, self.resolver.as_ref()))
    }

    /// Declare a new sync group; it becomes the current group.
    pub fn create_sync_group(&mut self, name: &str) -> Result<SyncGroupBuilder<'_>> {
        if self.find_sync_group(name).is_some() {
            return Err(BuildError::DuplicateSyncGroup(name.to_string()));
        }

        self.sync_groups.append(SyncGroup::new(name));
        debug!(group = name, "Created VRRP sync group");

        self.current_sync_group("vrrp_sync_group")
    }

    /// Builder for the most recently declared sync group.
    pub fn current_sync_group(&mut self, directive: &str) -> Result<SyncGroupBuilder<'_>> {
        let group = self
            .sync_groups
            .tail_mut()
            .map_err(|_| BuildError::NoCurrentTarget {
                directive: directive.to_string(),
                scope: "vrrp_sync_group",
            })?;
        Ok(SyncGroupBuilder::new(group))
    }

    /// Add an address applied regardless of VRRP state.
    pub fn add_static_address(&mut self, tokens: &[&str]) -> Result<()> {
        let addr =
            VirtualAddress::from_tokens("static_ipaddress", tokens, None, self.resolver.as_ref())?;
        self.static_addresses
            .get_or_insert_with(OrderedContainer::new)
            .append(addr);
        Ok(())
    }

    /// Add a route applied regardless of VRRP state.
    pub fn add_static_route(&mut self, tokens: &[&str]) -> Result<()> {
        let route = VirtualRoute::from_tokens("static_routes", tokens, self.resolver.as_ref())?;
        self.static_routes
            .get_or_insert_with(OrderedContainer::new)
            .append(route);
        Ok(())
    }

    /// Resolve every sync group's monitored names to instances.
    ///
    /// An instance may belong to at most one group. Linking again after
    /// new groups were added re-resolves every group.
    pub fn link_sync_groups(&mut self) -> Result<()> {
        let resolved = {
            let mut owner: HashMap<InstanceId, &str> = HashMap::new();
            let mut resolved = Vec::with_capacity(self.sync_groups.len());

            for group in &self.sync_groups {
                let mut members = Vec::with_capacity(group.monitored.len());
                for name in &group.monitored {
                    let id = *self.instance_names.get(name).ok_or_else(|| {
                        BuildError::UnknownInstance {
                            group: group.name.clone(),
                            instance: name.clone(),
                        }
                    })?;
                    if let Some(previous) = owner.insert(id, &group.name) {
                        return Err(BuildError::AlreadyGrouped {
                            group: group.name.clone(),
                            instance: name.clone(),
                            owner: previous.to_string(),
                        });
                    }
                    members.push(id);
                }
                resolved.push(members);
            }
            resolved
        };

        for (group, members) in self.sync_groups.iter_mut().zip(resolved) {
            debug!(group = %group.name, members = members.len(), "Linked sync group");
            group.members = members;
        }
        Ok(())
    }

    // Dispatch

    /// Register an instance under its router ID and bound interface.
    ///
    /// Re-registering after the router ID or interface changed moves the
    /// instance to its new key; an instance that lost its router ID is
    /// dropped from the index.
    pub fn register_router(&mut self, id: InstanceId) -> Result<RouterKey> {
        let instance = self.instance(id).ok_or_else(|| {
            BuildError::invalid("virtual_router_id", format!("no instance {}", id))
        })?;
        if !instance.has_router_id() {
            let err = BuildError::invalid(
                "virtual_router_id",
                format!("instance '{}' has no router ID", instance.name()),
            );
            self.router_index.remove(id);
            return Err(err);
        }

        let ifindex = instance.interface.as_ref().map_or(0, |ifp| ifp.index);
        let key = RouterKey::new(instance.router_id, ifindex);
        self.router_index.insert(key, id)?;
        Ok(key)
    }

    /// Register every instance that carries a router ID.
    ///
    /// Returns the number of instances indexed.
    pub fn register_routers(&mut self) -> usize {
        let ids: Vec<InstanceId> = self
            .instance_ids()
            .filter(|id| self.instances[id.0].has_router_id())
            .collect();

        let mut indexed = 0;
        for id in ids {
            match self.register_router(id) {
                Ok(_) => indexed += 1,
                Err(e) => warn!(instance = %id, error = %e, "Skipping router index entry"),
            }
        }
        indexed
    }

    /// Register an instance under the socket descriptor it receives on.
    ///
    /// A new descriptor replaces the previous one. Out-of-range descriptors
    /// are logged and reported, the index is left unchanged.
    pub fn register_descriptor(&mut self, id: InstanceId, fd: RawFd) -> Result<()> {
        if self.instance(id).is_none() {
            return Err(BuildError::invalid("descriptor", format!("no instance {}", id)));
        }
        self.descriptor_index.insert(Descriptor(fd), id).inspect_err(|e| {
            warn!(instance = %id, fd, error = %e, "Skipping descriptor index entry");
        })
    }

    /// Instances using `router_id` on interface `ifindex`.
    pub fn lookup_router(&self, router_id: u8, ifindex: u32) -> &[InstanceId] {
        self.router_index.lookup(&RouterKey::new(router_id, ifindex))
    }

    /// Instances receiving on descriptor `fd`.
    pub fn lookup_descriptor(&self, fd: RawFd) -> &[InstanceId] {
        self.descriptor_index.lookup(&Descriptor(fd))
    }

    pub fn router_index(&self) -> &RouterIndex {
        &self.router_index
    }

    pub fn descriptor_index(&self) -> &DescriptorIndex {
        &self.descriptor_index
    }

    // Accessors

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id.0)
    }

    /// Mutable access for the protocol engine (sequence counters, state).
    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.instances.get_mut(id.0)
    }

    pub fn find_instance(&self, name: &str) -> Option<InstanceId> {
        self.instance_names.get(name).copied()
    }

    pub fn find_sync_group(&self, name: &str) -> Option<&SyncGroup> {
        self.sync_groups.iter().find(|g| g.name == name)
    }

    pub fn instances(&self) -> &OrderedContainer<Instance> {
        &self.instances
    }

    pub fn instance_ids(&self) -> impl Iterator<Item = InstanceId> + use<> {
        (0..self.instances.len()).map(InstanceId)
    }

    pub fn sync_groups(&self) -> &OrderedContainer<SyncGroup> {
        &self.sync_groups
    }

    pub fn static_addresses(&self) -> Option<&OrderedContainer<VirtualAddress>> {
        self.static_addresses.as_ref()
    }

    pub fn static_routes(&self) -> Option<&OrderedContainer<VirtualRoute>> {
        self.static_routes.as_ref()
    }

    /// Whether nothing at all has been configured.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
            && self.sync_groups.is_empty()
            && self.static_addresses.as_ref().is_none_or(OrderedContainer::is_empty)
            && self.static_routes.as_ref().is_none_or(OrderedContainer::is_empty)
    }

    // Diagnostics

    /// Emit the configuration, one line per attribute, skipping empty sections.
    pub fn describe(&self, sink: &mut dyn DumpSink) {
        if let Some(list) = self.static_addresses.as_ref().filter(|l| !l.is_empty()) {
            sink.line("------< Static Addresses >------".to_string());
            list.describe_all(sink);
        }
        if let Some(list) = self.static_routes.as_ref().filter(|l| !l.is_empty()) {
            sink.line("------< Static Routes >------".to_string());
            list.describe_all(sink);
        }
        if !self.instances.is_empty() {
            sink.line("------< VRRP Topology >------".to_string());
            self.instances.describe_all(sink);
        }
        if !self.sync_groups.is_empty() {
            sink.line("------< VRRP Sync groups >------".to_string());
            self.sync_groups.describe_all(sink);
        }
    }

    /// Describe the configuration to the process log.
    pub fn dump(&self) {
        self.describe(&mut TracingSink);
    }

    /// Release everything the store owns.
    ///
    /// Leaf lists go first, then the indexes, then the owning containers,
    /// so no index still references an instance when it is released.
    pub fn destroy(self) -> TeardownReport {
        let ConfigStore {
            static_addresses,
            static_routes,
            router_index,
            descriptor_index,
            instances,
            sync_groups,
            ..
        } = self;

        let mut report = TeardownReport {
            static_addresses: destroy_optional(static_addresses),
            static_routes: destroy_optional(static_routes),
            router_buckets: router_index.destroy(),
            descriptor_buckets: descriptor_index.destroy(),
            ..Default::default()
        };

        let instance_list: Vec<Instance> = instances.into_iter().collect();
        report.instances = instance_list.len();
        report.instance_elements = instance_list.into_iter().map(Instance::destroy).sum();

        for group in sync_groups {
            group.destroy();
            report.sync_groups += 1;
        }

        info!(
            instances = report.instances,
            sync_groups = report.sync_groups,
            "Released VRRP configuration store"
        );
        report
    }
}
