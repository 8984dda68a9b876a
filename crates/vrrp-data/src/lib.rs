//! VRRP configuration object model
//!
//! Builds, owns, indexes and tears down the VRRP instances and sync groups
//! the protocol engine runs on.
//!
//! # Components
//!
//! - **OrderedContainer**: append-only sequence with describe support
//! - **Instance** / **SyncGroup**: the configured routers and their groups
//! - **DispatchIndex**: router ID and socket descriptor to instance lookup
//! - **ConfigStore**: owner of one configuration generation
//! - **StoreHandle**: atomic swap between generations on reload
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vrrp_data::{ConfigStore, Settings, StaticInterfaces};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let interfaces = StaticInterfaces::new().with("eth0", 2);
//! let mut store = ConfigStore::new(&Settings::default(), Arc::new(interfaces));
//!
//! let mut vrrp = store.create_instance("VI_1")?;
//! vrrp.set_interface("eth0")?.set_router_id(51)?;
//! vrrp.add_virtual_ip(&["192.168.200.16/24"])?;
//! let id = vrrp.id();
//!
//! store.register_router(id)?;
//! assert_eq!(store.lookup_router(51, 2), &[id]);
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod builder;
pub mod container;
pub mod directive;
pub mod error;
pub mod index;
pub mod instance;
pub mod interface;
pub mod reload;
pub mod settings;
pub mod store;
pub mod sync_group;
pub mod types;

pub use address::{Scope, TrackedInterface, VirtualAddress, VirtualRoute};
pub use builder::{InstanceBuilder, SyncGroupBuilder};
pub use container::{Describe, DumpSink, EmptyContainer, OrderedContainer, TracingSink};
pub use directive::Section;
pub use error::BuildError;
pub use index::{Descriptor, DescriptorIndex, DispatchIndex, DispatchKey, RouterIndex, RouterKey};
pub use instance::{Authentication, Instance, InstanceId};
pub use interface::{Interface, InterfaceRef, InterfaceResolver, StaticInterfaces, SystemInterfaces};
pub use reload::StoreHandle;
pub use settings::Settings;
pub use store::{ConfigStore, TeardownReport};
pub use sync_group::SyncGroup;
pub use types::{AuthType, ScriptKind, SequenceCounter, TransitionScripts, VRRPState};
