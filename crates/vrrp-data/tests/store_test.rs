//! Configuration store integration tests
//!
//! Tests cover:
//! - Building instances and sync groups from directive lines
//! - Dispatch index registration and lookup
//! - Describe output and teardown accounting
//! - Generation swap on reload

use std::sync::Arc;
use std::time::Duration;
use vrrp_data::directive::{self, Section};
use vrrp_data::{
    BuildError, ConfigStore, Settings, StaticInterfaces, StoreHandle, TeardownReport, VRRPState,
};

fn interfaces() -> Arc<StaticInterfaces> {
    Arc::new(StaticInterfaces::new().with("eth0", 2).with("eth1", 3))
}

fn empty_store() -> ConfigStore {
    common::logging::try_init_test();
    ConfigStore::new(&Settings::default(), interfaces())
}

/// Feed a keepalived-style block through the directive layer.
fn load(store: &mut ConfigStore, lines: &[(Section, &str)]) -> Result<(), BuildError> {
    for (section, line) in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        directive::apply(store, *section, &tokens)?;
    }
    Ok(())
}

fn load_list(store: &mut ConfigStore, list: &str, lines: &[&str]) -> Result<(), BuildError> {
    for line in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        directive::apply_list_item(store, list, &tokens)?;
    }
    Ok(())
}

/// Three instances on two interfaces, one sync group.
fn populated_store() -> ConfigStore {
    let mut store = empty_store();

    for (name, iface, vrid) in [("VI_1", "eth0", 51), ("VI_2", "eth0", 52), ("VI_3", "eth1", 51)] {
        let declare = format!("vrrp_instance {}", name);
        let interface = format!("interface {}", iface);
        let router_id = format!("virtual_router_id {}", vrid);
        load(
            &mut store,
            &[
                (Section::Root, declare.as_str()),
                (Section::Instance, "state BACKUP"),
                (Section::Instance, interface.as_str()),
                (Section::Instance, router_id.as_str()),
                (Section::Instance, "priority 150"),
            ],
        )
        .unwrap();
        load_list(&mut store, "virtual_ipaddress", &["10.0.0.1/24", "10.0.0.2/24"]).unwrap();
    }

    load(&mut store, &[(Section::Root, "vrrp_sync_group G1")]).unwrap();
    load_list(&mut store, "group", &["VI_1 VI_2"]).unwrap();
    store.link_sync_groups().unwrap();
    store
}

#[test]
fn test_instance_names_are_unique() {
    let mut store = empty_store();
    store.create_instance("VI_1").unwrap();

    let err = store.create_instance("VI_1").unwrap_err();
    assert_eq!(err, BuildError::DuplicateInstance("VI_1".to_string()));
    assert_eq!(store.instances().len(), 1);
}

#[test]
fn test_empty_store_describes_nothing() {
    let store = empty_store();
    assert!(store.is_empty());

    let mut lines = Vec::new();
    store.describe(&mut lines);
    assert!(lines.is_empty());

    assert_eq!(store.destroy(), TeardownReport::default());
}

#[test]
fn test_sublists_created_on_first_element() {
    let mut store = empty_store();
    load(&mut store, &[(Section::Root, "vrrp_instance VI_1")]).unwrap();

    let id = store.find_instance("VI_1").unwrap();
    assert!(store.instance(id).unwrap().virtual_ips().is_none());
    assert!(store.instance(id).unwrap().virtual_routes().is_none());

    let addresses: Vec<String> = (1..=5).map(|n| format!("192.168.1.{}/24 dev eth0", n)).collect();
    let addresses: Vec<&str> = addresses.iter().map(String::as_str).collect();
    load_list(&mut store, "virtual_ipaddress", &addresses).unwrap();

    let vips = store.instance(id).unwrap().virtual_ips().unwrap();
    assert_eq!(vips.len(), 5);
    assert_eq!(vips.tail().unwrap().address.to_string(), "192.168.1.5/24");
    assert!(store.instance(id).unwrap().virtual_routes().is_none());
}

#[test]
fn test_directives_target_latest_instance() {
    let mut store = empty_store();
    load(
        &mut store,
        &[
            (Section::Root, "vrrp_instance A"),
            (Section::Instance, "priority 120"),
            (Section::Root, "vrrp_instance B"),
            (Section::Instance, "priority 90"),
            (Section::Instance, "advert_int 3"),
        ],
    )
    .unwrap();

    let a = store.instance(store.find_instance("A").unwrap()).unwrap();
    assert_eq!(a.priority, 120);
    assert_eq!(a.advert_interval, Duration::from_secs(1));

    let b = store.instance(store.find_instance("B").unwrap()).unwrap();
    assert_eq!(b.priority, 90);
    assert_eq!(b.advert_interval, Duration::from_secs(3));
}

#[test]
fn test_virtual_ips_follow_latest_instance() {
    let mut store = empty_store();
    load(&mut store, &[(Section::Root, "vrrp_instance A")]).unwrap();
    load_list(&mut store, "virtual_ipaddress", &["10.0.0.1", "10.0.0.2"]).unwrap();
    load(&mut store, &[(Section::Root, "vrrp_instance B")]).unwrap();
    load_list(&mut store, "virtual_ipaddress", &["10.0.1.1"]).unwrap();
    load_list(&mut store, "virtual_ipaddress", &["10.0.1.2"]).unwrap();

    let a = store.instance(store.find_instance("A").unwrap()).unwrap();
    assert_eq!(a.virtual_ips().unwrap().len(), 2);

    let b = store.instance(store.find_instance("B").unwrap()).unwrap();
    assert_eq!(b.virtual_ips().unwrap().len(), 2);
    assert_eq!(b.virtual_ips().unwrap()[0].address.to_string(), "10.0.1.1/32");
}

#[test]
fn test_directive_before_any_instance() {
    let mut store = empty_store();

    let err = load(&mut store, &[(Section::Instance, "priority 100")]).unwrap_err();
    assert!(matches!(err, BuildError::NoCurrentTarget { .. }));
    assert_eq!(err.directive(), Some("priority"));

    let err = load_list(&mut store, "group", &["VI_1"]).unwrap_err();
    assert!(matches!(
        err,
        BuildError::NoCurrentTarget {
            scope: "vrrp_sync_group",
            ..
        }
    ));
    assert!(store.is_empty());
}

#[test]
fn test_router_lookup() {
    let mut store = empty_store();
    load(
        &mut store,
        &[
            (Section::Root, "vrrp_instance vrrp1"),
            (Section::Instance, "interface eth0"),
            (Section::Instance, "virtual_router_id 51"),
        ],
    )
    .unwrap();

    assert_eq!(store.register_routers(), 1);
    let id = store.find_instance("vrrp1").unwrap();

    assert_eq!(store.lookup_router(51, 2), &[id]);
    assert!(store.lookup_router(52, 2).is_empty());
    assert!(store.lookup_router(51, 3).is_empty());
    assert_eq!(store.router_index().lookup_router_id(51), vec![id]);
}

#[test]
fn test_descriptor_out_of_range_leaves_index_unchanged() {
    let settings = Settings::from_yaml("indexes:\n  descriptor_buckets: 16\n").unwrap();
    let mut store = ConfigStore::new(&settings, interfaces());
    let id = store.create_instance("VI_1").unwrap().id();

    store.register_descriptor(id, 7).unwrap();
    assert_eq!(store.lookup_descriptor(7), &[id]);
    assert!(store.lookup_descriptor(8).is_empty());

    let err = store.register_descriptor(id, 16).unwrap_err();
    assert_eq!(
        err,
        BuildError::KeyOutOfRange {
            index: "descriptor",
            key: 16,
            bucket_count: 16,
        }
    );
    assert_eq!(store.descriptor_index().len(), 1);
    assert_eq!(store.descriptor_index().references(), 1);
}

#[test]
fn test_sync_group_links_members() {
    let store = populated_store();

    let group = store.find_sync_group("G1").unwrap();
    assert!(group.is_linked());
    assert_eq!(group.state, VRRPState::Init);
    assert_eq!(
        group.members(),
        &[
            store.find_instance("VI_1").unwrap(),
            store.find_instance("VI_2").unwrap(),
        ]
    );
}

#[test]
fn test_sync_group_rejects_unknown_and_shared_members() {
    let mut store = populated_store();
    load(&mut store, &[(Section::Root, "vrrp_sync_group G2")]).unwrap();
    load_list(&mut store, "group", &["VI_4"]).unwrap();

    let err = store.link_sync_groups().unwrap_err();
    assert_eq!(
        err,
        BuildError::UnknownInstance {
            group: "G2".to_string(),
            instance: "VI_4".to_string(),
        }
    );

    let mut store = populated_store();
    load(&mut store, &[(Section::Root, "vrrp_sync_group G2")]).unwrap();
    load_list(&mut store, "group", &["VI_2"]).unwrap();

    let err = store.link_sync_groups().unwrap_err();
    assert_eq!(
        err,
        BuildError::AlreadyGrouped {
            group: "G2".to_string(),
            instance: "VI_2".to_string(),
            owner: "G1".to_string(),
        }
    );
    assert_eq!(err.directive(), Some("group"));
}

#[test]
fn test_describe_full_store() {
    let mut store = populated_store();
    load_list(&mut store, "static_ipaddress", &["192.168.0.1/24 dev eth1"]).unwrap();

    let mut lines = Vec::new();
    store.describe(&mut lines);

    let banners: Vec<&str> = lines
        .iter()
        .map(String::as_str)
        .filter(|l| l.starts_with("------<"))
        .collect();
    assert_eq!(
        banners,
        vec![
            "------< Static Addresses >------",
            "------< VRRP Topology >------",
            "------< VRRP Sync groups >------",
        ]
    );

    let topology = lines.iter().position(|l| l == " VRRP Instance = VI_1").unwrap();
    let second = lines.iter().position(|l| l == " VRRP Instance = VI_2").unwrap();
    assert!(topology < second);
    assert!(lines.contains(&"   Virtual Router ID = 51".to_string()));
    assert!(lines.contains(&" VRRP Sync Group = G1, BACKUP".to_string()));

    // Same output through the log sink
    store.dump();
}

#[test]
fn test_destroy_releases_everything() {
    let mut store = populated_store();
    assert_eq!(store.register_routers(), 3);
    for (fd, id) in store.instance_ids().enumerate() {
        store.register_descriptor(id, fd as i32 + 10).unwrap();
    }

    let report = store.destroy();
    assert_eq!(
        report,
        TeardownReport {
            static_addresses: 0,
            static_routes: 0,
            router_buckets: 3,
            descriptor_buckets: 3,
            instances: 3,
            instance_elements: 6,
            sync_groups: 1,
        }
    );
}

#[test]
fn test_reload_swaps_generations() {
    let handle = StoreHandle::new(populated_store());
    let reader = handle.load();
    assert_eq!(reader.instances().len(), 3);

    let previous = handle.swap(empty_store());
    assert!(handle.load().is_empty());

    // Old generation stays valid while a reader holds it
    let previous = StoreHandle::retire(previous).unwrap_err();
    assert_eq!(reader.instances().len(), 3);
    drop(reader);

    let report = StoreHandle::retire(previous).unwrap();
    assert_eq!(report.instances, 3);
    assert_eq!(report.sync_groups, 1);
}
