//! Bootstrap sequencer tests: discovery, default fan-out, profile-filled
//! defaults, auto-discovery, and the init-complete sentinel.

mod common;

use common::FakeSubsystem;
use confd::bootstrap::{BootstrapConfig, BootstrapEvent, BootstrapSequencer};
use confd::registry::{Registry, ResourceConfig};
use confd::store::MemoryStore;
use confd_core::{ConfigObject, Schema, Store};
use serde_json::json;
use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;

struct BootstrapHarness {
    sequencer: BootstrapSequencer,
    store: Arc<MemoryStore>,
    asicd: Arc<FakeSubsystem>,
    lldpd: Arc<FakeSubsystem>,
    sysd: Arc<FakeSubsystem>,
    bufferd: Arc<FakeSubsystem>,
}

fn port(if_index: i64) -> ConfigObject {
    let mut obj = ConfigObject::new("Port");
    obj.set("IfIndex", json!(if_index));
    obj.set("Speed", json!(10000));
    obj
}

fn bootstrap_harness(profile_file: Option<PathBuf>) -> BootstrapHarness {
    common::init_tracing();
    let asicd = FakeSubsystem::new("asicd");
    let lldpd = FakeSubsystem::new("lldpd");
    let sysd = FakeSubsystem::new("sysd");
    let bufferd = FakeSubsystem::new("bufferd");

    let registry = Registry::builder()
        .subsystem(asicd.clone())
        .subsystem(lldpd.clone())
        .subsystem(sysd.clone())
        .subsystem(bufferd.clone())
        .schema(
            Schema::new("Port")
                .key_field("IfIndex", json!(0))
                .field("Speed", json!(10000)),
        )
        .schema(
            Schema::new("LLDPIntf")
                .key_field("IfIndex", json!(0))
                .field("Enable", json!(true)),
        )
        .schema(
            Schema::new("SystemParam")
                .field("Hostname", json!(""))
                .field("MgmtIp", json!("")),
        )
        .schema(Schema::new("Buffer").key_field("QueueId", json!(0)))
        .schema(
            Schema::new("ComponentLogging")
                .key_field("Module", json!(""))
                .field("Level", json!("info")),
        )
        .resource(ResourceConfig {
            resource: "Port".into(),
            owner: "asicd".into(),
            auto_create: false,
            auto_discover: false,
            linked_objects: vec!["LLDPIntf".into()],
            link_field: Some("IfIndex".into()),
            uses_profile: false,
        })
        .resource(ResourceConfig {
            resource: "LLDPIntf".into(),
            owner: "lldpd".into(),
            auto_create: true,
            auto_discover: false,
            linked_objects: vec![],
            link_field: None,
            uses_profile: false,
        })
        .resource(ResourceConfig {
            resource: "SystemParam".into(),
            owner: "sysd".into(),
            auto_create: true,
            auto_discover: false,
            linked_objects: vec![],
            link_field: None,
            uses_profile: true,
        })
        .resource(ResourceConfig {
            resource: "Buffer".into(),
            owner: "bufferd".into(),
            auto_create: false,
            auto_discover: true,
            linked_objects: vec![],
            link_field: None,
            uses_profile: false,
        })
        .resource(ResourceConfig {
            resource: "ComponentLogging".into(),
            owner: "sysd".into(),
            auto_create: false,
            auto_discover: false,
            linked_objects: vec![],
            link_field: None,
            uses_profile: false,
        })
        .build()
        .unwrap();

    let store = Arc::new(MemoryStore::new());
    let config = BootstrapConfig {
        profile_file,
        ..BootstrapConfig::default()
    };
    let sequencer = BootstrapSequencer::new(Arc::new(registry), store.clone(), config);
    BootstrapHarness {
        sequencer,
        store,
        asicd,
        lldpd,
        sysd,
        bufferd,
    }
}

// ============================================================================
// Discovery and linked-default fan-out
// ============================================================================

#[tokio::test]
async fn test_discovery_persists_ports_with_identity() {
    let mut h = bootstrap_harness(None);
    h.asicd.prime_bulk((1..=4).map(port).collect());

    assert!(
        h.sequencer
            .handle_event(BootstrapEvent::SubsystemConnected("asicd".into()))
            .await
    );

    for if_index in 1..=4 {
        let key = format!("Port#{}", if_index);
        assert!(h.store.get("Port", &key).await.unwrap().is_some());
        assert!(h.store.id_for_key(&key).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn test_linked_defaults_fan_out_per_discovered_port() {
    let mut h = bootstrap_harness(None);
    h.asicd.prime_bulk((1..=4).map(port).collect());

    h.sequencer
        .handle_event(BootstrapEvent::SubsystemConnected("asicd".into()))
        .await;
    h.sequencer
        .handle_event(BootstrapEvent::SubsystemConnected("lldpd".into()))
        .await;

    // One LLDPIntf default per discovered port, each dispatched to lldpd
    // and each with its own identifier
    assert_eq!(h.lldpd.create_calls.load(Ordering::SeqCst), 4);
    let mut ids = HashSet::new();
    for if_index in 1..=4 {
        let key = format!("LLDPIntf#{}", if_index);
        let obj = h.store.get("LLDPIntf", &key).await.unwrap().unwrap();
        assert_eq!(obj.get("IfIndex"), Some(&json!(if_index)));
        assert_eq!(obj.get("Enable"), Some(&json!(true)));
        ids.insert(h.store.id_for_key(&key).await.unwrap().unwrap());
    }
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn test_rediscovery_leaves_existing_objects_alone() {
    let mut h = bootstrap_harness(None);
    h.asicd.prime_bulk(vec![port(1)]);

    h.sequencer
        .handle_event(BootstrapEvent::SubsystemConnected("asicd".into()))
        .await;
    let id = h.store.id_for_key("Port#1").await.unwrap().unwrap();

    h.sequencer
        .handle_event(BootstrapEvent::SubsystemConnected("asicd".into()))
        .await;
    assert_eq!(h.store.id_for_key("Port#1").await.unwrap(), Some(id));
}

// ============================================================================
// Profile-filled and pre-existing defaults
// ============================================================================

#[tokio::test]
async fn test_profile_fills_default_object() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"Hostname": "sw1", "MgmtIp": "10.0.0.1"}}"#).unwrap();
    let mut h = bootstrap_harness(Some(file.path().to_path_buf()));

    h.sequencer
        .handle_event(BootstrapEvent::SubsystemConnected("sysd".into()))
        .await;

    assert_eq!(h.sysd.create_calls.load(Ordering::SeqCst), 1);
    let obj = h.store.get("SystemParam", "SystemParam").await.unwrap().unwrap();
    assert_eq!(obj.get("Hostname"), Some(&json!("sw1")));
    assert_eq!(obj.get("MgmtIp"), Some(&json!("10.0.0.1")));
    assert!(h.store.id_for_key("SystemParam").await.unwrap().is_some());
}

#[tokio::test]
async fn test_existing_default_gets_identity_backfilled() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"Hostname": "sw1"}}"#).unwrap();
    let mut h = bootstrap_harness(Some(file.path().to_path_buf()));

    // Object survives from a previous run, but its identity was lost
    let mut existing = ConfigObject::new("SystemParam");
    existing.set("Hostname", json!("old-name"));
    existing.set("MgmtIp", json!(""));
    h.store.put("SystemParam", &existing).await.unwrap();

    h.sequencer
        .handle_event(BootstrapEvent::SubsystemConnected("sysd".into()))
        .await;

    // Not re-created, not overwritten, identity restored
    assert_eq!(h.sysd.create_calls.load(Ordering::SeqCst), 0);
    let obj = h.store.get("SystemParam", "SystemParam").await.unwrap().unwrap();
    assert_eq!(obj.get("Hostname"), Some(&json!("old-name")));
    assert!(h.store.id_for_key("SystemParam").await.unwrap().is_some());
}

// ============================================================================
// Auto-discovery and component logging
// ============================================================================

#[tokio::test]
async fn test_auto_discover_persists_reported_objects() {
    let mut h = bootstrap_harness(None);
    let mut queue = ConfigObject::new("Buffer");
    queue.set("QueueId", json!(7));
    h.bufferd.prime_bulk(vec![queue]);

    h.sequencer
        .handle_event(BootstrapEvent::SubsystemConnected("bufferd".into()))
        .await;

    assert!(h.store.get("Buffer", "Buffer#7").await.unwrap().is_some());
    assert!(h.store.id_for_key("Buffer#7").await.unwrap().is_some());
}

#[tokio::test]
async fn test_component_logging_created_per_subsystem() {
    let mut h = bootstrap_harness(None);

    h.sequencer
        .handle_event(BootstrapEvent::SubsystemConnected("bufferd".into()))
        .await;
    assert!(h
        .store
        .get("ComponentLogging", "ComponentLogging#bufferd")
        .await
        .unwrap()
        .is_some());

    // The local alias maps to the daemon's own module name
    h.sequencer
        .handle_event(BootstrapEvent::SubsystemConnected("local".into()))
        .await;
    assert!(h
        .store
        .get("ComponentLogging", "ComponentLogging#confd")
        .await
        .unwrap()
        .is_some());
}

// ============================================================================
// Sentinel handling
// ============================================================================

#[tokio::test]
async fn test_init_complete_ends_the_stream_permanently() {
    let h = bootstrap_harness(None);
    h.asicd.prime_bulk(vec![port(1)]);

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(BootstrapEvent::InitComplete).unwrap();
    // Arrives after the sentinel; must never be processed
    tx.send(BootstrapEvent::SubsystemConnected("asicd".into()))
        .unwrap();
    drop(tx);

    let store = h.store.clone();
    h.sequencer.run(rx).await;
    assert!(store.get("Port", "Port#1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_events_processed_in_arrival_order() {
    let h = bootstrap_harness(None);
    h.asicd.prime_bulk((1..=2).map(port).collect());

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(BootstrapEvent::SubsystemConnected("asicd".into()))
        .unwrap();
    tx.send(BootstrapEvent::SubsystemConnected("lldpd".into()))
        .unwrap();
    tx.send(BootstrapEvent::InitComplete).unwrap();
    drop(tx);

    let store = h.store.clone();
    let lldpd = h.lldpd.clone();
    h.sequencer.run(rx).await;

    // Discovery ran before the linked fan-out, so both ports had their
    // components recorded by the time lldpd came up
    assert_eq!(lldpd.create_calls.load(Ordering::SeqCst), 2);
    assert!(store.get("LLDPIntf", "LLDPIntf#1").await.unwrap().is_some());
    assert!(store.get("LLDPIntf", "LLDPIntf#2").await.unwrap().is_some());
}
