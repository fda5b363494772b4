//! Shared fixtures: a recording fake subsystem and a wired-up engine.

use confd_core::{BulkSlice, ConfigObject, DiffResult, PatchOp, Result, Schema, Subsystem};
use confd_core::ConfdError;
use confd::lifecycle::ObjectManager;
use confd::registry::{ActionConfig, Registry, ResourceConfig};
use confd::store::MemoryStore;
use confd::tracker::ConnectionTracker;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Fake backend subsystem that records every dispatched call and can be
/// primed with objects to report from bulk reads.
pub struct FakeSubsystem {
    name: String,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub action_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub reject_dispatch: AtomicBool,
    pub reject_validation: AtomicBool,
    pub fail_post_process: AtomicBool,
    pub last_diff: Mutex<Option<DiffResult>>,
    pub bulk_objects: Mutex<Vec<ConfigObject>>,
    /// Field stamped onto every state read, standing in for live
    /// operational data the store never sees
    pub state_overlay: Mutex<Option<(String, Value)>>,
}

impl FakeSubsystem {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            create_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            action_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            reject_dispatch: AtomicBool::new(false),
            reject_validation: AtomicBool::new(false),
            fail_post_process: AtomicBool::new(false),
            last_diff: Mutex::new(None),
            bulk_objects: Mutex::new(Vec::new()),
            state_overlay: Mutex::new(None),
        })
    }

    pub fn prime_bulk(&self, objects: Vec<ConfigObject>) {
        *self.bulk_objects.lock() = objects;
    }

    pub fn set_state_field(&self, name: impl Into<String>, value: Value) {
        *self.state_overlay.lock() = Some((name.into(), value));
    }

    fn check_dispatch(&self) -> Result<()> {
        if self.reject_dispatch.load(Ordering::SeqCst) {
            return Err(ConfdError::subsystem("dispatch rejected"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Subsystem for FakeSubsystem {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self, _obj: &ConfigObject) -> Result<()> {
        self.check_dispatch()?;
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update(
        &self,
        _before: &ConfigObject,
        _merged: &ConfigObject,
        diff: &DiffResult,
        _ops: &[PatchOp],
        _key: &str,
    ) -> Result<()> {
        self.check_dispatch()?;
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_diff.lock() = Some(diff.clone());
        Ok(())
    }

    async fn delete(&self, _obj: &ConfigObject, _key: &str) -> Result<()> {
        self.check_dispatch()?;
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, obj: &ConfigObject) -> Result<ConfigObject> {
        self.check_dispatch()?;
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = obj.clone();
        if let Some((name, value)) = self.state_overlay.lock().clone() {
            state.set(name, value);
        }
        Ok(state)
    }

    async fn bulk_get(&self, _template: &ConfigObject, start: i64, count: i64) -> Result<BulkSlice> {
        let objects = self.bulk_objects.lock();
        let total = objects.len() as i64;
        let begin = start.clamp(0, total);
        let end = (begin + count.max(0)).min(total);
        let page: Vec<ConfigObject> = objects[begin as usize..end as usize].to_vec();
        let returned = page.len() as i64;
        Ok(BulkSlice {
            objects: page,
            count: returned,
            next_marker: begin + returned,
            more_exists: begin + returned < total,
        })
    }

    async fn action(&self, _action: &str, _payload: &Value) -> Result<()> {
        self.check_dispatch()?;
        self.action_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn pre_validate(&self, _obj: &ConfigObject) -> Result<()> {
        if self.reject_validation.load(Ordering::SeqCst) {
            return Err(ConfdError::validation_failed("rejected by backend"));
        }
        Ok(())
    }

    async fn post_process(&self, _obj: &ConfigObject) -> Result<()> {
        if self.fail_post_process.load(Ordering::SeqCst) {
            return Err(ConfdError::subsystem("post-processing unavailable"));
        }
        Ok(())
    }
}

pub fn vlan_schema() -> Schema {
    Schema::new("Vlan")
        .key_field("VlanId", json!(0))
        .field("AdminState", json!("UP"))
        .field("Description", json!(""))
}

pub fn port_schema() -> Schema {
    Schema::new("Port")
        .key_field("IfIndex", json!(0))
        .field("Speed", json!(10000))
}

/// Fully wired engine around one fake subsystem named `asicd`, with the
/// `Vlan` and `Port` resources and a `PortFlap` action registered.
pub struct Harness {
    pub manager: ObjectManager,
    pub store: Arc<MemoryStore>,
    pub tracker: Arc<ConnectionTracker>,
    pub subsystem: Arc<FakeSubsystem>,
}

/// Best-effort tracing init so failing tests show engine logs under
/// `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn harness() -> Harness {
    init_tracing();
    let subsystem = FakeSubsystem::new("asicd");
    let registry = Registry::builder()
        .subsystem(subsystem.clone())
        .schema(vlan_schema())
        .schema(port_schema())
        .resource(ResourceConfig {
            resource: "Vlan".into(),
            owner: "asicd".into(),
            auto_create: false,
            auto_discover: false,
            linked_objects: vec![],
            link_field: None,
            uses_profile: false,
        })
        .resource(ResourceConfig {
            resource: "Port".into(),
            owner: "asicd".into(),
            auto_create: false,
            auto_discover: false,
            linked_objects: vec![],
            link_field: None,
            uses_profile: false,
        })
        .action(ActionConfig {
            action: "PortFlap".into(),
            owner: "asicd".into(),
        })
        .build()
        .unwrap();
    let registry = Arc::new(registry);

    let store = Arc::new(MemoryStore::new());
    let tracker = Arc::new(ConnectionTracker::new());
    tracker.register("asicd");
    tracker.mark_connected("asicd").unwrap();

    let manager = ObjectManager::new(registry, tracker.clone(), store.clone());
    Harness {
        manager,
        store,
        tracker,
        subsystem,
    }
}
