//! Integration tests for portlayer-network
//!
//! Drive the crate only through `NetworkApi`, the way a host's
//! network-management layer would.

use portlayer_network::{
    AttachRequest, ContainerId, EndpointTransport, InMemoryTransport, NetworkApi, NetworkConfig,
    NetworkContext, NetworkError, NetworkResult, NoOpTransport, ResourceKind, ScopeId, ScopeType,
    TransportError,
};
use std::collections::BTreeSet;
use std::sync::{mpsc, Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

fn make_context() -> (Arc<NetworkContext>, Arc<InMemoryTransport>) {
    let transport = Arc::new(InMemoryTransport::new());
    let context = NetworkContext::new(NetworkConfig::default(), transport.clone()).unwrap();
    (Arc::new(context), transport)
}

/// Parks attaches for one container until the test releases them
struct GatedTransport {
    inner: InMemoryTransport,
    gated: ContainerId,
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl EndpointTransport for GatedTransport {
    fn attach(&self, request: &AttachRequest) -> Result<(), TransportError> {
        if request.container_id == self.gated {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
        }
        self.inner.attach(request)
    }

    fn detach(&self, request: &AttachRequest) -> Result<(), TransportError> {
        self.inner.detach(request)
    }
}

/// Lowest slot > 0 not reported in use
fn next_free_slot(context: &NetworkContext, id: &ContainerId) -> i32 {
    let used = context.slots_in_use(id).unwrap();
    (1..).find(|s| !used.contains(s)).unwrap()
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_container_lifecycle_walkthrough() {
    let (context, transport) = make_context();
    let scope_a = context.create_scope("a", ScopeType::Bridge).unwrap().id();
    let scope_b = context.create_scope("b", ScopeType::External).unwrap().id();
    let id = ContainerId::new("c1");
    let container = context.register_container(id.clone()).unwrap();

    // No endpoint yet
    assert!(matches!(
        context.bind(&id, &scope_a),
        Err(NetworkError::ResourceNotFound {
            kind: ResourceKind::Endpoint,
            ..
        })
    ));

    let e1 = context.add_endpoint(&id, &scope_a, 0).unwrap();
    assert!(context.slots_in_use(&id).unwrap().is_empty());

    context.assign_pci_slot(&id, &scope_a, 7).unwrap();
    context.add_endpoint(&id, &scope_b, 9).unwrap();
    assert_eq!(context.slots_in_use(&id).unwrap(), BTreeSet::from([7, 9]));
    assert_eq!(e1.pci_slot(), 7);

    context.bind(&id, &scope_a).unwrap();
    assert!(context.bind(&id, &scope_a).unwrap_err().is_invalid_state());
    assert!(e1.is_bound());
    assert!(transport.is_attached(&id, &scope_a));

    assert_eq!(container.scopes(), vec![scope_a, scope_b]);
    assert!(Arc::ptr_eq(&container.endpoint(&scope_a).unwrap(), &e1));

    context.unbind(&id, &scope_a).unwrap();
    context.remove_endpoint(&id, &scope_a).unwrap();
    context.remove_endpoint(&id, &scope_b).unwrap();
    context.deregister_container(&id).unwrap();
    assert!(context.containers().is_empty());
}

#[test]
fn test_caller_side_slot_allocation() {
    let (context, _) = make_context();
    let id = ContainerId::new("c1");
    context.register_container(id.clone()).unwrap();

    for i in 0..4 {
        let scope = context.create_scope(&format!("s{i}"), ScopeType::Bridge).unwrap().id();
        let slot = next_free_slot(&context, &id);
        context.add_endpoint(&id, &scope, slot).unwrap();
    }

    assert_eq!(context.slots_in_use(&id).unwrap(), BTreeSet::from([1, 2, 3, 4]));
}

#[test]
fn test_scopes_are_shared_across_containers() {
    let transport = Arc::new(NoOpTransport::new());
    let context = NetworkContext::new(NetworkConfig::default(), transport.clone()).unwrap();
    let bridge = context.create_scope("bridge", ScopeType::Bridge).unwrap();

    for name in ["c1", "c2", "c3"] {
        let id = ContainerId::new(name);
        context.register_container(id.clone()).unwrap();
        context.add_endpoint(&id, &bridge.id(), 1).unwrap();
        context.bind(&id, &bridge.id()).unwrap();
    }

    assert_eq!(transport.attach_count(), 3);
    for container in context.containers() {
        assert_eq!(container.scopes(), vec![bridge.id()]);
    }
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_containers_bind_in_parallel() {
    const CONTAINERS: usize = 16;

    let (context, transport) = make_context();
    let scope = context.create_scope("bridge", ScopeType::Bridge).unwrap().id();
    let ids: Vec<_> = (0..CONTAINERS)
        .map(|i| {
            let id = ContainerId::new(format!("c{i}"));
            context.register_container(id.clone()).unwrap();
            context.add_endpoint(&id, &scope, 0).unwrap();
            id
        })
        .collect();
    let barrier = Arc::new(Barrier::new(CONTAINERS));

    let handles: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let context = Arc::clone(&context);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                context.bind(&id, &scope).unwrap();
                context.unbind(&id, &scope).unwrap();
                context.bind(&id, &scope)
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    assert_eq!(transport.attached_count(), CONTAINERS);
}

#[test]
fn test_concurrent_add_same_scope_yields_one_endpoint() {
    const THREADS: usize = 8;

    let (context, _) = make_context();
    let scope = context.create_scope("bridge", ScopeType::Bridge).unwrap().id();
    let id = ContainerId::new("c1");
    let container = context.register_container(id.clone()).unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let context = Arc::clone(&context);
            let barrier = Arc::clone(&barrier);
            let id = id.clone();
            thread::spawn(move || {
                barrier.wait();
                context.add_endpoint(&id, &scope, i as i32 + 1)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(container.scopes(), vec![scope]);
    assert_eq!(container.endpoints().len(), 1);
}

#[test]
fn test_concurrent_slot_claims_never_collide() {
    const THREADS: usize = 8;

    let (context, _) = make_context();
    let id = ContainerId::new("c1");
    context.register_container(id.clone()).unwrap();
    let scopes: Vec<_> = (0..THREADS)
        .map(|i| context.create_scope(&format!("s{i}"), ScopeType::Bridge).unwrap().id())
        .collect();
    let barrier = Arc::new(Barrier::new(THREADS));

    // Everyone asks for slot 3; exactly one wins
    let handles: Vec<_> = scopes
        .iter()
        .copied()
        .map(|scope| {
            let context = Arc::clone(&context);
            let barrier = Arc::clone(&barrier);
            let id = id.clone();
            thread::spawn(move || {
                barrier.wait();
                context.add_endpoint(&id, &scope, 3)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, NetworkError::SlotInUse { slot: 3 })));
    assert_eq!(context.slots_in_use(&id).unwrap(), BTreeSet::from([3]));
}

#[test]
fn test_deregister_races_bind() {
    let (context, _) = make_context();
    let scope = context.create_scope("bridge", ScopeType::Bridge).unwrap().id();
    let id = ContainerId::new("c1");
    context.register_container(id.clone()).unwrap();
    context.add_endpoint(&id, &scope, 0).unwrap();
    let barrier = Arc::new(Barrier::new(2));

    let binder = {
        let context = Arc::clone(&context);
        let barrier = Arc::clone(&barrier);
        let id = id.clone();
        thread::spawn(move || {
            barrier.wait();
            context.bind(&id, &scope)
        })
    };
    barrier.wait();
    let deregistered = context.deregister_container(&id);
    let bound = binder.join().unwrap();

    // Either the bind won and deregistration was refused, or the container
    // was gone before the bind looked it up. Never both succeed.
    match (bound, deregistered) {
        (Ok(()), Err(e)) => assert!(e.is_invalid_state()),
        (Err(e), Ok(container)) => {
            assert!(e.is_not_found());
            assert!(!container.has_bound_endpoints());
        }
        (bound, deregistered) => panic!("unexpected outcome: {bound:?} / {deregistered:?}"),
    }
}

/// Full membership and bind cycle on containers other than the parked one
fn exercise_other_containers(
    context: &NetworkContext,
    fast: &ContainerId,
    scope: &ScopeId,
) -> NetworkResult<()> {
    let other = ContainerId::new("other");
    context.register_container(other.clone())?;
    context.add_endpoint(&other, scope, 1)?;
    context.assign_pci_slot(&other, scope, 2)?;
    context.remove_endpoint(&other, scope)?;
    context.deregister_container(&other)?;

    context.bind(fast, scope)?;
    context.slots_in_use(fast)?;
    context.containers();
    Ok(())
}

#[test]
fn test_slow_attach_stalls_only_its_container() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let slow = ContainerId::new("slow");
    let fast = ContainerId::new("fast");
    let transport = Arc::new(GatedTransport {
        inner: InMemoryTransport::new(),
        gated: slow.clone(),
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    });
    let context = NetworkContext::new(NetworkConfig::default(), transport.clone()).unwrap();
    let context = Arc::new(context);
    let scope = context.create_scope("bridge", ScopeType::Bridge).unwrap().id();
    context.register_container(slow.clone()).unwrap();
    context.register_container(fast.clone()).unwrap();
    let slow_endpoint = context.add_endpoint(&slow, &scope, 0).unwrap();
    context.add_endpoint(&fast, &scope, 0).unwrap();

    let binder = {
        let context = Arc::clone(&context);
        let slow = slow.clone();
        thread::spawn(move || context.bind(&slow, &scope))
    };
    entered_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("gated attach never started");

    let (done_tx, done_rx) = mpsc::channel();
    let worker = {
        let context = Arc::clone(&context);
        let fast = fast.clone();
        thread::spawn(move || {
            let outcome = exercise_other_containers(&context, &fast, &scope);
            done_tx.send((outcome, slow_endpoint.is_bound())).unwrap();
        })
    };
    let (outcome, slow_bound) = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("other containers stalled behind a parked attach");
    outcome.unwrap();
    assert!(!slow_bound);

    release_tx.send(()).unwrap();
    binder.join().unwrap().unwrap();
    worker.join().unwrap();
    assert!(transport.inner.is_attached(&slow, &scope));
    assert!(transport.inner.is_attached(&fast, &scope));
    assert!(context.container(&ContainerId::new("other")).is_none());
}
