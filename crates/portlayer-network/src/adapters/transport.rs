//! Endpoint transports that stay in process

use crate::domain::{ContainerId, ScopeId};
use crate::ports::outbound::{AttachRequest, EndpointTransport, TransportError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Transport that accepts every request and only counts them.
#[derive(Debug, Default)]
pub struct NoOpTransport {
    attach_count: AtomicUsize,
    detach_count: AtomicUsize,
}

impl NoOpTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn attach_count(&self) -> usize {
        self.attach_count.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn detach_count(&self) -> usize {
        self.detach_count.load(Ordering::SeqCst)
    }
}

impl EndpointTransport for NoOpTransport {
    fn attach(&self, _request: &AttachRequest) -> Result<(), TransportError> {
        self.attach_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn detach(&self, _request: &AttachRequest) -> Result<(), TransportError> {
        self.detach_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Transport that tracks which (container, scope) pairs are attached.
///
/// Failures can be injected per operation. Attaching a pair twice, or
/// detaching one that is not attached, is reported as a transport error.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    attached: Mutex<HashSet<(ContainerId, ScopeId)>>,
    fail_attach: AtomicBool,
    fail_detach: AtomicBool,
}

impl InMemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent attach fail (or succeed again)
    pub fn fail_attach(&self, fail: bool) {
        self.fail_attach.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent detach fail (or succeed again)
    pub fn fail_detach(&self, fail: bool) {
        self.fail_detach.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_attached(&self, container: &ContainerId, scope: &ScopeId) -> bool {
        self.attached
            .lock()
            .contains(&(container.clone(), *scope))
    }

    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.attached.lock().len()
    }
}

impl EndpointTransport for InMemoryTransport {
    fn attach(&self, request: &AttachRequest) -> Result<(), TransportError> {
        if self.fail_attach.load(Ordering::SeqCst) {
            return Err(TransportError::attach("injected failure"));
        }

        let key = (request.container_id.clone(), request.scope_id);
        if !self.attached.lock().insert(key) {
            return Err(TransportError::attach(format!(
                "{} already attached to {}",
                request.container_id, request.scope_id
            )));
        }
        Ok(())
    }

    fn detach(&self, request: &AttachRequest) -> Result<(), TransportError> {
        if self.fail_detach.load(Ordering::SeqCst) {
            return Err(TransportError::detach("injected failure"));
        }

        let key = (request.container_id.clone(), request.scope_id);
        if !self.attached.lock().remove(&key) {
            return Err(TransportError::detach(format!(
                "{} not attached to {}",
                request.container_id, request.scope_id
            )));
        }
        Ok(())
    }
}
