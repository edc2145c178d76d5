//! Registry of open handles and their lazily created sessions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use log::debug;
use parking_lot::{Mutex, RwLock};

use super::handle::SessionHandle;
use crate::cache::{DEFAULT_MINIMUM_SIZE, PatternCache};
use crate::error::SessionError;

/// Slot of an open handle; `None` until the first read, write or seek.
type Slot = Option<Arc<PatternCache>>;

/// Registry mapping open handles to their sessions.
///
/// Opening a handle only reserves a slot. The session behind it is created
/// on first access, and exactly once even when several threads race on a
/// fresh handle. Lookups of existing sessions only take the shared map lock;
/// the creation lock is held just for check-allocate-install.
#[derive(Debug)]
pub struct SessionRegistry {
    slots: RwLock<IndexMap<SessionHandle, Slot>>,

    /// Serializes session creation only.
    create_lock: Mutex<()>,

    next_handle: AtomicU64,

    /// Minimum exploded buffer size for new sessions.
    minimum_size: usize,
}

impl SessionRegistry {
    /// Create an empty registry whose sessions use `minimum_size` buffers.
    pub fn new(minimum_size: usize) -> Self {
        Self {
            slots: RwLock::new(IndexMap::new()),
            create_lock: Mutex::new(()),
            next_handle: AtomicU64::new(1),
            minimum_size,
        }
    }

    /// Reserve a slot for a newly opened handle.
    pub fn open(&self) -> SessionHandle {
        let handle = SessionHandle::from_raw(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.slots.write().insert(handle, None);
        debug!("registry: opened handle {}", handle);
        handle
    }

    /// Get the session for `handle` without creating it.
    pub fn get(&self, handle: SessionHandle) -> Result<Option<Arc<PatternCache>>, SessionError> {
        self.slots
            .read()
            .get(&handle)
            .cloned()
            .ok_or(SessionError::NotFound(handle))
    }

    /// Get the session for `handle`, creating it on first access.
    pub fn get_or_create(&self, handle: SessionHandle) -> Result<Arc<PatternCache>, SessionError> {
        if let Some(cache) = self.get(handle)? {
            return Ok(cache);
        }

        let _creating = self.create_lock.lock();
        if let Some(cache) = self.get(handle)? {
            return Ok(cache);
        }

        let cache = Arc::new(PatternCache::new(self.minimum_size));
        let mut slots = self.slots.write();
        let slot = slots
            .get_mut(&handle)
            .ok_or(SessionError::NotFound(handle))?;
        *slot = Some(Arc::clone(&cache));
        debug!("registry: created session for handle {}", handle);

        Ok(cache)
    }

    /// Close `handle`, releasing its session.
    ///
    /// Returns whether a session had been created for it.
    pub fn destroy(&self, handle: SessionHandle) -> Result<bool, SessionError> {
        let slot = self
            .slots
            .write()
            .shift_remove(&handle)
            .ok_or(SessionError::NotFound(handle))?;
        debug!(
            "registry: closed handle {} (session {})",
            handle,
            if slot.is_some() { "released" } else { "never created" }
        );
        Ok(slot.is_some())
    }

    /// Whether `handle` is open.
    pub fn contains(&self, handle: SessionHandle) -> bool {
        self.slots.read().contains_key(&handle)
    }

    /// Open handles, in the order they were opened.
    pub fn handles(&self) -> Vec<SessionHandle> {
        self.slots.read().keys().copied().collect()
    }

    /// Number of open handles.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Whether no handle is open.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Minimum buffer size given to new sessions.
    pub fn minimum_size(&self) -> usize {
        self.minimum_size
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MINIMUM_SIZE)
    }
}
