// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Record-backed cache of live device handles.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::record::{Record, RecordId};
use crate::store::RecordStore;

/// Turns a persisted record into a connected handle.
///
/// Each protocol supplies one factory. Building a handle performs device
/// I/O (connect, authenticate) and may fail.
#[allow(async_fn_in_trait)]
pub trait HandleFactory {
    /// The record kind this factory consumes.
    type Record: Record;
    /// The live handle it produces.
    type Handle;

    /// Connects to the device described by `record`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be reached or refuses the
    /// stored credentials.
    async fn build(&self, record: Self::Record) -> Result<Self::Handle>;
}

/// One cache entry. `removed` is set when the record is deleted, so a
/// construction still in flight does not hand out its handle.
struct Slot<H> {
    cell: OnceCell<Arc<H>>,
    removed: AtomicBool,
}

impl<H> Slot<H> {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            removed: AtomicBool::new(false),
        }
    }

    fn initialized(&self) -> bool {
        self.cell.initialized()
    }
}

type SharedSlot<H> = Arc<Slot<H>>;

/// In-memory mapping from record id to live handle.
///
/// Handles are built lazily on first access and shared afterwards: every
/// caller asking for the same id receives the same `Arc`. Construction is
/// serialized per id, so concurrent first accesses to one device result in
/// a single connection while accesses to different devices proceed in
/// parallel.
///
/// The registry never evicts on its own. A handle lives until
/// [`remove`](Self::remove) deletes its record, or until
/// [`invalidate`](Self::invalidate) drops it so the next access reconnects.
///
/// The record store is passed into each call rather than held, so a
/// registry can outlive any single store connection.
pub struct DeviceRegistry<F: HandleFactory> {
    factory: F,
    handles: Mutex<HashMap<RecordId, SharedSlot<F::Handle>>>,
}

impl<F: HandleFactory> DeviceRegistry<F> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the factory used to build handles.
    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Returns the handle for `id`, building it from the stored record on
    /// first access.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no record has this id, or the error
    /// raised while connecting to the device.
    pub async fn get<S>(&self, store: &S, id: RecordId) -> Result<Arc<F::Handle>>
    where
        S: RecordStore<F::Record>,
    {
        self.resolve(id, || async {
            let record = store.get(id).await?;
            self.construct(record).await
        })
        .await
    }

    /// Returns the handle for the record called `name`.
    ///
    /// The name is resolved through the store first; an already cached
    /// handle for the resolved id is reused.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no record has this name, or the error
    /// raised while connecting to the device.
    pub async fn get_by_name<S>(&self, store: &S, name: &str) -> Result<Arc<F::Handle>>
    where
        S: RecordStore<F::Record>,
    {
        let record = store.get_by_name(name).await?;
        self.attach(record).await
    }

    /// Builds and caches a handle for a record that was just created.
    ///
    /// If a handle for the record's id is already cached it is returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns the error raised while connecting to the device.
    pub async fn add(&self, record: F::Record) -> Result<Arc<F::Handle>> {
        self.attach(record).await
    }

    /// Deletes the record for `id` and drops its cached handle.
    ///
    /// The cache is only touched once the store has confirmed the delete.
    /// A construction still in flight for `id` completes with a not-found
    /// error instead of returning its handle.
    ///
    /// # Errors
    ///
    /// Returns the store's error (typically not-found) and leaves the cache
    /// untouched.
    pub async fn remove<S>(&self, store: &S, id: RecordId) -> Result<()>
    where
        S: RecordStore<F::Record>,
    {
        store.delete(id).await?;
        let evicted = match self.handles.lock().remove(&id) {
            Some(slot) => {
                slot.removed.store(true, Ordering::Release);
                slot.initialized()
            }
            None => false,
        };
        tracing::info!(entity = <F::Record as Record>::ENTITY, %id, evicted, "Device removed");
        Ok(())
    }

    /// Drops the cached handle for `id` without touching its record.
    ///
    /// The next access reconnects. Returns true if a handle was cached. A
    /// construction still in flight is left alone, so its waiters and any
    /// later caller share the one connection it opens.
    pub fn invalidate(&self, id: RecordId) -> bool {
        let removed = match self.handles.lock().entry(id) {
            Entry::Occupied(entry) if entry.get().initialized() => {
                entry.remove();
                true
            }
            _ => false,
        };
        if removed {
            tracing::debug!(entity = <F::Record as Record>::ENTITY, %id, "Cached handle invalidated");
        }
        removed
    }

    /// Builds a handle for every stored record.
    ///
    /// Devices that cannot be reached are logged and skipped; they are
    /// retried lazily on next access. Returns the number of live handles
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot list its records.
    pub async fn load_all<S>(&self, store: &S) -> Result<usize>
    where
        S: RecordStore<F::Record>,
    {
        for record in store.get_all().await? {
            let id = record.id();
            let name = record.name().to_string();
            if let Err(e) = self.attach(record).await {
                tracing::warn!(
                    entity = <F::Record as Record>::ENTITY,
                    %id,
                    name = %name,
                    error = %e,
                    "Skipping device that failed to connect"
                );
            }
        }
        Ok(self.len())
    }

    /// Returns the number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles
            .lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Returns true if no handle is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the ids of every live handle.
    #[must_use]
    pub fn ids(&self) -> Vec<RecordId> {
        let mut ids: Vec<RecordId> = self
            .handles
            .lock()
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    async fn attach(&self, record: F::Record) -> Result<Arc<F::Handle>> {
        self.resolve(record.id(), || self.construct(record)).await
    }

    async fn resolve<Fut>(
        &self,
        id: RecordId,
        init: impl FnOnce() -> Fut,
    ) -> Result<Arc<F::Handle>>
    where
        Fut: Future<Output = Result<Arc<F::Handle>>>,
    {
        let slot = self.slot(id);
        match slot.cell.get_or_try_init(init).await {
            Ok(_) if slot.removed.load(Ordering::Acquire) => {
                Err(<F::Record as Record>::not_found("id", id.to_string()).into())
            }
            Ok(handle) => Ok(Arc::clone(handle)),
            Err(e) => {
                self.discard(id, &slot);
                Err(e)
            }
        }
    }

    // The map lock is only held to fetch the slot, never across I/O.
    fn slot(&self, id: RecordId) -> SharedSlot<F::Handle> {
        Arc::clone(
            self.handles
                .lock()
                .entry(id)
                .or_insert_with(|| Arc::new(Slot::new())),
        )
    }

    // Drops an empty slot after a failed lookup. Clones are only taken under
    // the map lock, so a count of two (map and caller) means no other caller
    // is waiting on it.
    fn discard(&self, id: RecordId, slot: &SharedSlot<F::Handle>) {
        if let Entry::Occupied(entry) = self.handles.lock().entry(id)
            && Arc::ptr_eq(entry.get(), slot)
            && !slot.initialized()
            && Arc::strong_count(slot) == 2
        {
            entry.remove();
        }
    }

    async fn construct(&self, record: F::Record) -> Result<Arc<F::Handle>> {
        let id = record.id();
        let name = record.name().to_string();
        let handle = self.factory.build(record).await?;
        tracing::info!(entity = <F::Record as Record>::ENTITY, %id, name = %name, "Device handle constructed");
        Ok(Arc::new(handle))
    }
}

impl<F: HandleFactory> std::fmt::Debug for DeviceRegistry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("entity", &<F::Record as Record>::ENTITY)
            .field("live", &self.len())
            .finish_non_exhaustive()
    }
}
