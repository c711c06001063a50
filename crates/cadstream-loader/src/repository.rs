//! Cache of consumed sectors.
//!
//! Entries are keyed by model token, sector id and file name. A request for
//! a key that is already loading joins the in-flight load instead of
//! starting another fetch. Every successful load takes one reference on its
//! entry; [`SectorRepository::dereference_sector`] gives it back. Only
//! unreferenced entries are evicted, oldest first, and only while the cached
//! bytes exceed the configured budget.

use std::cell::RefCell;
use std::rc::Rc;

use cadstream_core::{CancellationToken, ModelIdentifier};
use futures::future::{self, Either, FutureExt, LocalBoxFuture, Shared};
use indexmap::IndexMap;

use crate::error::LoadError;
use crate::loader::SectorLoader;
use crate::options::RepositoryOptions;
use crate::sector::{ConsumedSector, WantedSector};

type SharedLoad = Shared<LocalBoxFuture<'static, Result<ConsumedSector, LoadError>>>;

/// Source of consumed sectors for the scheduler.
pub trait SectorRepository {
    /// Load a sector, taking one reference on the cached result.
    ///
    /// Failures other than cancellation resolve to a discarded sector.
    fn load_sector<'a>(
        &'a self,
        sector: &'a WantedSector,
        cancel: Option<&'a CancellationToken>,
    ) -> LocalBoxFuture<'a, Result<ConsumedSector, LoadError>>;

    /// Give back one reference taken by [`SectorRepository::load_sector`].
    fn dereference_sector(&self, model: &ModelIdentifier, sector_id: u32);

    /// Forget every cached and in-flight entry.
    fn clear_cache(&self);

    /// Change the byte budget, evicting at once if it shrank.
    fn set_cache_size(&self, bytes: u64);
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    model: u64,
    sector_id: u32,
    file_name: String,
}

enum Slot {
    Pending(SharedLoad),
    Ready(ConsumedSector),
}

struct CacheEntry {
    slot: Slot,
    ref_count: u32,
    byte_size: u64,
    /// Identity of the load that created the entry.
    load_id: u64,
}

impl CacheEntry {
    fn is_ready(&self) -> bool {
        matches!(self.slot, Slot::Ready(_))
    }
}

struct CacheState {
    /// Insertion order is age: the front is the least recently used entry.
    entries: IndexMap<CacheKey, CacheEntry>,
    cached_bytes: u64,
    cache_size: u64,
    /// Never reset, so a load started before `clear_cache` cannot match a
    /// newer entry for the same key.
    next_load_id: u64,
}

impl CacheState {
    fn new(cache_size: u64) -> Self {
        Self {
            entries: IndexMap::new(),
            cached_bytes: 0,
            cache_size,
            next_load_id: 0,
        }
    }

    fn evict(&mut self) {
        while self.cached_bytes > self.cache_size {
            let victim = self
                .entries
                .values()
                .position(|entry| entry.ref_count == 0 && entry.is_ready());
            let Some((key, entry)) = victim.and_then(|index| self.entries.shift_remove_index(index)) else {
                break;
            };
            self.cached_bytes = self.cached_bytes.saturating_sub(entry.byte_size);
            log::debug!(
                "evicted {} of sector {} ({} bytes)",
                key.file_name,
                key.sector_id,
                entry.byte_size
            );
        }
    }

    /// Drop the in-flight entry of load `load_id`, if it is still there.
    fn remove_pending(&mut self, key: &CacheKey, load_id: u64) {
        let stale = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.load_id == load_id && !entry.is_ready());
        if stale {
            self.entries.shift_remove(key);
        }
    }
}

enum Lookup {
    Hit(ConsumedSector),
    Wait {
        load: SharedLoad,
        load_id: u64,
        started: bool,
    },
}

/// [`SectorRepository`] backed by a [`SectorLoader`] and a byte-budgeted
/// cache.
pub struct CachedSectorRepository {
    loader: Rc<dyn SectorLoader>,
    state: RefCell<CacheState>,
}

impl CachedSectorRepository {
    /// Create a repository loading through `loader`.
    pub fn new(loader: Rc<dyn SectorLoader>, options: RepositoryOptions) -> Self {
        Self {
            loader,
            state: RefCell::new(CacheState::new(options.cache_size_bytes)),
        }
    }

    /// Byte budget of the cache.
    pub fn cache_size(&self) -> u64 {
        self.state.borrow().cache_size
    }

    /// Bytes held by completed entries.
    pub fn cached_bytes(&self) -> u64 {
        self.state.borrow().cached_bytes
    }

    /// Number of entries, in flight or completed.
    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a completed result for the sector is cached.
    pub fn contains(&self, model: &ModelIdentifier, sector_id: u32) -> bool {
        self.state
            .borrow()
            .entries
            .iter()
            .any(|(key, entry)| key.model == model.token() && key.sector_id == sector_id && entry.is_ready())
    }

    /// Outstanding references on the sector, summed over its files.
    pub fn reference_count(&self, model: &ModelIdentifier, sector_id: u32) -> u32 {
        self.state
            .borrow()
            .entries
            .iter()
            .filter(|(key, _)| key.model == model.token() && key.sector_id == sector_id)
            .map(|(_, entry)| entry.ref_count)
            .sum()
    }

    async fn load(
        &self,
        sector: &WantedSector,
        cancel: Option<&CancellationToken>,
    ) -> Result<ConsumedSector, LoadError> {
        let Some(file_name) = sector.file_name() else {
            return Ok(ConsumedSector::empty(sector, sector.level_of_detail));
        };
        let key = CacheKey {
            model: sector.model.token(),
            sector_id: sector.sector_id(),
            file_name: file_name.to_string(),
        };

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(LoadError::Cancelled);
            }
            let (load, load_id, started) = match self.lookup_or_start(&key, sector, cancel) {
                Lookup::Hit(consumed) => return Ok(consumed),
                Lookup::Wait {
                    load,
                    load_id,
                    started,
                } => (load, load_id, started),
            };

            let result = match cancel {
                Some(token) => match future::select(load, token.cancelled()).await {
                    Either::Left((result, _)) => result,
                    Either::Right(_) => Err(LoadError::Cancelled),
                },
                None => load.await,
            };

            let own_cancel = cancel.is_some_and(CancellationToken::is_cancelled);
            if let Some(outcome) = self.settle(&key, load_id, started, own_cancel, sector, result) {
                return outcome;
            }
            // The shared load was cancelled by the requester that started it
        }
    }

    fn lookup_or_start(
        &self,
        key: &CacheKey,
        sector: &WantedSector,
        cancel: Option<&CancellationToken>,
    ) -> Lookup {
        let mut state = self.state.borrow_mut();

        if let Some(index) = state.entries.get_index_of(key) {
            let last = state.entries.len() - 1;
            state.entries.move_index(index, last);
            if let Some((_, entry)) = state.entries.get_index_mut(last) {
                match &entry.slot {
                    Slot::Ready(consumed) => {
                        let consumed = consumed.clone();
                        entry.ref_count += 1;
                        log::trace!("cache hit for sector {} ({})", key.sector_id, key.file_name);
                        return Lookup::Hit(consumed);
                    }
                    Slot::Pending(load) => {
                        return Lookup::Wait {
                            load: load.clone(),
                            load_id: entry.load_id,
                            started: false,
                        };
                    }
                }
            }
        }

        let loader = Rc::clone(&self.loader);
        let wanted = sector.clone();
        let token = cancel.cloned();
        let load = async move { loader.load_sector(&wanted, token.as_ref()).await }
            .boxed_local()
            .shared();
        let load_id = state.next_load_id;
        state.next_load_id += 1;
        state.entries.insert(
            key.clone(),
            CacheEntry {
                slot: Slot::Pending(load.clone()),
                ref_count: 0,
                byte_size: 0,
                load_id,
            },
        );
        Lookup::Wait {
            load,
            load_id,
            started: true,
        }
    }

    /// Record the outcome of a load. `None` asks the caller to retry.
    fn settle(
        &self,
        key: &CacheKey,
        load_id: u64,
        started: bool,
        own_cancel: bool,
        sector: &WantedSector,
        result: Result<ConsumedSector, LoadError>,
    ) -> Option<Result<ConsumedSector, LoadError>> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        match result {
            Ok(consumed) => {
                let entry = state
                    .entries
                    .get_mut(key)
                    .filter(|entry| entry.load_id == load_id);
                if let Some(entry) = entry {
                    if !entry.is_ready() {
                        let byte_size = consumed.byte_size();
                        entry.slot = Slot::Ready(consumed.clone());
                        entry.byte_size = byte_size;
                        state.cached_bytes += byte_size;
                    }
                    entry.ref_count += 1;
                    state.evict();
                }
                Some(Ok(consumed))
            }
            Err(err) if err.is_cancelled() => {
                if own_cancel {
                    if started {
                        state.remove_pending(key, load_id);
                    }
                    return Some(Err(LoadError::Cancelled));
                }
                state.remove_pending(key, load_id);
                None
            }
            Err(err) => {
                state.remove_pending(key, load_id);
                log::warn!(
                    "discarding sector {} of model {} after failed load: {err}",
                    sector.sector_id(),
                    sector.model
                );
                Some(Ok(ConsumedSector::discarded(sector)))
            }
        }
    }
}

impl SectorRepository for CachedSectorRepository {
    fn load_sector<'a>(
        &'a self,
        sector: &'a WantedSector,
        cancel: Option<&'a CancellationToken>,
    ) -> LocalBoxFuture<'a, Result<ConsumedSector, LoadError>> {
        self.load(sector, cancel).boxed_local()
    }

    fn dereference_sector(&self, model: &ModelIdentifier, sector_id: u32) {
        let mut state = self.state.borrow_mut();
        let mut found = false;
        for (_, entry) in state
            .entries
            .iter_mut()
            .filter(|(key, _)| key.model == model.token() && key.sector_id == sector_id)
        {
            entry.ref_count = entry.ref_count.saturating_sub(1);
            found = true;
        }
        if !found {
            log::debug!("dereferenced sector {sector_id} of {model}, which is not cached");
        }
        state.evict();
    }

    fn clear_cache(&self) {
        let mut state = self.state.borrow_mut();
        log::debug!("clearing {} cached sectors", state.entries.len());
        state.entries.clear();
        state.cached_bytes = 0;
    }

    fn set_cache_size(&self, bytes: u64) {
        let mut state = self.state.borrow_mut();
        state.cache_size = bytes;
        state.evict();
    }
}
