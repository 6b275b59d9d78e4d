//! The state container: variables, discrete parameters and stage-scoped caches.

use crate::error::{StateError, StateResult};
use crate::stage::Stage;
use crate::value::{StateValue, downcast_mut, downcast_ref};
use core::any::Any;
use core::sync::atomic::{AtomicUsize, Ordering};
use mb_core::{CacheId, DiscreteVarId, Id, Real};
use nalgebra::DVector;
use std::sync::OnceLock;

/// Offset of an auxiliary continuous block inside the state's z vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZIndex(pub usize);

#[derive(Clone, Copy, Debug)]
struct Block {
    len: usize,
    allocated_at: Stage,
}

/// One growable vector of continuous variables (q, u or z).
#[derive(Clone, Debug)]
struct ContinuousPool {
    values: DVector<Real>,
    blocks: Vec<Block>,
}

impl ContinuousPool {
    fn new() -> Self {
        Self {
            values: DVector::zeros(0),
            blocks: Vec::new(),
        }
    }

    fn allocate(&mut self, init: &[Real], at: Stage) -> usize {
        let start = self.values.len();
        let mut values = self.values.as_slice().to_vec();
        values.extend_from_slice(init);
        self.values = DVector::from_vec(values);
        self.blocks.push(Block {
            len: init.len(),
            allocated_at: at,
        });
        start
    }

    /// Drop blocks allocated while realizing `stage` or later.
    fn discard_from(&mut self, stage: Stage) -> bool {
        let keep = self
            .blocks
            .iter()
            .take_while(|b| b.allocated_at < stage)
            .count();
        if keep == self.blocks.len() {
            return false;
        }
        self.blocks.truncate(keep);
        let len: usize = self.blocks.iter().map(|b| b.len).sum();
        self.values = DVector::from_column_slice(&self.values.as_slice()[..len]);
        true
    }
}

#[derive(Debug)]
struct DiscreteVar {
    name: &'static str,
    invalidates: Stage,
    allocated_at: Stage,
    value: Box<dyn StateValue>,
}

#[derive(Debug)]
struct CacheEntry {
    name: &'static str,
    depends_on: Stage,
    allocated_at: Stage,
    value: OnceLock<Box<dyn StateValue>>,
    fills: AtomicUsize,
}

impl CacheEntry {
    fn store(&self, value: Box<dyn StateValue>) -> bool {
        let stored = self.value.set(value).is_ok();
        if stored {
            self.fills.fetch_add(1, Ordering::Relaxed);
        }
        stored
    }
}

/// A snapshot of everything that varies during a simulation.
///
/// Cache entries are filled lazily through `&State` (first writer wins, and
/// later readers see the stored value), so the read path stays shared while
/// the storage is populated at most once per snapshot. Anything that mutates
/// variables takes `&mut self` and invalidates the affected stages.
#[derive(Debug)]
pub struct State {
    stage: Stage,
    time: Real,
    q: ContinuousPool,
    u: ContinuousPool,
    z: ContinuousPool,
    zdot: DVector<Real>,
    discrete: Vec<DiscreteVar>,
    cache: Vec<CacheEntry>,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for State {
    fn clone(&self) -> Self {
        let cache = self
            .cache
            .iter()
            .map(|e| {
                let value = OnceLock::new();
                if let Some(v) = e.value.get() {
                    let _ = value.set((**v).clone_boxed());
                }
                CacheEntry {
                    name: e.name,
                    depends_on: e.depends_on,
                    allocated_at: e.allocated_at,
                    value,
                    fills: AtomicUsize::new(e.fills.load(Ordering::Relaxed)),
                }
            })
            .collect();
        let discrete = self
            .discrete
            .iter()
            .map(|d| DiscreteVar {
                name: d.name,
                invalidates: d.invalidates,
                allocated_at: d.allocated_at,
                value: (*d.value).clone_boxed(),
            })
            .collect();
        Self {
            stage: self.stage,
            time: self.time,
            q: self.q.clone(),
            u: self.u.clone(),
            z: self.z.clone(),
            zdot: self.zdot.clone(),
            discrete,
            cache,
        }
    }
}

impl State {
    pub fn new() -> Self {
        Self {
            stage: Stage::Empty,
            time: 0.0,
            q: ContinuousPool::new(),
            u: ContinuousPool::new(),
            z: ContinuousPool::new(),
            zdot: DVector::zeros(0),
            discrete: Vec::new(),
            cache: Vec::new(),
        }
    }

    // ---------------------------------------------------------------- stages

    /// Highest stage this state has been realized through.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Fail unless the state has been realized through `required`.
    pub fn require_stage(&self, required: Stage, what: &'static str) -> StateResult<()> {
        if self.stage >= required {
            Ok(())
        } else {
            Err(StateError::StageTooLow {
                what,
                required,
                current: self.stage,
            })
        }
    }

    /// Mark `stage` as realized. Stages must be realized in order.
    pub fn advance_to(&mut self, stage: Stage) -> StateResult<()> {
        if self.stage.next() != Some(stage) {
            return Err(StateError::StageOrder {
                from: self.stage,
                to: stage,
            });
        }
        self.stage = stage;
        Ok(())
    }

    /// Invalidate `stage` and everything after it.
    ///
    /// Cache entries depending on those stages are cleared, and resources
    /// allocated while realizing them are released so that the next
    /// realization allocates them afresh.
    pub fn invalidate_all(&mut self, stage: Stage) {
        if self.stage >= stage {
            self.stage = stage.prev().unwrap_or(Stage::Empty);
        }
        for entry in &mut self.cache {
            if entry.depends_on >= stage {
                entry.value.take();
            }
        }

        self.q.discard_from(stage);
        self.u.discard_from(stage);
        if self.z.discard_from(stage) {
            self.zdot = DVector::zeros(self.z.values.len());
        }
        let keep = self
            .discrete
            .iter()
            .take_while(|d| d.allocated_at < stage)
            .count();
        self.discrete.truncate(keep);
        let keep = self
            .cache
            .iter()
            .take_while(|e| e.allocated_at < stage)
            .count();
        self.cache.truncate(keep);
    }

    /// Stage whose realization is currently allowed to allocate resources.
    fn realizing(&self) -> Stage {
        self.stage.next().unwrap_or(Stage::Report)
    }

    // ------------------------------------------------------------------ time

    pub fn time(&self) -> Real {
        self.time
    }

    pub fn set_time(&mut self, t: Real) {
        self.invalidate_all(Stage::Time);
        self.time = t;
    }

    // ---------------------------------------------------- continuous variables

    /// Allocate a block of generalized coordinates; returns its first index.
    pub fn allocate_q(&mut self, init: &[Real]) -> usize {
        let at = self.realizing();
        self.q.allocate(init, at)
    }

    /// Allocate a block of generalized speeds; returns its first index.
    pub fn allocate_u(&mut self, init: &[Real]) -> usize {
        let at = self.realizing();
        self.u.allocate(init, at)
    }

    /// Allocate a block of auxiliary continuous variables.
    pub fn allocate_z(&mut self, init: &[Real]) -> ZIndex {
        let at = self.realizing();
        let start = self.z.allocate(init, at);
        self.zdot = DVector::zeros(self.z.values.len());
        tracing::debug!(start, len = init.len(), stage = %at, "allocated auxiliary state");
        ZIndex(start)
    }

    pub fn nq(&self) -> usize {
        self.q.values.len()
    }

    pub fn nu(&self) -> usize {
        self.u.values.len()
    }

    pub fn nz(&self) -> usize {
        self.z.values.len()
    }

    pub fn q(&self) -> &DVector<Real> {
        &self.q.values
    }

    pub fn u(&self) -> &DVector<Real> {
        &self.u.values
    }

    pub fn z(&self) -> &DVector<Real> {
        &self.z.values
    }

    /// Mutable coordinates; invalidates Position and later stages.
    pub fn q_mut(&mut self) -> &mut DVector<Real> {
        self.invalidate_all(Stage::Position);
        &mut self.q.values
    }

    /// Mutable speeds; invalidates Velocity and later stages.
    pub fn u_mut(&mut self) -> &mut DVector<Real> {
        self.invalidate_all(Stage::Velocity);
        &mut self.u.values
    }

    /// Mutable auxiliary variables; invalidates Dynamics and later stages.
    pub fn z_mut(&mut self) -> &mut DVector<Real> {
        self.invalidate_all(Stage::Dynamics);
        &mut self.z.values
    }

    pub fn set_q(&mut self, q: &[Real]) -> StateResult<()> {
        check_len("q", self.nq(), q.len())?;
        self.q_mut().copy_from_slice(q);
        Ok(())
    }

    pub fn set_u(&mut self, u: &[Real]) -> StateResult<()> {
        check_len("u", self.nu(), u.len())?;
        self.u_mut().copy_from_slice(u);
        Ok(())
    }

    /// Auxiliary derivatives; only meaningful once Dynamics is realized.
    pub fn zdot(&self) -> StateResult<&DVector<Real>> {
        self.require_stage(Stage::Dynamics, "zdot")?;
        Ok(&self.zdot)
    }

    /// Writable derivatives, for use while realizing Dynamics.
    pub fn zdot_mut(&mut self) -> &mut DVector<Real> {
        &mut self.zdot
    }

    // ---------------------------------------------------- discrete variables

    /// Allocate a discrete parameter. Changing it later invalidates
    /// `invalidates` and every later stage.
    pub fn allocate_discrete<T: StateValue>(
        &mut self,
        name: &'static str,
        invalidates: Stage,
        default: T,
    ) -> DiscreteVarId {
        let id = Id::from_usize(self.discrete.len());
        let at = self.realizing();
        self.discrete.push(DiscreteVar {
            name,
            invalidates,
            allocated_at: at,
            value: Box::new(default),
        });
        tracing::debug!(name, %id, invalidates = %invalidates, "allocated discrete variable");
        id
    }

    pub fn discrete<T: Any>(&self, id: DiscreteVarId) -> StateResult<&T> {
        let var = self.discrete.get(id.idx()).ok_or(StateError::UnknownEntry {
            what: "discrete variable",
            id,
        })?;
        downcast_ref::<T>(var.value.as_ref()).ok_or(StateError::TypeMismatch { what: var.name })
    }

    pub fn set_discrete<T: Any>(&mut self, id: DiscreteVarId, value: T) -> StateResult<()> {
        let (name, invalidates) = match self.discrete.get(id.idx()) {
            Some(var) => (var.name, var.invalidates),
            None => {
                return Err(StateError::UnknownEntry {
                    what: "discrete variable",
                    id,
                });
            }
        };
        self.invalidate_all(invalidates);
        let var = self
            .discrete
            .get_mut(id.idx())
            .ok_or(StateError::UnknownEntry {
                what: "discrete variable",
                id,
            })?;
        let slot = downcast_mut::<T>(var.value.as_mut()).ok_or(StateError::TypeMismatch { what: name })?;
        *slot = value;
        Ok(())
    }

    // ---------------------------------------------------------- cache entries

    /// Allocate an initially empty cache entry whose value is valid only
    /// while the state is realized through `depends_on`.
    pub fn allocate_cache_entry(&mut self, name: &'static str, depends_on: Stage) -> CacheId {
        let id = Id::from_usize(self.cache.len());
        let at = self.realizing();
        self.cache.push(CacheEntry {
            name,
            depends_on,
            allocated_at: at,
            value: OnceLock::new(),
            fills: AtomicUsize::new(0),
        });
        tracing::debug!(name, %id, depends_on = %depends_on, "allocated cache entry");
        id
    }

    fn entry(&self, id: CacheId) -> StateResult<&CacheEntry> {
        self.cache.get(id.idx()).ok_or(StateError::UnknownEntry {
            what: "cache entry",
            id,
        })
    }

    pub fn is_cache_valid(&self, id: CacheId) -> bool {
        self.entry(id)
            .map(|e| self.stage >= e.depends_on && e.value.get().is_some())
            .unwrap_or(false)
    }

    /// Read a computed cache value.
    pub fn cache_value<T: Any>(&self, id: CacheId) -> StateResult<&T> {
        let entry = self.entry(id)?;
        self.require_stage(entry.depends_on, entry.name)?;
        let value = entry
            .value
            .get()
            .ok_or(StateError::NotValid { what: entry.name })?;
        downcast_ref::<T>(value.as_ref()).ok_or(StateError::TypeMismatch { what: entry.name })
    }

    /// Return the cached value, computing and storing it first if needed.
    ///
    /// If two readers race on an empty entry both may compute, but only
    /// the first stored value is kept and returned to both.
    pub fn cache_get_or_compute<T, E, F>(&self, id: CacheId, compute: F) -> Result<&T, E>
    where
        T: StateValue,
        E: From<StateError>,
        F: FnOnce() -> Result<T, E>,
    {
        let entry = self.entry(id)?;
        self.require_stage(entry.depends_on, entry.name)?;
        if entry.value.get().is_none() {
            let value = compute()?;
            entry.store(Box::new(value));
        }
        Ok(self.cache_value::<T>(id)?)
    }

    /// Store `value` unless the entry is already valid. Returns whether the
    /// value was stored.
    pub fn cache_offer<T: StateValue>(&self, id: CacheId, value: T) -> StateResult<bool> {
        let entry = self.entry(id)?;
        self.require_stage(entry.depends_on, entry.name)?;
        Ok(entry.store(Box::new(value)))
    }

    /// Overwrite a cache value. Used while realizing the stage that owns it,
    /// before the state reports that stage.
    pub fn cache_update<T: StateValue>(&mut self, id: CacheId, value: T) -> StateResult<()> {
        let entry = self.cache.get_mut(id.idx()).ok_or(StateError::UnknownEntry {
            what: "cache entry",
            id,
        })?;
        entry.value = OnceLock::new();
        entry.store(Box::new(value));
        Ok(())
    }

    /// How many times a value has been stored into this entry, across
    /// invalidations.
    pub fn cache_fill_count(&self, id: CacheId) -> StateResult<usize> {
        Ok(self.entry(id)?.fills.load(Ordering::Relaxed))
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> StateResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(StateError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}
