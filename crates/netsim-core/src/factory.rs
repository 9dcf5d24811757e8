//! The factory: owns every node, wires links, checks topological
//! consistency and executes the three phases of a turn.
//!
//! # Ownership
//!
//! The factory exclusively owns its nodes, stored per kind in id-keyed
//! `BTreeMap`s so every iteration runs in ascending id order. Receiver
//! references inside preference maps are non-owning `(kind, id)` handles;
//! the factory keeps them valid by sweeping the handle out of every
//! preference map when a node is removed (eager invalidation).
//!
//! # Phases
//!
//! 1. `do_deliveries(t)` -- every ramp decides whether to mint a package.
//! 2. `do_package_passing()` -- every ramp, then every worker, moves its
//!    sending buffer to a chosen receiver.
//! 3. `do_work(t)` -- every worker starts/continues/finishes processing.
//!
//! Within a phase the ascending id order is fixed, although phases are
//! confluent: each source buffer holds at most one package and passing
//! only ever appends to input queues and stock.

use crate::id::{ElementId, NodeHandle, NodeKind, Time};
use crate::nodes::{LoadingRamp, Storehouse, Worker};
use crate::package::Package;
use crate::preferences::ReceiverPreferences;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// Errors raised by factory mutators and lookups.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: NodeKind, id: ElementId },
    #[error("{0} not found")]
    NotFound(NodeHandle),
    #[error("{0} cannot send packages")]
    NotASender(NodeHandle),
    #[error("{0} cannot receive packages")]
    NotAReceiver(NodeHandle),
}

/// A directed production network of ramps, workers and storehouses.
#[derive(Debug, Default)]
pub struct Factory {
    ramps: BTreeMap<ElementId, LoadingRamp>,
    workers: BTreeMap<ElementId, Worker>,
    storehouses: BTreeMap<ElementId, Storehouse>,
}

impl Factory {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Node mutators
    // -----------------------------------------------------------------------

    pub fn add_ramp(&mut self, ramp: LoadingRamp) -> Result<(), FactoryError> {
        if self.ramps.contains_key(&ramp.id()) {
            return Err(FactoryError::DuplicateId {
                kind: NodeKind::Ramp,
                id: ramp.id(),
            });
        }
        self.ramps.insert(ramp.id(), ramp);
        Ok(())
    }

    pub fn add_worker(&mut self, worker: Worker) -> Result<(), FactoryError> {
        if self.workers.contains_key(&worker.id()) {
            return Err(FactoryError::DuplicateId {
                kind: NodeKind::Worker,
                id: worker.id(),
            });
        }
        self.workers.insert(worker.id(), worker);
        Ok(())
    }

    pub fn add_storehouse(&mut self, storehouse: Storehouse) -> Result<(), FactoryError> {
        if self.storehouses.contains_key(&storehouse.id()) {
            return Err(FactoryError::DuplicateId {
                kind: NodeKind::Storehouse,
                id: storehouse.id(),
            });
        }
        self.storehouses.insert(storehouse.id(), storehouse);
        Ok(())
    }

    /// Remove a ramp. Ramps are never referenced by preference maps, so
    /// no sweep is needed.
    pub fn remove_ramp_by_id(&mut self, id: ElementId) -> Result<(), FactoryError> {
        self.ramps
            .remove(&id)
            .map(|_| ())
            .ok_or(FactoryError::NotFound(NodeHandle::ramp(id)))
    }

    /// Remove a worker and sweep its handle out of every preference map.
    pub fn remove_worker_by_id(&mut self, id: ElementId) -> Result<(), FactoryError> {
        if self.workers.remove(&id).is_none() {
            return Err(FactoryError::NotFound(NodeHandle::worker(id)));
        }
        self.sweep_receiver(NodeHandle::worker(id));
        Ok(())
    }

    /// Remove a storehouse and sweep its handle out of every preference map.
    pub fn remove_storehouse_by_id(&mut self, id: ElementId) -> Result<(), FactoryError> {
        if self.storehouses.remove(&id).is_none() {
            return Err(FactoryError::NotFound(NodeHandle::storehouse(id)));
        }
        self.sweep_receiver(NodeHandle::storehouse(id));
        Ok(())
    }

    fn sweep_receiver(&mut self, handle: NodeHandle) {
        let mut swept = 0usize;
        for ramp in self.ramps.values_mut() {
            if ramp.preferences().contains(&handle) {
                ramp.preferences_mut().remove(&handle);
                swept += 1;
            }
        }
        for worker in self.workers.values_mut() {
            if worker.preferences().contains(&handle) {
                worker.preferences_mut().remove(&handle);
                swept += 1;
            }
        }
        debug!(%handle, swept, "removed node and invalidated references");
    }

    // -----------------------------------------------------------------------
    // Links
    // -----------------------------------------------------------------------

    /// Register `dest` as a receiver of `src`. Both nodes must exist,
    /// `src` must be a sender and `dest` a receiver.
    pub fn link(&mut self, src: NodeHandle, dest: NodeHandle) -> Result<(), FactoryError> {
        if !src.kind.is_sender() {
            return Err(FactoryError::NotASender(src));
        }
        if !dest.kind.is_receiver() {
            return Err(FactoryError::NotAReceiver(dest));
        }
        if !self.contains(dest) {
            return Err(FactoryError::NotFound(dest));
        }
        self.sender_preferences_mut(src)?.add(dest);
        Ok(())
    }

    /// Remove `dest` from `src`'s receivers.
    pub fn unlink(&mut self, src: NodeHandle, dest: NodeHandle) -> Result<(), FactoryError> {
        self.sender_preferences_mut(src)?.remove(&dest);
        Ok(())
    }

    fn sender_preferences_mut(
        &mut self,
        src: NodeHandle,
    ) -> Result<&mut ReceiverPreferences, FactoryError> {
        match src.kind {
            NodeKind::Ramp => self
                .ramps
                .get_mut(&src.id)
                .map(LoadingRamp::preferences_mut)
                .ok_or(FactoryError::NotFound(src)),
            NodeKind::Worker => self
                .workers
                .get_mut(&src.id)
                .map(Worker::preferences_mut)
                .ok_or(FactoryError::NotFound(src)),
            NodeKind::Storehouse => Err(FactoryError::NotASender(src)),
        }
    }

    // -----------------------------------------------------------------------
    // Lookup and iteration
    // -----------------------------------------------------------------------

    pub fn find_ramp_by_id(&self, id: ElementId) -> Option<&LoadingRamp> {
        self.ramps.get(&id)
    }

    pub fn find_ramp_by_id_mut(&mut self, id: ElementId) -> Option<&mut LoadingRamp> {
        self.ramps.get_mut(&id)
    }

    pub fn find_worker_by_id(&self, id: ElementId) -> Option<&Worker> {
        self.workers.get(&id)
    }

    pub fn find_worker_by_id_mut(&mut self, id: ElementId) -> Option<&mut Worker> {
        self.workers.get_mut(&id)
    }

    pub fn find_storehouse_by_id(&self, id: ElementId) -> Option<&Storehouse> {
        self.storehouses.get(&id)
    }

    pub fn find_storehouse_by_id_mut(&mut self, id: ElementId) -> Option<&mut Storehouse> {
        self.storehouses.get_mut(&id)
    }

    /// Ramps in ascending id order.
    pub fn ramps(&self) -> impl Iterator<Item = &LoadingRamp> {
        self.ramps.values()
    }

    /// Workers in ascending id order.
    pub fn workers(&self) -> impl Iterator<Item = &Worker> {
        self.workers.values()
    }

    /// Storehouses in ascending id order.
    pub fn storehouses(&self) -> impl Iterator<Item = &Storehouse> {
        self.storehouses.values()
    }

    /// Whether a handle resolves to a live node of its kind.
    pub fn contains(&self, handle: NodeHandle) -> bool {
        match handle.kind {
            NodeKind::Ramp => self.ramps.contains_key(&handle.id),
            NodeKind::Worker => self.workers.contains_key(&handle.id),
            NodeKind::Storehouse => self.storehouses.contains_key(&handle.id),
        }
    }

    // -----------------------------------------------------------------------
    // Consistency
    // -----------------------------------------------------------------------

    /// Whether the topology admits simulation:
    ///
    /// 1. every ramp has at least one receiver,
    /// 2. every worker has at least one receiver,
    /// 3. every worker is reachable from some ramp,
    /// 4. every worker can reach some storehouse,
    ///
    /// and every held receiver handle resolves to a live node.
    pub fn is_consistent(&self) -> bool {
        for ramp in self.ramps.values() {
            if ramp.preferences().is_empty() {
                return false;
            }
            if !ramp.preferences().receivers().all(|&h| self.contains(h)) {
                return false;
            }
        }
        for worker in self.workers.values() {
            if worker.preferences().is_empty() {
                return false;
            }
            if !worker.preferences().receivers().all(|&h| self.contains(h)) {
                return false;
            }
        }

        let fed = self.workers_reachable_from_ramps();
        let draining = self.workers_reaching_storehouses();
        self.workers
            .keys()
            .all(|&id| fed.contains(&id) && draining.contains(&id))
    }

    /// Forward sweep: worker ids reachable from any ramp through the
    /// receiver graph.
    fn workers_reachable_from_ramps(&self) -> BTreeSet<ElementId> {
        let mut reached = BTreeSet::new();
        let mut frontier: VecDeque<ElementId> = VecDeque::new();

        for ramp in self.ramps.values() {
            for &handle in ramp.preferences().receivers() {
                if handle.kind == NodeKind::Worker && reached.insert(handle.id) {
                    frontier.push_back(handle.id);
                }
            }
        }
        while let Some(id) = frontier.pop_front() {
            let Some(worker) = self.workers.get(&id) else { continue };
            for &handle in worker.preferences().receivers() {
                if handle.kind == NodeKind::Worker && reached.insert(handle.id) {
                    frontier.push_back(handle.id);
                }
            }
        }
        reached
    }

    /// Backward sweep: worker ids that reach any storehouse through the
    /// receiver graph.
    fn workers_reaching_storehouses(&self) -> BTreeSet<ElementId> {
        // Reverse adjacency restricted to worker-to-worker edges.
        let mut feeders: BTreeMap<ElementId, Vec<ElementId>> = BTreeMap::new();
        let mut reaching = BTreeSet::new();
        let mut frontier: VecDeque<ElementId> = VecDeque::new();

        for worker in self.workers.values() {
            for &handle in worker.preferences().receivers() {
                match handle.kind {
                    NodeKind::Storehouse => {
                        if self.storehouses.contains_key(&handle.id)
                            && reaching.insert(worker.id())
                        {
                            frontier.push_back(worker.id());
                        }
                    }
                    NodeKind::Worker => {
                        feeders.entry(handle.id).or_default().push(worker.id());
                    }
                    NodeKind::Ramp => {}
                }
            }
        }
        while let Some(id) = frontier.pop_front() {
            if let Some(sources) = feeders.get(&id) {
                for &src in sources {
                    if reaching.insert(src) {
                        frontier.push_back(src);
                    }
                }
            }
        }
        reaching
    }

    // -----------------------------------------------------------------------
    // Phase execution
    // -----------------------------------------------------------------------

    /// Phase 1: every ramp decides whether to mint a package this turn.
    pub fn do_deliveries(&mut self, t: Time) {
        for ramp in self.ramps.values_mut() {
            ramp.deliver(t);
        }
    }

    /// Phase 2: every ramp, then every worker, moves its sending buffer
    /// to a chosen receiver. A sender with an empty preference set keeps
    /// its package.
    pub fn do_package_passing(&mut self) -> Result<(), FactoryError> {
        let ramp_ids: Vec<ElementId> = self.ramps.keys().copied().collect();
        for id in ramp_ids {
            let Some(ramp) = self.ramps.get_mut(&id) else { continue };
            if ramp.sending_buffer().is_none() || ramp.preferences().is_empty() {
                continue;
            }
            let Ok(dest) = ramp.preferences_mut().choose() else { continue };
            let Some(package) = ramp.take_sending() else { continue };
            self.deliver_to(dest, package)?;
        }

        let worker_ids: Vec<ElementId> = self.workers.keys().copied().collect();
        for id in worker_ids {
            let Some(worker) = self.workers.get_mut(&id) else { continue };
            if worker.sending_buffer().is_none() || worker.preferences().is_empty() {
                continue;
            }
            let Ok(dest) = worker.preferences_mut().choose() else { continue };
            let Some(package) = worker.take_sending() else { continue };
            self.deliver_to(dest, package)?;
        }
        Ok(())
    }

    /// Phase 3: every worker starts/continues/finishes processing.
    pub fn do_work(&mut self, t: Time) {
        for worker in self.workers.values_mut() {
            worker.work(t);
        }
    }

    fn deliver_to(&mut self, dest: NodeHandle, package: Package) -> Result<(), FactoryError> {
        match dest.kind {
            NodeKind::Worker => self
                .workers
                .get_mut(&dest.id)
                .ok_or(FactoryError::NotFound(dest))?
                .receive(package),
            NodeKind::Storehouse => self
                .storehouses
                .get_mut(&dest.id)
                .ok_or(FactoryError::NotFound(dest))?
                .receive(package),
            NodeKind::Ramp => return Err(FactoryError::NotAReceiver(dest)),
        }
        Ok(())
    }
}
