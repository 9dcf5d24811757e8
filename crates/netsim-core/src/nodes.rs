//! Node variants of the production network.
//!
//! Three kinds, unified by two capabilities:
//! - [`LoadingRamp`] -- *send*: mints packages on a fixed cadence.
//! - [`Worker`] -- *receive* + *send*: queues, processes, forwards.
//! - [`Storehouse`] -- *receive*: terminal stockpile.
//!
//! Nodes hold no references to each other. Senders carry a
//! [`ReceiverPreferences`] map of `(kind, id)` handles which the owning
//! [`Factory`](crate::factory::Factory) resolves during the passing phase.

use crate::buffer::PackageBuffer;
use crate::id::{ElementId, NodeHandle, Time};
use crate::package::Package;
use crate::preferences::ReceiverPreferences;

// ---------------------------------------------------------------------------
// LoadingRamp
// ---------------------------------------------------------------------------

/// Produces a new package every `delivery_interval` turns and holds it in
/// a one-slot sending buffer until the passing phase moves it out.
#[derive(Debug)]
pub struct LoadingRamp {
    id: ElementId,
    delivery_interval: Time,
    sending_buffer: Option<Package>,
    preferences: ReceiverPreferences,
}

impl LoadingRamp {
    /// `delivery_interval` must be at least 1.
    pub fn new(id: ElementId, delivery_interval: Time) -> Self {
        debug_assert!(delivery_interval >= 1, "delivery interval must be >= 1");
        Self {
            id,
            delivery_interval,
            sending_buffer: None,
            preferences: ReceiverPreferences::new(),
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn handle(&self) -> NodeHandle {
        NodeHandle::ramp(self.id)
    }

    pub fn delivery_interval(&self) -> Time {
        self.delivery_interval
    }

    /// Phase 1. On turns where `(t - 1) % delivery_interval == 0`, mint a
    /// new package into the sending buffer.
    ///
    /// The buffer is always empty here when phases run in the prescribed
    /// order, because the previous turn's passing phase drained it.
    pub fn deliver(&mut self, t: Time) {
        if (t - 1) % self.delivery_interval != 0 {
            return;
        }
        debug_assert!(
            self.sending_buffer.is_none(),
            "delivery into an occupied sending buffer"
        );
        self.sending_buffer = Some(Package::new());
    }

    pub fn sending_buffer(&self) -> Option<&Package> {
        self.sending_buffer.as_ref()
    }

    pub(crate) fn take_sending(&mut self) -> Option<Package> {
        self.sending_buffer.take()
    }

    pub fn preferences(&self) -> &ReceiverPreferences {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut ReceiverPreferences {
        &mut self.preferences
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Queues incoming packages, processes one at a time for
/// `processing_duration` turns, and forwards finished goods.
#[derive(Debug)]
pub struct Worker {
    id: ElementId,
    processing_duration: Time,
    queue: PackageBuffer,
    processing_buffer: Option<Package>,
    processing_start: Option<Time>,
    sending_buffer: Option<Package>,
    preferences: ReceiverPreferences,
}

impl Worker {
    /// `processing_duration` must be at least 1.
    pub fn new(id: ElementId, processing_duration: Time, queue: PackageBuffer) -> Self {
        debug_assert!(processing_duration >= 1, "processing duration must be >= 1");
        Self {
            id,
            processing_duration,
            queue,
            processing_buffer: None,
            processing_start: None,
            sending_buffer: None,
            preferences: ReceiverPreferences::new(),
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn handle(&self) -> NodeHandle {
        NodeHandle::worker(self.id)
    }

    pub fn processing_duration(&self) -> Time {
        self.processing_duration
    }

    /// Push an incoming package onto the input queue.
    pub fn receive(&mut self, package: Package) {
        self.queue.push(package);
    }

    /// Phase 3. Pull the next queued package into the processing buffer
    /// if idle, then move a finished package to the sending buffer.
    ///
    /// A package picked up at turn `t` has been processed for
    /// `t - start + 1` turns at the end of turn `t`, so a duration-1
    /// worker finishes in the same call that started it.
    pub fn work(&mut self, t: Time) {
        if self.processing_buffer.is_none() {
            if let Ok(package) = self.queue.pop() {
                self.processing_buffer = Some(package);
                self.processing_start = Some(t);
            }
        }

        if let Some(start) = self.processing_start {
            if t - start + 1 >= self.processing_duration {
                debug_assert!(
                    self.sending_buffer.is_none(),
                    "finished package with an occupied sending buffer"
                );
                self.sending_buffer = self.processing_buffer.take();
                self.processing_start = None;
            }
        }
    }

    pub fn queue(&self) -> &PackageBuffer {
        &self.queue
    }

    pub fn processing_buffer(&self) -> Option<&Package> {
        self.processing_buffer.as_ref()
    }

    pub fn processing_start_time(&self) -> Option<Time> {
        self.processing_start
    }

    /// Turns the in-progress package has been processed for as of turn
    /// `t`, or `None` when idle. This is the `pt` value in turn reports.
    pub fn processing_time(&self, t: Time) -> Option<Time> {
        self.processing_start.map(|start| t - start + 1)
    }

    pub fn sending_buffer(&self) -> Option<&Package> {
        self.sending_buffer.as_ref()
    }

    pub(crate) fn take_sending(&mut self) -> Option<Package> {
        self.sending_buffer.take()
    }

    pub fn preferences(&self) -> &ReceiverPreferences {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut ReceiverPreferences {
        &mut self.preferences
    }
}

// ---------------------------------------------------------------------------
// Storehouse
// ---------------------------------------------------------------------------

/// Terminal node: accumulates received packages in insertion order.
#[derive(Debug)]
pub struct Storehouse {
    id: ElementId,
    stock: Vec<Package>,
}

impl Storehouse {
    pub fn new(id: ElementId) -> Self {
        Self { id, stock: Vec::new() }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn handle(&self) -> NodeHandle {
        NodeHandle::storehouse(self.id)
    }

    pub fn receive(&mut self, package: Package) {
        self.stock.push(package);
    }

    /// Stock in insertion order.
    pub fn stock(&self) -> &[Package] {
        &self.stock
    }
}
