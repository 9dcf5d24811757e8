//! Shared test helpers for unit and integration tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so the
//! helpers are available to unit tests, `tests/` suites and benches
//! (via the `test-utils` feature).

use crate::buffer::{PackageBuffer, QueueDiscipline};
use crate::factory::Factory;
use crate::id::{ElementId, NodeHandle, Time};
use crate::nodes::{LoadingRamp, Storehouse, Worker};

pub fn add_ramp(factory: &mut Factory, id: ElementId, interval: Time) {
    factory
        .add_ramp(LoadingRamp::new(id, interval))
        .expect("duplicate ramp id in test setup");
}

pub fn add_worker(factory: &mut Factory, id: ElementId, duration: Time) {
    add_worker_with(factory, id, duration, QueueDiscipline::Fifo);
}

pub fn add_worker_with(
    factory: &mut Factory,
    id: ElementId,
    duration: Time,
    discipline: QueueDiscipline,
) {
    factory
        .add_worker(Worker::new(id, duration, PackageBuffer::new(discipline)))
        .expect("duplicate worker id in test setup");
}

pub fn add_storehouse(factory: &mut Factory, id: ElementId) {
    factory
        .add_storehouse(Storehouse::new(id))
        .expect("duplicate storehouse id in test setup");
}

pub fn link(factory: &mut Factory, src: NodeHandle, dest: NodeHandle) {
    factory.link(src, dest).expect("invalid link in test setup");
}

/// `ramp 1 -> worker 1 -> storehouse 1`, FIFO queue.
pub fn pipeline(interval: Time, duration: Time) -> Factory {
    let mut factory = Factory::new();
    add_ramp(&mut factory, 1, interval);
    add_worker(&mut factory, 1, duration);
    add_storehouse(&mut factory, 1);
    link(&mut factory, NodeHandle::ramp(1), NodeHandle::worker(1));
    link(&mut factory, NodeHandle::worker(1), NodeHandle::storehouse(1));
    factory
}

/// All package ids currently held anywhere in the factory, in no
/// particular order. Used by conservation checks.
pub fn all_package_ids(factory: &Factory) -> Vec<ElementId> {
    let mut ids = Vec::new();
    for ramp in factory.ramps() {
        if let Some(p) = ramp.sending_buffer() {
            ids.push(p.id());
        }
    }
    for worker in factory.workers() {
        ids.extend(worker.queue().iter().map(|p| p.id()));
        if let Some(p) = worker.processing_buffer() {
            ids.push(p.id());
        }
        if let Some(p) = worker.sending_buffer() {
            ids.push(p.id());
        }
    }
    for storehouse in factory.storehouses() {
        ids.extend(storehouse.stock().iter().map(|p| p.id()));
    }
    ids
}
