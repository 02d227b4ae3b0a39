// state.rs — snapshot cells shared between the link loops and the presentation layer
use link_protocol::ParameterId;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Last-known parameter values, keyed by id. Only ids the vehicle advertised.
pub type ParameterSet = BTreeMap<ParameterId, f32>;

/// One shared value, replaced wholesale by its single writer and read as a
/// consistent copy by any number of readers.
#[derive(Debug, Default)]
pub struct SharedCell<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Clone for SharedCell<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: Clone> SharedCell<T> {
    pub fn new(value: T) -> Self {
        Self { inner: Arc::new(RwLock::new(value)) }
    }

    pub fn load(&self) -> T {
        self.inner.read().clone()
    }

    pub fn store(&self, value: T) {
        *self.inner.write() = value;
    }

    /// Read-modify-write under the lock.
    pub fn update<F: FnOnce(&mut T)>(&self, f: F) {
        f(&mut self.inner.write());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use link_protocol::{ControlAxes, TelemetryState};

    #[test]
    fn clones_share_the_same_value() {
        let cell = SharedCell::new(ControlAxes::default());
        let writer = cell.clone();
        writer.store(ControlAxes { throttle: 0.5, ..Default::default() });
        assert_eq!(cell.load().throttle, 0.5);
    }

    #[test]
    fn store_replaces_the_whole_snapshot() {
        let cell: SharedCell<TelemetryState> = SharedCell::default();
        let snap = TelemetryState { altitude: 7, armed: true, ..Default::default() };
        cell.store(snap);
        assert_eq!(cell.load(), snap);
    }

    #[test]
    fn update_mutates_in_place() {
        let cell: SharedCell<ParameterSet> = SharedCell::default();
        let id = ParameterId::new(3).unwrap();
        cell.update(|p| {
            p.insert(id, 1.5);
        });
        assert_eq!(cell.load().get(&id), Some(&1.5));
    }
}
