//! Network condition handle driven by throttle messages.
//!
//! The actual simulation (rate limiting, buffer capping, loss) lives behind
//! the [`NetworkCondition`] sink. The session only forwards settings to it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::protocol::Throttle;

/// Sink for simulated network conditions.
pub trait NetworkCondition: Send + 'static {
    /// Set the write rate limit.
    fn set_rate(&mut self, rate: u64);

    /// Set the write buffer size.
    fn set_buffer_size(&mut self, size: u64);

    /// Set the fraction of writes to drop.
    fn set_loss_fraction(&mut self, loss: f64);
}

/// In-memory sink that just records the settings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetworkSettings {
    /// Write rate limit.
    pub rate: u64,
    /// Write buffer size.
    pub buffer: u64,
    /// Loss fraction.
    pub loss: f64,
}

impl NetworkCondition for NetworkSettings {
    fn set_rate(&mut self, rate: u64) {
        self.rate = rate;
    }

    fn set_buffer_size(&mut self, size: u64) {
        self.buffer = size;
    }

    fn set_loss_fraction(&mut self, loss: f64) {
        self.loss = loss;
    }
}

#[derive(Debug)]
struct Applied<C> {
    sink: C,
    last: Option<Throttle>,
}

/// Shared, single-writer-at-a-time handle to the session's network condition.
///
/// A throttle is applied as one update under the lock: concurrent control
/// streams never interleave their settings, and the last completed update
/// wins.
#[derive(Debug)]
pub struct ConditionHandle<C> {
    inner: Arc<Mutex<Applied<C>>>,
}

impl<C> Clone for ConditionHandle<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: NetworkCondition> ConditionHandle<C> {
    /// Take ownership of a sink.
    pub fn new(sink: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Applied { sink, last: None })),
        }
    }

    /// Apply a throttle. Returns `false` if it equals the last one applied.
    pub fn apply(&self, throttle: &Throttle) -> bool {
        let mut applied = self.lock();
        if applied.last.as_ref() == Some(throttle) {
            return false;
        }

        applied.sink.set_rate(throttle.rate);
        applied.sink.set_buffer_size(throttle.buffer);
        applied.sink.set_loss_fraction(throttle.loss);
        applied.last = Some(*throttle);
        true
    }

    /// The last throttle applied, if any.
    pub fn last_applied(&self) -> Option<Throttle> {
        self.lock().last
    }

    /// Run `f` with the sink borrowed.
    pub fn with<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.lock().sink)
    }

    fn lock(&self) -> MutexGuard<'_, Applied<C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: NetworkCondition + Clone> ConditionHandle<C> {
    /// Copy of the sink's current state.
    pub fn snapshot(&self) -> C {
        self.with(C::clone)
    }
}

impl Default for ConditionHandle<NetworkSettings> {
    fn default() -> Self {
        Self::new(NetworkSettings::default())
    }
}
