use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::error::Error;
use crate::sensor::Sensor;

/// Latest value published by an event driven sensor.
///
/// The producer side calls [`publish`](Self::publish) from its callback, the
/// polling loop pulls through [`Sensor::sample`]. A published value is handed
/// out once, so a silent producer shows up as `Error::NoData` instead of a
/// repeated old value.
pub struct PushedReading<M: RawMutex, T: Copy> {
    latest: Mutex<M, Cell<Option<T>>>,
}

impl<M: RawMutex, T: Copy> PushedReading<M, T> {
    pub const fn new() -> Self {
        Self {
            latest: Mutex::new(Cell::new(None)),
        }
    }

    pub fn publish(&self, value: T) {
        self.latest.lock(|latest| latest.set(Some(value)));
    }

    pub fn take(&self) -> Option<T> {
        self.latest.lock(|latest| latest.take())
    }
}

impl<M: RawMutex, T: Copy> Default for PushedReading<M, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, T: Copy> Sensor for &PushedReading<M, T> {
    type Reading = T;

    async fn sample(&mut self) -> Result<T, Error> {
        self.take().ok_or(Error::NoData)
    }
}
