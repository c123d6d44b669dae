use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// Last successfully read sensor values. Humidity and temperature are stored
/// in separate poll phases, so one half may be a cycle older than the other.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasurementSample {
    pub humidity_integer: u8,
    pub humidity_fraction: u8,
    pub temperature_integer: u8,
    pub temperature_fraction: u8,
}

/// The sample shared between the scanner and the reporter. Each measurement
/// pair is stored under one short critical section, so a reader never sees a
/// half-written pair.
pub struct SharedSample {
    inner: Mutex<CriticalSectionRawMutex, Cell<MeasurementSample>>,
}

impl SharedSample {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(MeasurementSample {
                humidity_integer: 0,
                humidity_fraction: 0,
                temperature_integer: 0,
                temperature_fraction: 0,
            })),
        }
    }

    pub fn get(&self) -> MeasurementSample {
        self.inner.lock(|cell| cell.get())
    }

    pub fn set_humidity(&self, integer: u8, fraction: u8) {
        self.inner.lock(|cell| {
            let mut sample = cell.get();
            sample.humidity_integer = integer;
            sample.humidity_fraction = fraction;
            cell.set(sample);
        });
    }

    pub fn set_temperature(&self, integer: u8, fraction: u8) {
        self.inner.lock(|cell| {
            let mut sample = cell.get();
            sample.temperature_integer = integer;
            sample.temperature_fraction = fraction;
            cell.set(sample);
        });
    }
}

impl Default for SharedSample {
    fn default() -> Self {
        Self::new()
    }
}
