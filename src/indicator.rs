use embedded_hal::digital::OutputPin;

/// Temperature band of the integer part of a reading, in degrees Celsius.
/// The three ranges partition all `u8` values, so the band is total.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Band {
    Cold,
    Warm,
    Hot,
}

impl Band {
    pub const fn of(temperature_integer: u8) -> Self {
        match temperature_integer {
            0..=28 => Band::Cold,
            29..=39 => Band::Warm,
            _ => Band::Hot,
        }
    }
}

/// Three indicator lines, exactly one asserted per decision.
pub struct IndicatorLeds<Pin: OutputPin> {
    cold: Pin,
    warm: Pin,
    hot: Pin,
}

impl<Pin: OutputPin> IndicatorLeds<Pin> {
    pub fn new(cold: Pin, warm: Pin, hot: Pin) -> Self {
        Self { cold, warm, hot }
    }

    pub fn indicate(&mut self, band: Band) {
        let result = match band {
            Band::Cold => self
                .cold
                .set_high()
                .and_then(|_| self.warm.set_low())
                .and_then(|_| self.hot.set_low()),
            Band::Warm => self
                .warm
                .set_high()
                .and_then(|_| self.cold.set_low())
                .and_then(|_| self.hot.set_low()),
            Band::Hot => self
                .hot
                .set_high()
                .and_then(|_| self.cold.set_low())
                .and_then(|_| self.warm.set_low()),
        };
        if result.is_err() {
            error!("indicator pin write failed");
        }
    }
}
