use embassy_time::{Duration, Ticker};
use embedded_hal::digital::OutputPin;
use embedded_io_async::Write;

use crate::bus::{Direction, TwiBus, TwiError};
use crate::indicator::{Band, IndicatorLeds};
use crate::sample::SharedSample;

/// DHT12 slave address.
pub const SENSOR_ADDRESS: u8 = 0x5c;

const HUMIDITY_REGISTER: u8 = 0x00;
const TEMPERATURE_REGISTER: u8 = 0x02;

/// Fixed poll period; each elapsed period advances the scan by one state.
/// Must stay well above the worst-case duration of one bus transaction.
pub const POLL_PERIOD: Duration = Duration::from_millis(262);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanState {
    Idle,
    AwaitHumidity,
    AwaitTemperature,
    ApplyOutput,
}

pub struct Scanner<'a, Bus: TwiBus, Led: OutputPin, Diag: Write> {
    bus: Bus,
    leds: IndicatorLeds<Led>,
    diag: Diag,
    sample: &'a SharedSample,
    state: ScanState,
}

pub fn new<'a, Bus: TwiBus, Led: OutputPin, Diag: Write>(
    bus: Bus,
    leds: IndicatorLeds<Led>,
    diag: Diag,
    sample: &'a SharedSample,
) -> Scanner<'a, Bus, Led, Diag> {
    Scanner {
        bus,
        leds,
        diag,
        sample,
        state: ScanState::Idle,
    }
}

impl<Bus: TwiBus, Led: OutputPin, Diag: Write> Scanner<'_, Bus, Led, Diag> {
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Runs forever, advancing the scan by exactly one state per period.
    /// Steps are strictly sequential; the next tick is only awaited after
    /// the previous step returned.
    pub async fn run(mut self) {
        let mut ticker = Ticker::every(POLL_PERIOD);
        loop {
            ticker.next().await;
            self.step().await;
        }
    }

    /// One bounded unit of work. A bus transaction opened here is closed
    /// before returning; only the which-transaction-is-next state spans
    /// periods.
    pub async fn step(&mut self) {
        self.state = match self.state {
            ScanState::Idle => ScanState::AwaitHumidity,
            ScanState::AwaitHumidity => match self.read_register_pair(HUMIDITY_REGISTER).await {
                Ok((integer, fraction)) => {
                    trace!("humidity {}.{}", integer, fraction);
                    self.sample.set_humidity(integer, fraction);
                    ScanState::AwaitTemperature
                }
                Err(TwiError::NoAcknowledge) => {
                    warn!("sensor not responding, humidity phase");
                    self.emit_diagnostic("Not connected H").await;
                    ScanState::Idle
                }
            },
            ScanState::AwaitTemperature => match self.read_register_pair(TEMPERATURE_REGISTER).await {
                Ok((integer, fraction)) => {
                    trace!("temperature {}.{}", integer, fraction);
                    self.sample.set_temperature(integer, fraction);
                    ScanState::ApplyOutput
                }
                Err(TwiError::NoAcknowledge) => {
                    warn!("sensor not responding, temperature phase");
                    self.emit_diagnostic("Not connected T").await;
                    ScanState::Idle
                }
            },
            ScanState::ApplyOutput => {
                let band = Band::of(self.sample.get().temperature_integer);
                debug!("indicating {:?}", band);
                self.leds.indicate(band);
                ScanState::Idle
            }
        };
    }

    async fn read_register_pair(&mut self, register: u8) -> Result<(u8, u8), TwiError> {
        self.bus.start(SENSOR_ADDRESS, Direction::Write).await?;
        self.bus.write(register).await?;
        self.bus.stop().await;
        self.bus.start(SENSOR_ADDRESS, Direction::Read).await?;
        let integer = self.bus.read_ack().await;
        let fraction = self.bus.read_nack().await;
        self.bus.stop().await;
        Ok((integer, fraction))
    }

    async fn emit_diagnostic(&mut self, text: &str) {
        if self.diag.write_all(text.as_bytes()).await.is_err() {
            warn!("diagnostic write failed");
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::indicator::tests::FakePin;
    use crate::io::tests::RecordingSink;
    use crate::sample::MeasurementSample;
    use core::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    pub enum Op {
        Start(u8, Direction),
        Write(u8),
        ReadAck,
        ReadNack,
        Stop,
    }

    /// Register-file model of the sensor. A queued `false` makes the next
    /// write-phase addressing go unacknowledged.
    #[derive(Clone, Default)]
    pub struct FakeBus {
        registers: Rc<RefCell<[u8; 4]>>,
        ack_write_starts: Rc<RefCell<VecDeque<bool>>>,
        pointer: Rc<Cell<usize>>,
        ops: Rc<RefCell<Vec<Op>>>,
    }

    impl FakeBus {
        fn with_registers(humidity: (u8, u8), temperature: (u8, u8)) -> Self {
            let bus = Self::default();
            *bus.registers.borrow_mut() = [humidity.0, humidity.1, temperature.0, temperature.1];
            bus
        }

        fn script_write_starts(&self, acks: &[bool]) {
            self.ack_write_starts.borrow_mut().extend(acks.iter().copied());
        }

        fn ops(&self) -> Vec<Op> {
            self.ops.borrow().clone()
        }

        fn read_byte(&self) -> u8 {
            let index = self.pointer.get();
            self.pointer.set(index + 1);
            self.registers.borrow()[index]
        }
    }

    impl TwiBus for FakeBus {
        async fn start(&mut self, address: u8, direction: Direction) -> Result<(), TwiError> {
            self.ops.borrow_mut().push(Op::Start(address, direction));
            if direction == Direction::Write && !self.ack_write_starts.borrow_mut().pop_front().unwrap_or(true) {
                return Err(TwiError::NoAcknowledge);
            }
            Ok(())
        }

        async fn write(&mut self, byte: u8) -> Result<(), TwiError> {
            self.ops.borrow_mut().push(Op::Write(byte));
            self.pointer.set(byte as usize);
            Ok(())
        }

        async fn read_ack(&mut self) -> u8 {
            self.ops.borrow_mut().push(Op::ReadAck);
            self.read_byte()
        }

        async fn read_nack(&mut self) -> u8 {
            self.ops.borrow_mut().push(Op::ReadNack);
            self.read_byte()
        }

        async fn stop(&mut self) {
            self.ops.borrow_mut().push(Op::Stop);
        }
    }

    struct Harness {
        bus: FakeBus,
        cold: FakePin,
        warm: FakePin,
        hot: FakePin,
        diag: RecordingSink,
        sample: SharedSample,
    }

    impl Harness {
        fn new(bus: FakeBus) -> Self {
            Self {
                bus,
                cold: FakePin::default(),
                warm: FakePin::default(),
                hot: FakePin::default(),
                diag: RecordingSink::default(),
                sample: SharedSample::new(),
            }
        }

        fn scanner(&self) -> Scanner<'_, FakeBus, FakePin, RecordingSink> {
            let leds = IndicatorLeds::new(self.cold.clone(), self.warm.clone(), self.hot.clone());
            super::new(self.bus.clone(), leds, self.diag.clone(), &self.sample)
        }

        fn asserted_lines(&self) -> (bool, bool, bool) {
            (self.cold.is_set(), self.warm.is_set(), self.hot.is_set())
        }
    }

    #[tokio::test]
    async fn test_state_cycle_on_success() {
        let harness = Harness::new(FakeBus::with_registers((23, 5), (27, 0)));
        let mut scanner = harness.scanner();
        assert_eq!(scanner.state(), ScanState::Idle);
        scanner.step().await;
        assert_eq!(scanner.state(), ScanState::AwaitHumidity);
        scanner.step().await;
        assert_eq!(scanner.state(), ScanState::AwaitTemperature);
        scanner.step().await;
        assert_eq!(scanner.state(), ScanState::ApplyOutput);
        scanner.step().await;
        assert_eq!(scanner.state(), ScanState::Idle);
    }

    #[tokio::test]
    async fn test_full_cycle_stores_sample_and_indicates_cold() {
        let harness = Harness::new(FakeBus::with_registers((23, 5), (27, 0)));
        let mut scanner = harness.scanner();
        for _ in 0..4 {
            scanner.step().await;
        }
        assert_eq!(
            harness.sample.get(),
            MeasurementSample {
                humidity_integer: 23,
                humidity_fraction: 5,
                temperature_integer: 27,
                temperature_fraction: 0,
            }
        );
        assert_eq!(harness.asserted_lines(), (true, false, false));
        assert!(harness.diag.contents().is_empty());
    }

    #[tokio::test]
    async fn test_warm_temperature_indicates_warm() {
        let harness = Harness::new(FakeBus::with_registers((50, 0), (35, 2)));
        let mut scanner = harness.scanner();
        for _ in 0..4 {
            scanner.step().await;
        }
        assert_eq!(harness.asserted_lines(), (false, true, false));
    }

    #[tokio::test]
    async fn test_hot_temperature_indicates_hot() {
        let harness = Harness::new(FakeBus::with_registers((50, 0), (40, 0)));
        let mut scanner = harness.scanner();
        for _ in 0..4 {
            scanner.step().await;
        }
        assert_eq!(harness.asserted_lines(), (false, false, true));
    }

    #[tokio::test]
    async fn test_humidity_failure_resets_to_idle() {
        let bus = FakeBus::with_registers((23, 5), (27, 0));
        bus.script_write_starts(&[false]);
        let harness = Harness::new(bus);
        let mut scanner = harness.scanner();
        scanner.step().await;
        scanner.step().await;
        assert_eq!(scanner.state(), ScanState::Idle);
        assert_eq!(harness.sample.get(), MeasurementSample::default());
        assert_eq!(harness.diag.contents(), b"Not connected H");
        assert_eq!(harness.asserted_lines(), (false, false, false));
    }

    #[tokio::test]
    async fn test_temperature_failure_keeps_humidity_and_skips_output() {
        let bus = FakeBus::with_registers((23, 5), (27, 0));
        bus.script_write_starts(&[true, false]);
        let harness = Harness::new(bus);
        let mut scanner = harness.scanner();
        scanner.step().await;
        scanner.step().await;
        scanner.step().await;
        assert_eq!(scanner.state(), ScanState::Idle);
        assert_eq!(
            harness.sample.get(),
            MeasurementSample {
                humidity_integer: 23,
                humidity_fraction: 5,
                temperature_integer: 0,
                temperature_fraction: 0,
            }
        );
        assert_eq!(harness.diag.contents(), b"Not connected T");
        assert_eq!(harness.asserted_lines(), (false, false, false));
    }

    #[tokio::test]
    async fn test_retry_succeeds_on_next_cycle() {
        let bus = FakeBus::with_registers((23, 5), (27, 0));
        bus.script_write_starts(&[false]);
        let harness = Harness::new(bus);
        let mut scanner = harness.scanner();
        scanner.step().await;
        scanner.step().await;
        assert_eq!(scanner.state(), ScanState::Idle);
        for _ in 0..4 {
            scanner.step().await;
        }
        assert_eq!(scanner.state(), ScanState::Idle);
        assert_eq!(
            harness.sample.get(),
            MeasurementSample {
                humidity_integer: 23,
                humidity_fraction: 5,
                temperature_integer: 27,
                temperature_fraction: 0,
            }
        );
        assert_eq!(harness.asserted_lines(), (true, false, false));
    }

    #[tokio::test]
    async fn test_transaction_shape() {
        let harness = Harness::new(FakeBus::with_registers((23, 5), (27, 0)));
        let mut scanner = harness.scanner();
        for _ in 0..4 {
            scanner.step().await;
        }
        let register_read = |register: u8| {
            [
                Op::Start(SENSOR_ADDRESS, Direction::Write),
                Op::Write(register),
                Op::Stop,
                Op::Start(SENSOR_ADDRESS, Direction::Read),
                Op::ReadAck,
                Op::ReadNack,
                Op::Stop,
            ]
        };
        let mut expected = Vec::new();
        expected.extend(register_read(HUMIDITY_REGISTER));
        expected.extend(register_read(TEMPERATURE_REGISTER));
        assert_eq!(harness.bus.ops(), expected);
    }

    #[tokio::test]
    async fn test_repeated_cycles_have_identical_shape() {
        let harness = Harness::new(FakeBus::with_registers((23, 5), (27, 0)));
        let mut scanner = harness.scanner();
        for _ in 0..4 {
            scanner.step().await;
        }
        let first_cycle = harness.bus.ops();
        for _ in 0..4 {
            scanner.step().await;
        }
        let both_cycles = harness.bus.ops();
        assert_eq!(both_cycles.len(), 2 * first_cycle.len());
        assert_eq!(&both_cycles[first_cycle.len()..], &first_cycle[..]);
    }
}
