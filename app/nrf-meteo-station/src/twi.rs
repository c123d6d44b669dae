//! Bit-banged two-wire master on two wired-and lines.
//!
//! Both pins stay in input+output mode with `Standard0Disconnect1` drive:
//! writing low drives the line, writing high disconnects the driver and the
//! pull-up raises it, and the input buffer stays readable throughout. Clock
//! stretching is not supported; the DHT12 never stretches.

use embassy_nrf::gpio::{Flex, OutputDrive, Pull};
use embassy_time::{Duration, Timer};
use meteo_core::bus::{Direction, TwiBus, TwiError, address_byte};

// Half-period of the clock, ~100 kHz.
const BIT_DELAY: Duration = Duration::from_micros(5);

pub struct BitBangMaster<'d> {
    sda: Flex<'d>,
    scl: Flex<'d>,
}

impl<'d> BitBangMaster<'d> {
    pub fn new(mut sda: Flex<'d>, mut scl: Flex<'d>) -> Self {
        sda.set_high();
        scl.set_high();
        sda.set_as_input_output(Pull::Up, OutputDrive::Standard0Disconnect1);
        scl.set_as_input_output(Pull::Up, OutputDrive::Standard0Disconnect1);
        Self { sda, scl }
    }

    async fn delay(&self) {
        Timer::after(BIT_DELAY).await;
    }

    async fn start_condition(&mut self) {
        // Also recovers a line still held low after an aborted transfer.
        self.sda.set_high();
        self.scl.set_high();
        self.delay().await;
        self.sda.set_low();
        self.delay().await;
        self.scl.set_low();
        self.delay().await;
    }

    async fn stop_condition(&mut self) {
        self.sda.set_low();
        self.delay().await;
        self.scl.set_high();
        self.delay().await;
        self.sda.set_high();
        self.delay().await;
    }

    async fn write_bit(&mut self, bit: bool) {
        if bit {
            self.sda.set_high();
        } else {
            self.sda.set_low();
        }
        self.delay().await;
        self.scl.set_high();
        self.delay().await;
        self.scl.set_low();
    }

    async fn read_bit(&mut self) -> bool {
        self.sda.set_high();
        self.delay().await;
        self.scl.set_high();
        self.delay().await;
        let bit = self.sda.is_high();
        self.scl.set_low();
        bit
    }

    /// Shifts a byte out MSB-first and samples the acknowledge bit.
    async fn write_byte(&mut self, byte: u8) -> bool {
        for shift in (0..8).rev() {
            self.write_bit(byte & (1 << shift) != 0).await;
        }
        !self.read_bit().await
    }

    async fn read_byte(&mut self, acknowledge: bool) -> u8 {
        let mut byte = 0;
        for _ in 0..8 {
            byte = (byte << 1) | self.read_bit().await as u8;
        }
        self.write_bit(!acknowledge).await;
        byte
    }
}

impl TwiBus for BitBangMaster<'_> {
    async fn start(&mut self, address: u8, direction: Direction) -> Result<(), TwiError> {
        self.start_condition().await;
        if self.write_byte(address_byte(address, direction)).await {
            Ok(())
        } else {
            Err(TwiError::NoAcknowledge)
        }
    }

    async fn write(&mut self, byte: u8) -> Result<(), TwiError> {
        if self.write_byte(byte).await {
            Ok(())
        } else {
            Err(TwiError::NoAcknowledge)
        }
    }

    async fn read_ack(&mut self) -> u8 {
        self.read_byte(true).await
    }

    async fn read_nack(&mut self) -> u8 {
        self.read_byte(false).await
    }

    async fn stop(&mut self) {
        self.stop_condition().await;
    }
}
