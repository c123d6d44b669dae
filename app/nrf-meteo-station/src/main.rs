#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_nrf::{
    bind_interrupts,
    buffered_uarte::{self, BufferedUarte},
    gpio::{Flex, Level, Output, OutputDrive},
    peripherals, uarte,
};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use meteo_core::indicator::IndicatorLeds;
use meteo_core::io::SharedWriter;
use meteo_core::sample::SharedSample;
use {defmt_rtt as _, panic_probe as _};

mod twi;

bind_interrupts!(struct Irqs {
    UARTE0 => buffered_uarte::InterruptHandler<peripherals::UARTE0>;
});

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());

    let cold = Output::new(p.P0_13, Level::Low, OutputDrive::Standard);
    let warm = Output::new(p.P0_14, Level::Low, OutputDrive::Standard);
    let hot = Output::new(p.P0_15, Level::Low, OutputDrive::Standard);

    let mut uart_config = uarte::Config::default();
    uart_config.parity = uarte::Parity::EXCLUDED;
    uart_config.baudrate = uarte::Baudrate::BAUD9600;
    let mut uart_tx_buffer = [0u8; 256];
    let mut uart_rx_buffer = [0u8; 16];
    let uart = BufferedUarte::new(
        p.UARTE0,
        p.TIMER0,
        p.PPI_CH0,
        p.PPI_CH1,
        p.PPI_GROUP0,
        p.P0_08,
        p.P0_06,
        Irqs,
        uart_config,
        &mut uart_rx_buffer,
        &mut uart_tx_buffer,
    );
    let uart = Mutex::<NoopRawMutex, _>::new(uart);

    let bus = twi::BitBangMaster::new(Flex::new(p.P0_26), Flex::new(p.P0_27));
    let leds = IndicatorLeds::new(cold, warm, hot);
    let sample = SharedSample::new();

    let scanner = meteo_core::scanner::new(bus, leds, SharedWriter::new(&uart), &sample);
    let reporter = meteo_core::reporter::new(SharedWriter::new(&uart), &sample);

    info!("meteo station up");
    join(scanner.run(), reporter.run()).await;
}
