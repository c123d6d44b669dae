use embassy_time::Ticker;
use embedded_io_async::Write;
use heapless::format;

use crate::sample::SharedSample;
use crate::scanner::POLL_PERIOD;

pub struct Runner<'a, Stream: Write> {
    stream: Stream,
    sample: &'a SharedSample,
}

pub fn new<'a, Stream: Write>(stream: Stream, sample: &'a SharedSample) -> Runner<'a, Stream> {
    Runner { stream, sample }
}

impl<Stream: Write> Runner<'_, Stream> {
    /// Emits the latest values once per poll period. The values cannot
    /// change faster than that, so a tighter cadence would only flood the
    /// transport with duplicates.
    pub async fn run(mut self) {
        let mut ticker = Ticker::every(POLL_PERIOD);
        loop {
            ticker.next().await;
            self.report_once().await;
        }
    }

    async fn report_once(&mut self) {
        let sample = self.sample.get();
        self.emit("\r\n---Humidity values---:\r\n").await;
        self.emit_value(sample.humidity_integer, sample.humidity_fraction).await;
        self.emit("\r\n---Temperature values---:\r\n").await;
        self.emit_value(sample.temperature_integer, sample.temperature_fraction).await;
    }

    async fn emit_value(&mut self, integer: u8, fraction: u8) {
        match format!(8; "{}.{}", integer, fraction) {
            Ok(text) => self.emit(&text).await,
            Err(_) => error!("value formatting failed"),
        }
    }

    async fn emit(&mut self, text: &str) {
        if self.stream.write_all(text.as_bytes()).await.is_err() {
            warn!("report write failed");
        }
    }
}
