use std::io;
use std::net::UdpSocket;

use crate::tracker::PassReport;

/// Where per-satellite pass reports go at the end of every tick.
pub trait PassSink {
    fn report(&mut self, satellite: &str, report: &PassReport);
}

/// Emits the one-line pass summary for every satellite.
pub struct LogSink;

impl PassSink for LogSink {
    fn report(&mut self, satellite: &str, report: &PassReport) {
        report.log(satellite);
    }
}

/// Prints the pass summary and a down-sampled time table to stdout.
pub struct PrintSink;

impl PassSink for PrintSink {
    fn report(&mut self, satellite: &str, report: &PassReport) {
        match report {
            PassReport::Overhead {
                elevation_deg,
                frequency_hz,
                ..
            } => println!(
                "{satellite}: overhead, elevation {elevation_deg:.2} deg, downlink {frequency_hz} Hz"
            ),
            PassReport::Upcoming {
                aos,
                max_elevation_deg,
                duration,
                ..
            } => println!(
                "{satellite}: next pass at {} UTC, max elevation {max_elevation_deg:.2} deg, duration {}s",
                aos.format("%H:%M:%S %d/%m/%Y"),
                duration.num_seconds()
            ),
        }
        println!("{}", report.time_table().table_mini());
    }
}

/// Forwards the Doppler-corrected downlink frequency of overhead satellites
/// to a downstream receiver as `<name>:frequency:<hz>` datagrams.
pub struct UdpFrequencySink {
    socket: UdpSocket,
    target: String,
}

impl UdpFrequencySink {
    pub fn new(target: impl Into<String>) -> io::Result<Self> {
        Ok(Self {
            socket: UdpSocket::bind("0.0.0.0:0")?,
            target: target.into(),
        })
    }
}

impl PassSink for UdpFrequencySink {
    fn report(&mut self, satellite: &str, report: &PassReport) {
        if let PassReport::Overhead { frequency_hz, .. } = report {
            let message = format!("{satellite}:frequency:{frequency_hz}");
            if let Err(e) = self.socket.send_to(message.as_bytes(), &self.target) {
                log::warn!("frequency forward to {} failed: {}", self.target, e);
            }
        }
    }
}
