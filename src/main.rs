//! Daikin air conditioner simulator for S21 protocol testing.

use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use embedded_hal::serial;
use log::{error, info, LevelFilter};
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};

use daikin_s21::protocol::types::{Fan, HalfDegreesC, Mode, ModelCode, Settings, TenthDegreesC};
use daikin_s21::unit::{Sensors, UnitConfig, UnitState};
use daikin_s21::S21Device;

const BAUD_RATE: u32 = 2400;
const SETTLE_TIME: Duration = Duration::from_millis(100);
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Exit status when the serial line cannot be opened or fails.
const EXIT_CHANNEL: u8 = 255;
const EXIT_CONFIG: u8 = 1;

#[derive(Parser, Debug)]
#[command(name = "s21-sim", version, about = "Daikin conditioner simulator for S21 protocol testing")]
struct Args {
    /// Serial port, e.g. /dev/ttyUSB0
    #[arg(short, long)]
    port: String,

    /// Trace commands and replies
    #[arg(short = 'v', long)]
    debug: bool,

    /// Hex dump raw traffic
    #[arg(short = 'V', long)]
    dump: bool,

    /// Power on
    #[arg(long)]
    on: bool,

    /// Mode: 0=F, 1=H, 2=C, 3=A, 7=D
    #[arg(long, default_value = "3")]
    mode: Mode,

    /// Fan: 0 = auto, 1-5 = set speed, 6 = quiet
    #[arg(long, default_value = "3")]
    fan: Fan,

    /// Set point, C
    #[arg(long, default_value = "22.5", allow_negative_numbers = true)]
    temp: HalfDegreesC,

    /// Swing direction
    #[arg(long, default_value_t = 0)]
    swing: u8,

    /// Powerful mode
    #[arg(long)]
    powerful: bool,

    /// Eco mode
    #[arg(long)]
    eco: bool,

    /// Home temperature, tenths of C
    #[arg(long, default_value_t = 245, allow_negative_numbers = true)]
    home: i16,

    /// Outside temperature, tenths of C
    #[arg(long, default_value_t = 205, allow_negative_numbers = true)]
    outside: i16,

    /// Inlet temperature, tenths of C
    #[arg(long, default_value_t = 185, allow_negative_numbers = true)]
    inlet: i16,

    /// Fan rpm, divided by 10
    #[arg(long, default_value_t = 52)]
    fanrpm: u16,

    /// Compressor rpm
    #[arg(long, default_value_t = 42)]
    comprpm: u16,

    /// Reported protocol version
    #[arg(long, default_value_t = 2)]
    protocol: u8,

    /// Reported model code, 4 characters
    #[arg(long, default_value = "135D")]
    model: ModelCode,
}

impl Args {
    fn unit_config(&self) -> UnitConfig {
        UnitConfig {
            settings: Settings {
                power: self.on,
                mode: self.mode,
                target: self.temp,
                fan: self.fan,
            },
            swing: self.swing,
            powerful: self.powerful,
            eco: self.eco,
            sensors: Sensors {
                home: TenthDegreesC(self.home),
                outside: TenthDegreesC(self.outside),
                inlet: TenthDegreesC(self.inlet),
                fan_rpm: self.fanrpm,
                compressor_rpm: self.comprpm,
            },
            protocol: self.protocol,
            model: self.model,
        }
    }

    fn log_level(&self) -> LevelFilter {
        if self.dump {
            LevelFilter::Trace
        } else if self.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

/// Host serial port seen through the embedded-hal serial traits.
///
/// Reads are buffered; the protocol engine still sees one byte at a time.
/// A read timeout is reported as `WouldBlock`, so a blocking read simply keeps
/// waiting. End of file means the line is gone.
struct SerialChannel<P = Box<dyn SerialPort>> {
    port: P,
    buf: [u8; 64],
    pos: usize,
    len: usize,
}

impl SerialChannel {
    fn open(path: &str) -> Result<Self> {
        let port = serialport::new(path, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::Even)
            .stop_bits(StopBits::Two)
            .timeout(READ_TIMEOUT)
            .open()
            .with_context(|| format!("Cannot open {}", path))?;

        thread::sleep(SETTLE_TIME);
        port.clear(ClearBuffer::All)
            .with_context(|| format!("Cannot flush {}", path))?;

        Ok(Self::new(port))
    }
}

impl<P> SerialChannel<P> {
    fn new(port: P) -> Self {
        Self { port, buf: [0; 64], pos: 0, len: 0 }
    }
}

impl<P: Read> serial::Read<u8> for SerialChannel<P> {
    type Error = io::Error;

    fn read(&mut self) -> nb::Result<u8, io::Error> {
        if self.pos == self.len {
            self.pos = 0;
            self.len = 0;
            match self.port.read(&mut self.buf) {
                Ok(0) => return Err(nb::Error::Other(io::ErrorKind::UnexpectedEof.into())),
                Ok(n) => self.len = n,
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {
                    return Err(nb::Error::WouldBlock)
                }
                Err(e) => return Err(nb::Error::Other(e)),
            }
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(byte)
    }
}

impl<P: Write> serial::Write<u8> for SerialChannel<P> {
    type Error = io::Error;

    fn write(&mut self, word: u8) -> nb::Result<(), io::Error> {
        self.port.write_all(&[word]).map_err(nb::Error::Other)
    }

    fn flush(&mut self) -> nb::Result<(), io::Error> {
        self.port.flush().map_err(nb::Error::Other)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let unit = match UnitState::new(args.unit_config()) {
        Ok(unit) => unit,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let channel = match SerialChannel::open(&args.port) {
        Ok(channel) => channel,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CHANNEL);
        }
    };

    info!(
        "Simulating model {} (protocol {}) on {}",
        unit.model(),
        unit.protocol(),
        args.port
    );

    let mut device = S21Device::new(channel, unit);
    match device.run() {
        Ok(never) => match never {},
        Err(e) => {
            error!("{}", e);
            ExitCode::from(EXIT_CHANNEL)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daikin_s21::ChannelError;
    use embedded_hal::serial::Read as _;

    /// Port that hands out scripted read results, then reports end of file.
    struct ScriptedPort {
        reads: std::vec::IntoIter<io::Result<Vec<u8>>>,
        written: Vec<u8>,
    }

    impl ScriptedPort {
        fn new(reads: Vec<io::Result<Vec<u8>>>) -> Self {
            Self { reads: reads.into_iter(), written: Vec::new() }
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.next() {
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn timeout_is_would_block_test() {
        let mut channel = SerialChannel::new(ScriptedPort::new(vec![
            Err(io::ErrorKind::TimedOut.into()),
            Ok(vec![0x06]),
        ]));
        assert!(matches!(channel.read(), Err(nb::Error::WouldBlock)));
        assert_eq!(channel.read().ok(), Some(0x06));
    }

    #[test]
    fn end_of_file_is_fatal_test() {
        let mut channel = SerialChannel::new(ScriptedPort::new(vec![Ok(vec![0x15])]));
        assert_eq!(channel.read().ok(), Some(0x15));
        assert!(matches!(
            channel.read(),
            Err(nb::Error::Other(e)) if e.kind() == io::ErrorKind::UnexpectedEof
        ));
    }

    #[test]
    fn closed_line_ends_the_run_test() {
        // F1 query, then the line hangs up
        let port = ScriptedPort::new(vec![Ok(vec![0x02, 0x46, 0x31, 0x77, 0x03, 0x06])]);
        let unit = UnitState::new(UnitConfig::default()).unwrap();
        let mut device = S21Device::new(SerialChannel::new(port), unit);

        match device.run() {
            Err(ChannelError::Read(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            Err(e) => panic!("unexpected channel error {}", e),
            Ok(never) => match never {},
        }
        let (channel, _) = device.release();
        assert_eq!(channel.port.written.first(), Some(&0x06));
    }
}
