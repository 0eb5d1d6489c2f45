//! The transmit enable output

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::error::DeviceError;

/// A single boolean output. Both operations are idempotent.
pub trait TransmitGate {
    fn assert_transmit(&mut self) -> Result<(), DeviceError>;
    fn deassert_transmit(&mut self) -> Result<(), DeviceError>;
}

impl<G: TransmitGate + ?Sized> TransmitGate for Box<G> {
    fn assert_transmit(&mut self) -> Result<(), DeviceError> {
        (**self).assert_transmit()
    }

    fn deassert_transmit(&mut self) -> Result<(), DeviceError> {
        (**self).deassert_transmit()
    }
}

/// Gate with no hardware behind it, only logs transitions
#[derive(Debug, Default)]
pub struct LogGate {
    enabled: bool,
    assertions: u64,
}

impl LogGate {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of off -> on transitions
    pub fn assertions(&self) -> u64 {
        self.assertions
    }
}

impl TransmitGate for LogGate {
    fn assert_transmit(&mut self) -> Result<(), DeviceError> {
        if !self.enabled {
            self.enabled = true;
            self.assertions += 1;
            info!("TX enabled");
        }
        Ok(())
    }

    fn deassert_transmit(&mut self) -> Result<(), DeviceError> {
        if self.enabled {
            self.enabled = false;
            info!("TX disabled");
        }
        Ok(())
    }
}

/// Drives a sysfs-style value file (e.g. `/sys/class/gpio/gpioN/value`)
/// by writing `1` or `0`. Redundant writes are skipped.
#[derive(Debug)]
pub struct FileGate {
    path: PathBuf,
    level: Option<bool>,
}

impl FileGate {
    /// Open the value file and drive it low
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let mut gate = Self {
            path: path.as_ref().to_owned(),
            level: None,
        };
        gate.drive(false)?;
        Ok(gate)
    }

    pub fn level(&self) -> Option<bool> {
        self.level
    }

    fn drive(&mut self, level: bool) -> Result<(), DeviceError> {
        if self.level == Some(level) {
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(false)
            .open(&self.path)?;
        file.write_all(if level { b"1\n" } else { b"0\n" })?;
        debug!(path = ?self.path, level, "Drove transmit gate");
        self.level = Some(level);
        Ok(())
    }
}

impl TransmitGate for FileGate {
    fn assert_transmit(&mut self) -> Result<(), DeviceError> {
        self.drive(true)
    }

    fn deassert_transmit(&mut self) -> Result<(), DeviceError> {
        self.drive(false)
    }
}
