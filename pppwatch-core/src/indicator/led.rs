//! Sysfs LED access
//!
//! Keyboard LEDs show up as `/sys/class/leds/input<N>::capslock` and
//! friends. A logical name is mapped to the LED function suffix and resolved
//! to one directory when the device is opened, so a missing or wrong device
//! stops the program at startup instead of in the middle of a recovery.

use crate::error::DeviceError;
use crate::indicator::Light;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default sysfs LED class directory
pub const SYSFS_LEDS: &str = "/sys/class/leds";

/// Map a logical light name to the LED function suffix
pub fn led_function(logical: &str) -> String {
    let normalized: String = logical
        .trim()
        .to_ascii_lowercase()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .collect();
    match normalized.as_str() {
        "caps" | "capslock" | "capslockindicator" => "capslock".to_string(),
        "num" | "numlock" | "numlockindicator" => "numlock".to_string(),
        "scroll" | "scrolllock" | "scrolllockindicator" => "scrolllock".to_string(),
        _ => logical.trim().to_string(),
    }
}

/// Resolve a light name to an LED directory under `root`
///
/// Accepts an absolute directory path, an exact LED directory name
/// (`input3::capslock`), or a logical name matched against the function
/// suffix of every LED. When several keyboards expose the same function the
/// lexically first one wins.
pub fn resolve(root: &Path, name: &str) -> Result<PathBuf, DeviceError> {
    if name.starts_with('/') {
        return Ok(PathBuf::from(name));
    }
    if name.contains(':') {
        return Ok(root.join(name));
    }

    let suffix = format!(":{}", led_function(name));
    let entries = fs::read_dir(root).map_err(|e| DeviceError::Access {
        path: root.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut candidates: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|led| led.ends_with(&suffix))
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .map(|led| root.join(led))
        .ok_or_else(|| DeviceError::NotFound {
            name: name.to_string(),
        })
}

/// A sysfs LED driven at full or zero brightness
#[derive(Debug)]
pub struct LedDevice {
    path: PathBuf,
    max_brightness: u32,
}

impl LedDevice {
    /// Open a light by name under `/sys/class/leds`
    pub fn open(name: &str) -> Result<Self, DeviceError> {
        Self::open_in(Path::new(SYSFS_LEDS), name)
    }

    /// Open a light by name under an arbitrary LED class directory
    pub fn open_in(root: &Path, name: &str) -> Result<Self, DeviceError> {
        let path = resolve(root, name)?;
        Self::open_path(path)
    }

    /// Open an LED directory, reading its maximum brightness
    pub fn open_path(path: PathBuf) -> Result<Self, DeviceError> {
        if !path.exists() {
            return Err(DeviceError::NotFound {
                name: path.display().to_string(),
            });
        }

        let max_path = path.join("max_brightness");
        if !path.join("brightness").is_file() || !max_path.is_file() {
            return Err(DeviceError::NotAnLed {
                path: path.display().to_string(),
            });
        }

        let raw = fs::read_to_string(&max_path).map_err(|e| DeviceError::Access {
            path: max_path.display().to_string(),
            reason: e.to_string(),
        })?;
        let max_brightness = raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|max| *max > 0)
            .ok_or_else(|| DeviceError::InvalidBrightness {
                path: max_path.display().to_string(),
                value: raw.trim().to_string(),
            })?;

        debug!(path = %path.display(), max_brightness, "Opened status LED");
        Ok(Self {
            path,
            max_brightness,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_brightness(&self) -> u32 {
        self.max_brightness
    }

    fn set_brightness(&self, value: u32) -> io::Result<()> {
        fs::write(self.path.join("brightness"), value.to_string())
    }
}

impl Light for LedDevice {
    fn on(&mut self) -> io::Result<()> {
        self.set_brightness(self.max_brightness)
    }

    fn off(&mut self) -> io::Result<()> {
        self.set_brightness(0)
    }
}
