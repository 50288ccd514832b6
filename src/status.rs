//! Device-level values that annotate ECG samples but arrive on their own
//! characteristics: battery level and the device's QRS estimate.
//!
//! Written by the battery/features feed, read by the ECG worker for every
//! sample it stamps.

use crate::sample::EcgMetadata;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

/// QRS annotation reported by the device
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QrsEstimate {
    pub avg_qrs: u32,
    pub avg_qrs_ms: f64,
    pub is_qrs: bool,
}

#[derive(Debug, Default)]
pub struct DeviceStatus {
    battery: AtomicU8,
    qrs: Mutex<QrsEstimate>,
}

impl DeviceStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_battery(&self, percent: u8) {
        self.battery.store(percent, Ordering::Relaxed);
        log::info!("Battery: {}", percent);
    }

    /// Apply a battery characteristic notification; its first byte is the level
    pub fn apply_battery_notification(&self, data: &[u8]) {
        match data.first() {
            Some(&percent) => self.set_battery(percent),
            None => log::warn!("Ignoring empty battery notification"),
        }
    }

    pub fn battery(&self) -> u8 {
        self.battery.load(Ordering::Relaxed)
    }

    pub fn set_qrs(&self, estimate: QrsEstimate) {
        match self.qrs.lock() {
            Ok(mut qrs) => *qrs = estimate,
            Err(poisoned) => *poisoned.into_inner() = estimate,
        }
    }

    /// Metadata attached to the next ECG sample
    pub fn metadata(&self) -> EcgMetadata {
        let qrs = match self.qrs.lock() {
            Ok(qrs) => *qrs,
            Err(poisoned) => *poisoned.into_inner(),
        };

        EcgMetadata {
            avg_qrs: qrs.avg_qrs,
            avg_qrs_ms: qrs.avg_qrs_ms,
            is_qrs: qrs.is_qrs,
            battery: self.battery(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_zero() {
        let status = DeviceStatus::new();
        assert_eq!(status.metadata(), EcgMetadata::default());
    }

    #[test]
    fn test_battery_notification_uses_first_byte() {
        let status = DeviceStatus::new();
        status.apply_battery_notification(&[76, 1, 2]);
        assert_eq!(status.battery(), 76);

        status.apply_battery_notification(&[]);
        assert_eq!(status.battery(), 76);
    }

    #[test]
    fn test_metadata_combines_values() {
        let status = DeviceStatus::new();
        status.set_battery(55);
        status.set_qrs(QrsEstimate {
            avg_qrs: 48,
            avg_qrs_ms: 96.0,
            is_qrs: true,
        });

        let meta = status.metadata();
        assert_eq!(meta.battery, 55);
        assert_eq!(meta.avg_qrs, 48);
        assert_eq!(meta.avg_qrs_ms, 96.0);
        assert!(meta.is_qrs);
    }
}
