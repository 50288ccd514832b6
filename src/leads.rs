//! Derivation of the 12 clinical ECG channels from the 8 measured leads.
//!
//! The limb leads I and II are measured directly, III and the augmented
//! leads follow from Einthoven's relations, and the six precordial leads
//! pass through.

use crate::ecg::LeadGroup;

pub const CHANNEL_COUNT: usize = 12;

/// Output order of the derived channels
pub const CHANNEL_NAMES: [&str; CHANNEL_COUNT] = [
    "I", "II", "III", "aVR", "aVL", "aVF", "V1", "V2", "V3", "V4", "V5", "V6",
];

pub type Channels = [f64; CHANNEL_COUNT];

pub fn map_leads(leads: &LeadGroup) -> Channels {
    let l1 = f64::from(leads[0]);
    let l2 = f64::from(leads[1]);
    let l3 = l2 - l1;

    let mut channels = [0.0; CHANNEL_COUNT];
    channels[0] = l1;
    channels[1] = l2;
    channels[2] = l3;
    channels[3] = -(l1 + l2) / 2.0;
    channels[4] = l1 - l2 / 2.0;
    channels[5] = l3 + l1 / 2.0;
    for (channel, &lead) in channels[6..].iter_mut().zip(&leads[2..]) {
        *channel = f64::from(lead);
    }

    channels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_limb_derivation() {
        let channels = map_leads(&[100, 50, 0, 0, 0, 0, 0, 0]);

        assert!(close(channels[0], 100.0));
        assert!(close(channels[1], 50.0));
        assert!(close(channels[2], -50.0));
        assert!(close(channels[3], -75.0));
        assert!(close(channels[4], 75.0));
        assert!(close(channels[5], 0.0));
    }

    #[test]
    fn test_precordial_pass_through() {
        let channels = map_leads(&[0, 0, 1, 2, 3, 4, 5, 4095]);
        assert_eq!(&channels[6..], &[1.0, 2.0, 3.0, 4.0, 5.0, 4095.0]);
    }

    #[test]
    fn test_half_values_are_kept() {
        let channels = map_leads(&[3, 1, 0, 0, 0, 0, 0, 0]);
        assert!(close(channels[3], -2.0));
        assert!(close(channels[4], 2.5));
        assert!(close(channels[5], -0.5));
    }

    #[test]
    fn test_channel_names_align() {
        assert_eq!(CHANNEL_NAMES.len(), CHANNEL_COUNT);
        assert_eq!(CHANNEL_NAMES[3], "aVR");
        assert_eq!(CHANNEL_NAMES[11], "V6");
    }
}
