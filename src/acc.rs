//! # Motion Frame Decoding Module
//!
//! Splits one accelerometer characteristic notification into the 19
//! physical samples it multiplexes and converts register values to units.
//!
//! ## Wire Format
//! The notification header is 5 bytes: the sequence number (already removed
//! by `Packet::parse`) plus 4 reserved bytes. Then 19 sub-frames of 12 bytes,
//! each holding six big-endian `(msb, lsb)` register pairs:
//! accelX, accelY, accelZ, gyroX, gyroY, gyroZ.
//!
//! ## Scaling
//! - Accelerometer at ±2 g full scale: 0.061 mg per LSB
//! - Gyroscope at ±250 dps full scale: 8.75 mdps per LSB
//!
//! Both are reported in g / dps rounded to two decimals. Rounding is applied
//! to the scaled value times 100 and ties go away from zero, so a gyro
//! register of 12 (0.105 dps) reads 0.11, not the banker's 0.1.

/// Reserved bytes after the sequence number
pub const ACC_HEADER_LEN: usize = 4;

pub const SUB_FRAMES_PER_PACKET: usize = 19;

const SUB_FRAME_LEN: usize = 12;

pub const AXES_PER_SAMPLE: usize = 6;

pub const AXIS_NAMES: [&str; AXES_PER_SAMPLE] =
    ["accelX", "accelY", "accelZ", "gyroX", "gyroY", "gyroZ"];

const ACCEL_MG_PER_LSB: f64 = 0.061;
const GYRO_MDPS_PER_LSB: f64 = 8.75;

/// One sub-frame in physical units, in `AXIS_NAMES` order
pub type MotionValues = [f64; AXES_PER_SAMPLE];

#[derive(Debug, Default, Clone, Copy)]
pub struct AccFrameDecoder;

impl AccFrameDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode one packet payload (sequence byte already removed).
    ///
    /// Yields one entry per complete sub-frame present, at most 19.
    pub fn decode(&self, payload: &[u8]) -> Vec<MotionValues> {
        let data = payload.get(ACC_HEADER_LEN..).unwrap_or_default();

        let available = data.len() / SUB_FRAME_LEN;
        if available < SUB_FRAMES_PER_PACKET {
            log::debug!(
                "Motion payload carries {} of {} sub-frames ({} bytes)",
                available,
                SUB_FRAMES_PER_PACKET,
                payload.len()
            );
        }

        data.chunks_exact(SUB_FRAME_LEN)
            .take(SUB_FRAMES_PER_PACKET)
            .map(decode_sub_frame)
            .collect()
    }
}

fn decode_sub_frame(frame: &[u8]) -> MotionValues {
    let mut values = [0.0; AXES_PER_SAMPLE];
    for (axis, (value, pair)) in values.iter_mut().zip(frame.chunks_exact(2)).enumerate() {
        let raw = f64::from(u16::from_be_bytes([pair[0], pair[1]]));
        *value = if axis < 3 {
            round2(raw * ACCEL_MG_PER_LSB / 1000.0)
        } else {
            round2(raw * GYRO_MDPS_PER_LSB / 1000.0)
        };
    }
    values
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_with(frames: &[[u8; SUB_FRAME_LEN]]) -> Vec<u8> {
        let mut payload = vec![0u8; ACC_HEADER_LEN];
        for frame in frames {
            payload.extend_from_slice(frame);
        }
        payload
    }

    #[test]
    fn test_unit_conversion_fixture() {
        let frame = [1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0];
        let values = decode_sub_frame(&frame);

        assert_eq!(&values[..3], &[0.02, 0.02, 0.02]);
        assert_eq!(&values[3..], &[2.24, 2.24, 2.24]);
    }

    #[test]
    fn test_axis_order() {
        let frame = [0, 0, 0x10, 0, 0, 0, 0, 0, 0, 0, 0x01, 0x90];
        let values = decode_sub_frame(&frame);

        // 4096 * 0.061 / 1000 = 0.249856
        assert_eq!(values, [0.0, 0.25, 0.0, 0.0, 0.0, 3.5]);
    }

    #[test]
    fn test_half_hundredths_round_away_from_zero() {
        // 12, 36, 60 * 8.75 / 1000 land exactly on a half hundredth
        let frame = [0, 0, 0, 0, 0, 0, 0, 12, 0, 36, 0, 60];
        let values = decode_sub_frame(&frame);
        assert_eq!(&values[3..], &[0.11, 0.32, 0.53]);
    }

    #[test]
    fn test_full_packet_yields_nineteen() {
        let frames = [[0u8; SUB_FRAME_LEN]; SUB_FRAMES_PER_PACKET];
        let decoded = AccFrameDecoder::new().decode(&payload_with(&frames));
        assert_eq!(decoded.len(), SUB_FRAMES_PER_PACKET);
    }

    #[test]
    fn test_sub_frames_keep_packet_order() {
        let mut frames = [[0u8; SUB_FRAME_LEN]; SUB_FRAMES_PER_PACKET];
        for (i, frame) in frames.iter_mut().enumerate() {
            frame[6] = i as u8;
        }

        let decoded = AccFrameDecoder::new().decode(&payload_with(&frames));
        for (i, values) in decoded.iter().enumerate() {
            assert_eq!(values[3], round2(i as f64 * 256.0 * 8.75 / 1000.0));
        }
    }

    #[test]
    fn test_undersized_payload() {
        let frames = [[1u8; SUB_FRAME_LEN]; 3];
        let mut payload = payload_with(&frames);
        payload.extend_from_slice(&[1, 2, 3, 4, 5]);

        assert_eq!(AccFrameDecoder::new().decode(&payload).len(), 3);
        assert!(AccFrameDecoder::new().decode(&[0, 0]).is_empty());
    }

    #[test]
    fn test_oversized_payload_is_capped() {
        let frames = [[0u8; SUB_FRAME_LEN]; SUB_FRAMES_PER_PACKET + 2];
        let decoded = AccFrameDecoder::new().decode(&payload_with(&frames));
        assert_eq!(decoded.len(), SUB_FRAMES_PER_PACKET);
    }
}
