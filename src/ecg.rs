//! # ECG Frame Decoding Module
//!
//! Unpacks the ECG characteristic payload into groups of 8 raw lead values.
//!
//! ## Wire Format
//! After a 4-byte reserved header the payload is a run of 3-byte chunks, each
//! carrying two 12-bit unsigned values. Writing the chunk as nibbles
//! `n0 n1 | n2 n3 | n4 n5`:
//! - first value  = `n3 n0 n1`
//! - second value = `n4 n5 n2`
//!
//! ## Carry-over
//! Lead groups do not line up with packet boundaries. Values that do not yet
//! fill a group stay queued for the next packet, and so do the bytes of a
//! trailing chunk cut short by the end of a packet.

use std::collections::VecDeque;

/// Reserved bytes between the sequence number and the packed lead data
pub const ECG_HEADER_LEN: usize = 4;

/// Bytes holding one pair of 12-bit values
const CHUNK_LEN: usize = 3;

/// Raw values per measurement: L1, L2, V1..V6
pub const LEADS_PER_GROUP: usize = 8;

/// One measurement of all raw leads, in wire order
pub type LeadGroup = [u16; LEADS_PER_GROUP];

#[derive(Debug, Default)]
pub struct EcgFrameDecoder {
    pending_leads: VecDeque<u16>,
    pending_bytes: Vec<u8>,
}

impl EcgFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one packet payload (sequence byte already removed).
    ///
    /// Returns every lead group completed by this payload, oldest first.
    pub fn decode(&mut self, payload: &[u8]) -> Vec<LeadGroup> {
        let Some(data) = payload.get(ECG_HEADER_LEN..) else {
            log::debug!("ECG payload shorter than header: {} bytes", payload.len());
            return Vec::new();
        };

        let mut bytes = std::mem::take(&mut self.pending_bytes);
        bytes.extend_from_slice(data);

        let mut chunks = bytes.chunks_exact(CHUNK_LEN);
        for chunk in &mut chunks {
            let (first, second) = unpack_chunk([chunk[0], chunk[1], chunk[2]]);
            self.pending_leads.push_back(first);
            self.pending_leads.push_back(second);
        }
        self.pending_bytes = chunks.remainder().to_vec();

        let mut groups = Vec::with_capacity(self.pending_leads.len() / LEADS_PER_GROUP);
        while self.pending_leads.len() >= LEADS_PER_GROUP {
            let mut group = [0u16; LEADS_PER_GROUP];
            for (slot, value) in group.iter_mut().zip(self.pending_leads.drain(..LEADS_PER_GROUP)) {
                *slot = value;
            }
            groups.push(group);
        }

        groups
    }

    /// Values waiting for the rest of their group
    pub fn pending_len(&self) -> usize {
        self.pending_leads.len()
    }
}

/// Split one 3-byte chunk into its two 12-bit values
fn unpack_chunk([b0, b1, b2]: [u8; 3]) -> (u16, u16) {
    let (b0, b1, b2) = (u16::from(b0), u16::from(b1), u16::from(b2));
    let first = ((b1 & 0x0F) << 8) | b0;
    let second = (b2 << 4) | (b1 >> 4);
    (first, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Inverse of `unpack_chunk`, only used to build fixtures
    fn pack_pair(first: u16, second: u16) -> [u8; 3] {
        [
            (first & 0xFF) as u8,
            (((second & 0x0F) << 4) | (first >> 8)) as u8,
            (second >> 4) as u8,
        ]
    }

    fn payload_for(values: &[u16]) -> Vec<u8> {
        let mut payload = vec![0xAA; ECG_HEADER_LEN];
        for pair in values.chunks(2) {
            payload.extend_from_slice(&pack_pair(pair[0], pair[1]));
        }
        payload
    }

    #[test]
    fn test_nibble_interleaving() {
        // nibbles n0..n5 = 1 2 3 4 5 6
        let (first, second) = unpack_chunk([0x12, 0x34, 0x56]);
        assert_eq!(first, 0x412);
        assert_eq!(second, 0x563);
    }

    #[test]
    fn test_full_scale_values() {
        assert_eq!(unpack_chunk([0xFF, 0xFF, 0xFF]), (0xFFF, 0xFFF));
        assert_eq!(unpack_chunk([0x00, 0x00, 0x00]), (0, 0));
    }

    #[test]
    fn test_header_is_skipped() {
        let mut decoder = EcgFrameDecoder::new();
        let mut payload = vec![0xFF, 0xFF, 0xFF, 0xFF];
        payload.extend_from_slice(&[0x12, 0x34, 0x56]);

        assert!(decoder.decode(&payload).is_empty());
        assert_eq!(decoder.pending_len(), 2);
    }

    #[test]
    fn test_exact_group_is_emitted() {
        let mut decoder = EcgFrameDecoder::new();
        let values: Vec<u16> = (1..=8).collect();

        let groups = decoder.decode(&payload_for(&values));
        assert_eq!(groups, vec![[1, 2, 3, 4, 5, 6, 7, 8]]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_carry_over_across_packets() {
        let values: Vec<u16> = (100..116).collect();

        // every even split of the 16 values between two packets
        for split in (0..=16).step_by(2) {
            let mut decoder = EcgFrameDecoder::new();
            let mut groups = decoder.decode(&payload_for(&values[..split]));
            groups.extend(decoder.decode(&payload_for(&values[split..])));

            assert_eq!(groups.len(), 2, "split at {}", split);
            let flat: Vec<u16> = groups.iter().flatten().copied().collect();
            assert_eq!(flat, values, "split at {}", split);
            assert_eq!(decoder.pending_len(), 0);
        }
    }

    #[test]
    fn test_partial_chunk_is_carried() {
        let values: Vec<u16> = (0..16).map(|v| v * 200 + 7).collect();
        let whole = payload_for(&values);
        let data = &whole[ECG_HEADER_LEN..];

        for cut in 0..=data.len() {
            let mut first = vec![0u8; ECG_HEADER_LEN];
            first.extend_from_slice(&data[..cut]);
            let mut second = vec![0u8; ECG_HEADER_LEN];
            second.extend_from_slice(&data[cut..]);

            let mut decoder = EcgFrameDecoder::new();
            let mut groups = decoder.decode(&first);
            groups.extend(decoder.decode(&second));

            let flat: Vec<u16> = groups.iter().flatten().copied().collect();
            assert_eq!(flat, values, "cut at byte {}", cut);
        }
    }

    #[test]
    fn test_queue_stays_below_group_size() {
        let mut decoder = EcgFrameDecoder::new();
        let values: Vec<u16> = (0..30).collect();

        for window in values.chunks(6) {
            decoder.decode(&payload_for(window));
            assert!(decoder.pending_len() < LEADS_PER_GROUP);
        }
    }

    #[test]
    fn test_short_payload_is_ignored() {
        let mut decoder = EcgFrameDecoder::new();
        assert!(decoder.decode(&[1, 2]).is_empty());
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_pending_completes_on_next_packet() {
        let mut decoder = EcgFrameDecoder::new();
        decoder.decode(&payload_for(&[1, 2, 3, 4]));
        assert_eq!(decoder.pending_len(), 4);

        let groups = decoder.decode(&payload_for(&[5, 6, 7, 8]));
        assert_eq!(groups, vec![[1, 2, 3, 4, 5, 6, 7, 8]]);
        assert_eq!(decoder.pending_len(), 0);
    }
}
