// Encoder aggregation over the co-processor serial link
//
// Packet format: [0x80, enc1 (i32 LE), enc2 (i32 LE), ..., encN (i32 LE)]
// The co-processor streams packets continuously with no other framing, so the
// reader locates packet boundaries by the sync marker and keeps only the newest
// complete packet.

use tracing::{debug, warn};

use crate::config::SYNC_MARKER;
use crate::error::Result;
use crate::hardware::SerialLink;

/// Bytes per encoder value
pub const ENCODER_WORD_SIZE: usize = 4;

/// Packet length for `count` encoders
pub fn packet_len(count: usize) -> usize {
    1 + count * ENCODER_WORD_SIZE
}

/// Decode one aligned packet into tick counts
pub fn decode_packet(packet: &[u8], count: usize) -> Option<Vec<i32>> {
    if packet.len() != packet_len(count) || packet[0] != SYNC_MARKER {
        return None;
    }

    Some(
        packet[1..]
            .chunks_exact(ENCODER_WORD_SIZE)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

/// Latest tick count for each encoder on the co-processor
#[derive(Debug, Clone)]
pub struct EncoderAggregator {
    ticks: Vec<i32>,
    ppr: i32,
    // Bytes read but not yet part of a complete packet
    pending: Vec<u8>,
}

impl EncoderAggregator {
    pub fn new(count: usize, ppr: i32) -> Self {
        Self {
            ticks: vec![0; count],
            ppr,
            pending: Vec::with_capacity(packet_len(count)),
        }
    }

    /// Change encoder count and resolution; all values go back to zero
    pub fn configure(&mut self, count: usize, ppr: i32) {
        self.ticks = vec![0; count];
        self.ppr = ppr;
        self.pending.clear();
    }

    pub fn count(&self) -> usize {
        self.ticks.len()
    }

    pub fn ppr(&self) -> i32 {
        self.ppr
    }

    /// Raw tick counts, in encoder order
    pub fn ticks(&self) -> &[i32] {
        &self.ticks
    }

    /// Drain the link and decode the newest complete packet
    ///
    /// Returns `Ok(true)` when the table was updated. Fewer than one packet's
    /// worth of bytes leaves the link untouched; misaligned leading bytes are
    /// dropped until a sync marker is found and older packets in the backlog are
    /// discarded.
    pub fn poll<S: SerialLink + ?Sized>(&mut self, link: &mut S) -> Result<bool> {
        let packet_len = packet_len(self.count());
        let available = link.bytes_available()?;
        if self.pending.len() + available < packet_len {
            return Ok(false);
        }

        let mut chunk = vec![0u8; available];
        let mut filled = 0;
        while filled < available {
            let n = match link.read_bytes(&mut chunk[filled..]) {
                Ok(n) => n,
                Err(e) => {
                    // The carried tail no longer lines up with what the link delivers next
                    self.pending.clear();
                    return Err(e);
                }
            };
            if n == 0 {
                break;
            }
            filled += n;
        }
        self.pending.extend_from_slice(&chunk[..filled]);

        let mut latest = None;
        let mut packets = 0usize;
        loop {
            let skip = self
                .pending
                .iter()
                .position(|&b| b == SYNC_MARKER)
                .unwrap_or(self.pending.len());
            if skip > 0 {
                warn!("Discarding {} misaligned encoder bytes", skip);
                self.pending.drain(..skip);
            }
            if self.pending.len() < packet_len {
                break;
            }
            latest = Some(self.pending.drain(..packet_len).collect::<Vec<u8>>());
            packets += 1;
        }

        let Some(packet) = latest else {
            return Ok(false);
        };
        if packets > 1 {
            debug!("Dropped {} stale encoder packets", packets - 1);
        }

        match decode_packet(&packet, self.count()) {
            Some(ticks) => {
                self.ticks = ticks;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Shaft rotation in degrees for a 1-based encoder index
    ///
    /// `None` for an index outside `1..=count` or a zero resolution.
    pub fn degrees(&self, index: usize) -> Option<i32> {
        let ticks = *self.ticks.get(index.checked_sub(1)?)?;
        let degrees = (i64::from(ticks) * 360).checked_div(i64::from(self.ppr))?;
        i32::try_from(degrees).ok()
    }
}
