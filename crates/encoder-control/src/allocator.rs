//! Audio encoder slot allocation.
//!
//! The appliance has eight audio encoders shared by all channels. Slots are
//! handed out in order across a batch: the first stream's tracks take slots
//! 1..k, the next stream continues at k+1, and so on. The device does not
//! report which slots are taken, so the count lives on the client.

use crate::errors::{EncoderError, Result};
use crate::params::TrackPosition;
use crate::types::bounded_index;

/// Number of audio encoders on the device.
pub const MAX_AUDIO_SLOTS: u8 = 8;

bounded_index!(
    /// Device audio encoder slot, 1–8.
    AudioSlot,
    8,
    "audio slot"
);

impl AudioSlot {
    /// Slots 1 through 8.
    pub fn all() -> impl Iterator<Item = AudioSlot> {
        (1..=Self::MAX).map(AudioSlot)
    }
}

/// Running count of audio encoder slots claimed by the current batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioSlotAllocator {
    used: u8,
}

impl AudioSlotAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slots claimed so far, 0..=8.
    pub fn used(&self) -> u8 {
        self.used
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Slot for the stream's `local_index`-th audio track (zero-based),
    /// given the slots already claimed. Does not claim it.
    ///
    /// # Errors
    ///
    /// Returns `EncoderError::AudioSlotsExhausted` when the slot would be
    /// past the last encoder.
    pub fn slot_for(&self, local_index: usize) -> Result<AudioSlot> {
        let requested = local_index
            .checked_add(1)
            .and_then(|n| n.checked_add(usize::from(self.used)))
            .unwrap_or(usize::MAX);

        let exhausted = || EncoderError::AudioSlotsExhausted {
            requested: u8::try_from(requested).unwrap_or(u8::MAX),
            max: MAX_AUDIO_SLOTS,
        };

        let slot = u8::try_from(requested).map_err(|_| exhausted())?;
        AudioSlot::new(slot).map_err(|_| exhausted())
    }

    /// Encoder id bound at a transport-stream audio position: the slot of
    /// the track at that position, or 0 when the stream has fewer tracks.
    pub fn binding_for(&self, position: TrackPosition, track_count: usize) -> u8 {
        if usize::from(position.get()) <= track_count {
            position.get().saturating_add(self.used)
        } else {
            0
        }
    }

    /// Claim `track_count` slots once a stream has been applied.
    pub fn commit(&mut self, track_count: usize) {
        let claimed = u8::try_from(track_count).unwrap_or(u8::MAX);
        self.used = self.used.saturating_add(claimed).min(MAX_AUDIO_SLOTS);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn pos(n: u8) -> TrackPosition {
        TrackPosition::new(n).unwrap()
    }

    #[test]
    fn test_slots_continue_after_commit() {
        let mut alloc = AudioSlotAllocator::new();
        assert_eq!(alloc.slot_for(0).unwrap().get(), 1);
        assert_eq!(alloc.slot_for(1).unwrap().get(), 2);

        alloc.commit(2);
        assert_eq!(alloc.used(), 2);
        assert_eq!(alloc.slot_for(0).unwrap().get(), 3);
    }

    #[test]
    fn test_slot_for_does_not_claim() {
        let alloc = AudioSlotAllocator::new();
        let _ = alloc.slot_for(3).unwrap();
        assert_eq!(alloc.used(), 0);
    }

    #[test]
    fn test_ninth_slot_is_rejected() {
        let mut alloc = AudioSlotAllocator::new();
        alloc.commit(7);
        assert_eq!(alloc.slot_for(0).unwrap().get(), 8);

        match alloc.slot_for(1) {
            Err(EncoderError::AudioSlotsExhausted { requested, max }) => {
                assert_eq!(requested, 9);
                assert_eq!(max, 8);
            }
            other => panic!("expected AudioSlotsExhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_huge_index_is_rejected_not_wrapped() {
        let alloc = AudioSlotAllocator::new();
        assert!(matches!(
            alloc.slot_for(1000),
            Err(EncoderError::AudioSlotsExhausted { .. })
        ));
    }

    #[test]
    fn test_binding_for_positions() {
        let mut alloc = AudioSlotAllocator::new();
        assert_eq!(alloc.binding_for(pos(1), 1), 1);
        assert_eq!(alloc.binding_for(pos(2), 1), 0);

        alloc.commit(2);
        assert_eq!(alloc.binding_for(pos(1), 2), 3);
        assert_eq!(alloc.binding_for(pos(2), 2), 4);
        assert_eq!(alloc.binding_for(pos(3), 2), 0);
        assert_eq!(alloc.binding_for(pos(4), 0), 0);
    }

    #[test]
    fn test_reset_and_saturating_commit() {
        let mut alloc = AudioSlotAllocator::new();
        alloc.commit(5);
        alloc.commit(5);
        assert_eq!(alloc.used(), MAX_AUDIO_SLOTS);

        alloc.reset();
        assert_eq!(alloc.used(), 0);
    }
}
