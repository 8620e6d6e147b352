use crate::allocator::AudioSlotAllocator;
use crate::errors::Result;
use crate::params::{Param, ParameterSet};
use crate::types::StreamConfig;

/// Audio encoder parameters (`av_input.cgi`), one group per track.
///
/// Track `i` lands on slot `i + 1 + used`. Every slot is checked before
/// anything is returned, so an overflowing stream yields no parameters.
///
/// # Errors
///
/// Returns `EncoderError::AudioSlotsExhausted` when a track would need a
/// slot past the eighth.
pub fn audio(config: &StreamConfig, slots: &AudioSlotAllocator) -> Result<ParameterSet> {
    let source = config.input.port.zero_based();
    let mut set = ParameterSet::new();

    for (index, track) in config.encoding.audio.iter().enumerate() {
        let slot = slots.slot_for(index)?;
        set.push(Param::EncAudSrcId(slot), source)
            .push(Param::EncAudCodec(slot), track.codec.as_str())
            .push(Param::EncAudSrcStereo(slot), track.pair)
            .push(Param::AudBitRate(slot), track.bitrate)
            .push(Param::AudSampleRate(slot), track.sample_rate);
    }
    Ok(set)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::encode::tests::stream;
    use crate::errors::EncoderError;

    #[test]
    fn test_audio_slots_follow_allocator() {
        let config = stream(2, "rtp://127.0.0.1:4020", 2);
        let mut slots = AudioSlotAllocator::new();
        slots.commit(3);

        let set = audio(&config, &slots).unwrap();
        assert_eq!(set.len(), 10);
        assert_eq!(
            set.to_query(),
            "EncAudSrcId4=1&EncAudCodec4=aac_lc&EncAudSrcStereo4=1&AudBitRate4=48000\
             &AudSampleRate4=48000&EncAudSrcId5=1&EncAudCodec5=aac_lc&EncAudSrcStereo5=1\
             &AudBitRate5=48000&AudSampleRate5=48000"
        );
    }

    #[test]
    fn test_no_tracks_no_parameters() {
        let config = stream(1, "rtp://127.0.0.1:4010", 0);
        assert!(audio(&config, &AudioSlotAllocator::new()).unwrap().is_empty());
    }

    #[test]
    fn test_overflow_rejects_whole_stream() {
        let config = stream(4, "rtp://127.0.0.1:4040", 2);
        let mut slots = AudioSlotAllocator::new();
        slots.commit(7);

        let err = audio(&config, &slots).unwrap_err();
        assert!(matches!(
            err,
            EncoderError::AudioSlotsExhausted {
                requested: 9,
                max: 8
            }
        ));
    }
}
