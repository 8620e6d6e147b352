//! Stream configuration to device parameter encoding.
//!
//! Each domain encoder is a pure function of a normalized stream and, for
//! audio and output, the current audio slot allocation. Same inputs, same
//! parameters, same order.

mod audio;
mod output;
mod scte;
mod video;

pub use audio::audio;
pub use output::{output, OutputTarget, SrtMode};
pub use scte::{scte, SCTE104_DID, SCTE104_SDID};
pub use video::video;

use crate::allocator::AudioSlotAllocator;
use crate::errors::Result;
use crate::params::ParameterSet;
use crate::types::{CgiModule, StreamConfig};

/// Every parameter set needed to apply one stream, in dispatch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCommands {
    pub video: ParameterSet,
    pub scte: ParameterSet,
    pub audio: ParameterSet,
    pub output: ParameterSet,
}

impl StreamCommands {
    /// `(module, parameters)` pairs in the order the device expects them.
    pub fn in_dispatch_order(&self) -> [(CgiModule, &ParameterSet); 4] {
        [
            (CgiModule::Video, &self.video),
            (CgiModule::AvInput, &self.scte),
            (CgiModule::AvInput, &self.audio),
            (CgiModule::Stream, &self.output),
        ]
    }
}

/// Encode all four domains for a stream.
///
/// # Errors
///
/// Returns the first validation failure (audio slot overflow, bad output
/// URL); nothing is encoded partially.
pub fn stream(config: &StreamConfig, slots: &AudioSlotAllocator) -> Result<StreamCommands> {
    Ok(StreamCommands {
        video: video(config),
        scte: scte(config),
        audio: audio(config, slots)?,
        output: output(config, slots)?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{
        AudioCodec, AudioSpec, ChannelId, EncodingSpec, ImageSize, OutputSpec, StereoPair,
        StreamDescription, VideoCodec, VideoSpec,
    };

    /// An h264 720p stream on channel `id` with `tracks` stereo AAC tracks.
    pub(crate) fn stream(id: u8, url: &str, tracks: usize) -> StreamConfig {
        let audio = (0..tracks)
            .map(|_| AudioSpec {
                codec: AudioCodec::AacLc,
                bitrate: 48000,
                sample_rate: 48000,
                pair: StereoPair::new(1).unwrap(),
            })
            .collect();

        StreamDescription {
            id: ChannelId::new(id).unwrap(),
            name: None,
            input: None,
            encoding: EncodingSpec {
                video: VideoSpec {
                    codec: VideoCodec::H264,
                    image_size: ImageSize::Hd720,
                    bitrate: 15000,
                    gop: None,
                    rate_control: None,
                    pixel_format: None,
                },
                audio,
                scte104_to_35_conversion: false,
            },
            output: OutputSpec {
                url: url.to_string(),
            },
        }
        .normalize()
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let config = stream(2, "srt://host:9000?mode=listener", 2);
        let mut slots = AudioSlotAllocator::new();
        slots.commit(2);

        let first = super::stream(&config, &slots).unwrap();
        let second = super::stream(&config, &slots).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_dispatch_order() {
        let config = stream(1, "rtp://127.0.0.1:4010", 1);
        let commands = super::stream(&config, &AudioSlotAllocator::new()).unwrap();

        let modules: Vec<CgiModule> = commands
            .in_dispatch_order()
            .iter()
            .map(|(m, _)| *m)
            .collect();
        assert_eq!(
            modules,
            vec![
                CgiModule::Video,
                CgiModule::AvInput,
                CgiModule::AvInput,
                CgiModule::Stream
            ]
        );
    }

    #[test]
    fn test_bad_url_fails_whole_stream() {
        let config = stream(1, "rtp://127.0.0.1", 1);
        assert!(super::stream(&config, &AudioSlotAllocator::new()).is_err());
    }
}
