//! Canned stream batches for bench testing.
//!
//! Each scenario fills channels 1..=count with identical streams whose
//! output ports step by 10 from `port_begin`.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use encoder_control::encode::SrtMode;
use encoder_control::types::{
    AudioCodec, AudioSpec, ChannelId, EncodingSpec, ImageSize, OutputSpec, PixelFormat,
    StereoPair, StreamDescription, VideoCodec, VideoSpec,
};
use std::fmt;
use tracing::debug;

pub const DEFAULT_VIDEO_BITRATE: u32 = 15000;
pub const DEFAULT_AUDIO_BITRATE: u32 = 48000;
pub const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 48000;
pub const DEFAULT_PORT_BEGIN: u16 = 4010;
pub const DEFAULT_TARGET_IP: &str = "127.0.0.1";

/// Port spacing between consecutive channels.
const PORT_STEP: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputProtocol {
    Rtp,
    Udp,
    Srt,
}

impl fmt::Display for OutputProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputProtocol::Rtp => "rtp",
            OutputProtocol::Udp => "udp",
            OutputProtocol::Srt => "srt",
        })
    }
}

/// Video settings shared by every stream of a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioOpts {
    pub count: u8,
    pub video_codec: VideoCodec,
    pub bitrate: u32,
    pub image_size: ImageSize,
    pub scte104_to_35_conversion: bool,
    pub pixel_format: PixelFormat,
}

impl ScenarioOpts {
    pub fn new(count: u8, video_codec: VideoCodec) -> Self {
        Self {
            count,
            video_codec,
            bitrate: DEFAULT_VIDEO_BITRATE,
            image_size: ImageSize::Hd720,
            scte104_to_35_conversion: false,
            pixel_format: PixelFormat::Xv20,
        }
    }
}

/// Where the streams are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOpts {
    pub target_ip: String,
    pub port_begin: u16,
    pub protocol: Option<OutputProtocol>,
    pub srt_mode: Option<SrtMode>,
}

impl Default for TargetOpts {
    fn default() -> Self {
        Self {
            target_ip: DEFAULT_TARGET_IP.to_string(),
            port_begin: DEFAULT_PORT_BEGIN,
            protocol: None,
            srt_mode: None,
        }
    }
}

impl TargetOpts {
    /// The explicit protocol, else SRT when an SRT mode is set, else RTP.
    pub fn resolved_protocol(&self) -> OutputProtocol {
        match (self.protocol, self.srt_mode) {
            (Some(protocol), _) => protocol,
            (None, Some(_)) => OutputProtocol::Srt,
            (None, None) => OutputProtocol::Rtp,
        }
    }

    /// Output URL for one port.
    pub fn url(&self, port: u16) -> String {
        let protocol = self.resolved_protocol();
        let base = format!("{protocol}://{}:{port}", self.target_ip);
        match (protocol, self.srt_mode) {
            (OutputProtocol::Srt, Some(mode)) => format!("{base}?mode={mode}"),
            _ => base,
        }
    }
}

fn audio_track(codec: AudioCodec) -> Result<AudioSpec> {
    Ok(AudioSpec {
        codec,
        bitrate: DEFAULT_AUDIO_BITRATE,
        sample_rate: DEFAULT_AUDIO_SAMPLE_RATE,
        pair: StereoPair::new(1)?,
    })
}

/// One stream on channel `id`.
///
/// # Errors
///
/// Fails if `id` is not a valid channel.
pub fn make_stream(
    id: u8,
    port: u16,
    opts: &ScenarioOpts,
    audio: &[AudioCodec],
    target: &TargetOpts,
) -> Result<StreamDescription> {
    let audio = audio
        .iter()
        .map(|codec| audio_track(*codec))
        .collect::<Result<Vec<_>>>()?;

    Ok(StreamDescription {
        id: ChannelId::new(id)?,
        name: None,
        input: None,
        encoding: EncodingSpec {
            video: VideoSpec {
                codec: opts.video_codec,
                image_size: opts.image_size,
                bitrate: opts.bitrate,
                gop: None,
                rate_control: None,
                pixel_format: Some(opts.pixel_format),
            },
            audio,
            scte104_to_35_conversion: opts.scte104_to_35_conversion,
        },
        output: OutputSpec {
            url: target.url(port),
        },
    })
}

/// `opts.count` identical streams on channels 1..=count.
///
/// # Errors
///
/// Fails when the count is outside 1..=4 or a port would overflow.
pub fn make_similar_streams(
    opts: &ScenarioOpts,
    audio: &[AudioCodec],
    target: &TargetOpts,
) -> Result<Vec<StreamDescription>> {
    if opts.count == 0 || opts.count > ChannelId::MAX {
        bail!(
            "stream count must be between 1 and {}, got {}",
            ChannelId::MAX,
            opts.count
        );
    }

    let streams = (0..opts.count)
        .map(|i| {
            let port = u16::from(i)
                .checked_mul(PORT_STEP)
                .and_then(|offset| target.port_begin.checked_add(offset))
                .with_context(|| format!("port overflow from {}", target.port_begin))?;
            make_stream(i + 1, port, opts, audio, target)
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        target: "encoder.cli",
        streams = %serde_json::to_string(&streams).unwrap_or_default(),
        "Scenario streams"
    );
    Ok(streams)
}

/// Video plus one stereo AAC-LC track per channel.
///
/// # Errors
///
/// See [`make_similar_streams`].
pub fn encode_main(opts: &ScenarioOpts, target: &TargetOpts) -> Result<Vec<StreamDescription>> {
    make_similar_streams(opts, &[AudioCodec::AacLc], target)
}

/// Video plus two stereo AAC-LC tracks per channel.
///
/// # Errors
///
/// See [`make_similar_streams`].
pub fn encode_double_stereo(
    opts: &ScenarioOpts,
    target: &TargetOpts,
) -> Result<Vec<StreamDescription>> {
    make_similar_streams(opts, &[AudioCodec::AacLc, AudioCodec::AacLc], target)
}

/// Named scenario presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    AvcMain,
    AvcDoubleStereo,
    AvcSingle,
    HevcMain,
    HevcDoubleStereo,
    HevcSingle,
}

impl Preset {
    pub fn title(self) -> &'static str {
        match self {
            Preset::AvcMain => "Four H.264 15Mbps 4:2:2 10bit, one stereo aac_lc each",
            Preset::AvcDoubleStereo => "Four H.264 15Mbps 4:2:2 10bit, two stereo aac_lc each",
            Preset::AvcSingle => "Single H.264 15Mbps 4:2:2 10bit, one stereo aac_lc",
            Preset::HevcMain => "Four H.265 15Mbps 4:2:2 10bit, one stereo aac_lc each",
            Preset::HevcDoubleStereo => "Four H.265 15Mbps 4:2:2 10bit, two stereo aac_lc each",
            Preset::HevcSingle => "Single H.265 15Mbps 4:2:2 10bit, one stereo aac_lc",
        }
    }

    pub fn name(self) -> String {
        self.to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_default()
    }

    /// Defaults for this preset: codec and stream count.
    pub fn opts(self) -> ScenarioOpts {
        let (count, codec) = match self {
            Preset::AvcMain | Preset::AvcDoubleStereo => (4, VideoCodec::H264),
            Preset::AvcSingle => (1, VideoCodec::H264),
            Preset::HevcMain | Preset::HevcDoubleStereo => (4, VideoCodec::H265),
            Preset::HevcSingle => (1, VideoCodec::H265),
        };
        ScenarioOpts::new(count, codec)
    }

    /// Build the preset's streams with the given (possibly adjusted) opts.
    ///
    /// # Errors
    ///
    /// See [`make_similar_streams`].
    pub fn streams(
        self,
        opts: &ScenarioOpts,
        target: &TargetOpts,
    ) -> Result<Vec<StreamDescription>> {
        match self {
            Preset::AvcDoubleStereo | Preset::HevcDoubleStereo => {
                encode_double_stereo(opts, target)
            }
            _ => encode_main(opts, target),
        }
    }
}
