//! Stream description data model.
//!
//! These are the caller-facing inputs: a [`StreamDescription`] per hardware
//! channel, nested video/audio/output specs, and the device's CGI module
//! names. Every type deserializes from the camelCase JSON shape operators
//! already write stream presets in, e.g.
//!
//! ```json
//! {
//!   "id": 1,
//!   "encoding": {
//!     "video": { "codec": "h265", "imageSize": "1920,1080", "bitrate": 10000,
//!                "gop": { "bFrames": 1, "gopLength": 60, "idrInterval": 1 } },
//!     "audio": [{ "codec": "aac_lc", "bitrate": 64000, "sampleRate": 48000, "pair": 1 }]
//!   },
//!   "output": { "url": "rtp://127.0.0.1:4010" }
//! }
//! ```

use crate::errors::EncoderError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines a `u8` newtype restricted to `1..=$max`.
macro_rules! bounded_index {
    ($(#[$meta:meta])* $name:ident, $max:expr, $what:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(try_from = "u8", into = "u8")]
        pub struct $name(u8);

        impl $name {
            /// Highest valid value.
            pub const MAX: u8 = $max;

            /// Validate and wrap a 1-based index.
            ///
            /// # Errors
            ///
            /// Returns `EncoderError::InvalidValue` outside `1..=MAX`.
            pub fn new(
                value: u8,
            ) -> ::std::result::Result<Self, $crate::errors::EncoderError> {
                if (1..=Self::MAX).contains(&value) {
                    ::std::result::Result::Ok(Self(value))
                } else {
                    ::std::result::Result::Err($crate::errors::EncoderError::InvalidValue(
                        ::std::format!(
                            "{} must be between 1 and {}, got {}",
                            $what,
                            Self::MAX,
                            value
                        ),
                    ))
                }
            }

            /// The 1-based value.
            pub fn get(self) -> u8 {
                self.0
            }
        }

        impl ::std::convert::TryFrom<u8> for $name {
            type Error = $crate::errors::EncoderError;

            fn try_from(value: u8) -> ::std::result::Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl ::std::convert::From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(f, "{}", self.0)
            }
        }
    };
}

pub(crate) use bounded_index;

bounded_index!(
    /// Hardware channel (stream) identifier, 1–4.
    ChannelId,
    4,
    "channel id"
);

bounded_index!(
    /// Physical SDI input port, 1–4.
    SdiPort,
    4,
    "SDI port"
);

bounded_index!(
    /// Stereo pair of the SDI embedded audio: 1 = ch 1&2, 2 = ch 3&4,
    /// 3 = ch 5&6, 4 = ch 7&8.
    StereoPair,
    4,
    "stereo pair"
);

impl ChannelId {
    /// Every hardware channel, in order.
    pub fn all() -> impl Iterator<Item = ChannelId> {
        (1..=Self::MAX).map(ChannelId)
    }
}

impl SdiPort {
    /// The device addresses SDI inputs from zero.
    pub fn zero_based(self) -> u8 {
        self.0 - 1
    }
}

impl From<ChannelId> for SdiPort {
    fn from(id: ChannelId) -> Self {
        SdiPort(id.get())
    }
}

/// Physical input interface kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputInterface {
    #[default]
    Sdi,
}

/// Input selection for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    #[serde(default)]
    pub interface: InputInterface,
    pub port: SdiPort,
}

/// Video codec, or `Off` to leave the encoder disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    H265,
    Off,
}

impl VideoCodec {
    pub fn as_str(self) -> &'static str {
        match self {
            VideoCodec::H264 => "h264",
            VideoCodec::H265 => "h265",
            VideoCodec::Off => "off",
        }
    }
}

/// Encoded image size, rendered as the device's `width,height` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "1280,720")]
    Hd720,
    #[serde(rename = "1920,1080")]
    Hd1080,
}

impl ImageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Hd720 => "1280,720",
            ImageSize::Hd1080 => "1920,1080",
        }
    }
}

/// Chroma subsampling / bit depth of the encoder input.
///
/// - `NV12`: 4:2:0 8 bit
/// - `NV16`: 4:2:2 8 bit
/// - `XV15`: 4:2:0 10 bit
/// - `XV20`: 4:2:2 10 bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PixelFormat {
    Nv12,
    Nv16,
    Xv15,
    Xv20,
}

impl PixelFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            PixelFormat::Nv12 => "NV12",
            PixelFormat::Nv16 => "NV16",
            PixelFormat::Xv15 => "XV15",
            PixelFormat::Xv20 => "XV20",
        }
    }
}

/// Parse a wire string back into one of `variants`.
fn parse_wire<T: Copy>(
    s: &str,
    variants: &[T],
    as_str: fn(T) -> &'static str,
    what: &str,
) -> Result<T, EncoderError> {
    variants
        .iter()
        .copied()
        .find(|v| as_str(*v) == s)
        .ok_or_else(|| EncoderError::InvalidValue(format!("unknown {what}: {s}")))
}

impl std::str::FromStr for VideoCodec {
    type Err = EncoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_wire(
            s,
            &[VideoCodec::H264, VideoCodec::H265, VideoCodec::Off],
            VideoCodec::as_str,
            "video codec",
        )
    }
}

impl std::str::FromStr for ImageSize {
    type Err = EncoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_wire(
            s,
            &[ImageSize::Hd720, ImageSize::Hd1080],
            ImageSize::as_str,
            "image size",
        )
    }
}

impl std::str::FromStr for PixelFormat {
    type Err = EncoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_wire(
            &s.to_ascii_uppercase(),
            &[
                PixelFormat::Nv12,
                PixelFormat::Nv16,
                PixelFormat::Xv15,
                PixelFormat::Xv20,
            ],
            PixelFormat::as_str,
            "pixel format",
        )
    }
}

/// Rate control mode.
///
/// Carried with the video spec but not sent: the appliance exposes no
/// per-channel rate control parameter on `video.cgi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateControl {
    #[serde(rename = "CBR")]
    Cbr,
    #[serde(rename = "VBR")]
    Vbr,
    #[serde(rename = "CVBR")]
    Cvbr,
    #[serde(rename = "low-latency")]
    LowLatency,
}

/// GOP structure. Sent as the `X,Y,Z` triplet of `IFrameInterval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GopSpec {
    /// B-frames between P-frames (X).
    pub b_frames: u32,
    /// GOP length N (Y).
    pub gop_length: u32,
    /// GOPs between IDR frames (Z).
    pub idr_interval: u32,
}

impl fmt::Display for GopSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.b_frames, self.gop_length, self.idr_interval)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSpec {
    pub codec: VideoCodec,
    pub image_size: ImageSize,
    /// kbps, 64–64000 on current firmware.
    pub bitrate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gop: Option<GopSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_control: Option<RateControl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_format: Option<PixelFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    AacLc,
    AacHe,
    AacHev2,
    Ac3,
    Mp2,
}

impl AudioCodec {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioCodec::AacLc => "aac_lc",
            AudioCodec::AacHe => "aac_he",
            AudioCodec::AacHev2 => "aac_hev2",
            AudioCodec::Ac3 => "ac3",
            AudioCodec::Mp2 => "mp2",
        }
    }
}

/// One audio track. Each track claims one of the device's audio encoders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSpec {
    pub codec: AudioCodec,
    pub bitrate: u32,
    /// 0 (follow input), 32000, 44100 or 48000.
    pub sample_rate: u32,
    pub pair: StereoPair,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingSpec {
    pub video: VideoSpec,
    #[serde(default)]
    pub audio: Vec<AudioSpec>,
    #[serde(default)]
    pub scte104_to_35_conversion: bool,
}

/// Output transport, selected by the URL scheme (`rtp`, `udp`, `srt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub url: String,
}

/// A stream as supplied by the caller; `input` may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescription {
    pub id: ChannelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<InputSpec>,
    pub encoding: EncodingSpec,
    pub output: OutputSpec,
}

impl StreamDescription {
    /// Fill in defaults: a missing input is the SDI port matching the channel.
    pub fn normalize(&self) -> StreamConfig {
        let input = self.input.unwrap_or(InputSpec {
            interface: InputInterface::Sdi,
            port: SdiPort::from(self.id),
        });

        StreamConfig {
            id: self.id,
            name: self.name.clone(),
            input,
            encoding: self.encoding.clone(),
            output: self.output.clone(),
        }
    }
}

/// A normalized stream description, ready for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    pub id: ChannelId,
    pub name: Option<String>,
    pub input: InputSpec,
    pub encoding: EncodingSpec,
    pub output: OutputSpec,
}

impl StreamConfig {
    /// Channel name shown by the device; defaults to `Stream-<id>`.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Stream-{}", self.id))
    }

    pub fn audio_track_count(&self) -> usize {
        self.encoding.audio.len()
    }
}

/// Device CGI modules under `/command/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CgiModule {
    System,
    AvInput,
    Video,
    Encode,
    Stream,
    VideoInputStatus,
    Misc,
}

impl CgiModule {
    pub fn as_str(self) -> &'static str {
        match self {
            CgiModule::System => "system",
            CgiModule::AvInput => "av_input",
            CgiModule::Video => "video",
            CgiModule::Encode => "encode",
            CgiModule::Stream => "stream",
            CgiModule::VideoInputStatus => "video_input_status",
            CgiModule::Misc => "misc",
        }
    }

    /// Path relative to `/command/`, e.g. `av_input.cgi`.
    pub fn path(self) -> String {
        format!("{}.cgi", self.as_str())
    }
}

impl fmt::Display for CgiModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CgiModule {
    type Err = EncoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(CgiModule::System),
            "av_input" => Ok(CgiModule::AvInput),
            "video" => Ok(CgiModule::Video),
            "encode" => Ok(CgiModule::Encode),
            "stream" => Ok(CgiModule::Stream),
            "video_input_status" => Ok(CgiModule::VideoInputStatus),
            "misc" => Ok(CgiModule::Misc),
            other => Err(EncoderError::InvalidValue(format!(
                "unknown CGI module: {other}"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn description_json() -> &'static str {
        r#"{
            "id": 2,
            "encoding": {
                "video": {
                    "codec": "h265",
                    "imageSize": "1920,1080",
                    "bitrate": 10000,
                    "gop": { "bFrames": 1, "gopLength": 60, "idrInterval": 1 },
                    "rateControl": "low-latency",
                    "pixelFormat": "XV20"
                },
                "audio": [
                    { "codec": "aac_lc", "bitrate": 64000, "sampleRate": 48000, "pair": 1 },
                    { "codec": "ac3", "bitrate": 32000, "sampleRate": 32000, "pair": 2 }
                ],
                "scte104To35Conversion": true
            },
            "output": { "url": "rtp://127.0.0.1:4010" }
        }"#
    }

    #[test]
    fn test_bounded_index_range() {
        assert!(ChannelId::new(0).is_err());
        assert_eq!(ChannelId::new(1).unwrap().get(), 1);
        assert_eq!(ChannelId::new(4).unwrap().get(), 4);
        assert!(ChannelId::new(5).is_err());
        assert!(StereoPair::new(5).is_err());
    }

    #[test]
    fn test_channel_all_is_one_through_four() {
        let ids: Vec<u8> = ChannelId::all().map(ChannelId::get).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_sdi_port_zero_based() {
        assert_eq!(SdiPort::new(1).unwrap().zero_based(), 0);
        assert_eq!(SdiPort::new(4).unwrap().zero_based(), 3);
    }

    #[test]
    fn test_deserialize_description() {
        let desc: StreamDescription = serde_json::from_str(description_json()).unwrap();

        assert_eq!(desc.id.get(), 2);
        assert_eq!(desc.encoding.video.codec, VideoCodec::H265);
        assert_eq!(desc.encoding.video.image_size, ImageSize::Hd1080);
        assert_eq!(desc.encoding.video.rate_control, Some(RateControl::LowLatency));
        assert_eq!(desc.encoding.video.pixel_format, Some(PixelFormat::Xv20));
        assert_eq!(desc.encoding.audio.len(), 2);
        assert_eq!(desc.encoding.audio[1].codec, AudioCodec::Ac3);
        assert!(desc.encoding.scte104_to_35_conversion);
        assert!(desc.input.is_none());
    }

    #[test]
    fn test_deserialize_rejects_out_of_range_channel() {
        let json = description_json().replace("\"id\": 2", "\"id\": 7");
        let result: Result<StreamDescription, _> = serde_json::from_str(&json);
        assert!(result.is_err());
    }

    #[test]
    fn test_normalize_defaults_input_to_channel() {
        let desc: StreamDescription = serde_json::from_str(description_json()).unwrap();
        let config = desc.normalize();

        assert_eq!(config.input.interface, InputInterface::Sdi);
        assert_eq!(config.input.port.get(), 2);
        assert_eq!(config.display_name(), "Stream-2");
    }

    #[test]
    fn test_normalize_keeps_explicit_input() {
        let mut desc: StreamDescription = serde_json::from_str(description_json()).unwrap();
        desc.input = Some(InputSpec {
            interface: InputInterface::Sdi,
            port: SdiPort::new(4).unwrap(),
        });
        desc.name = Some("Studio A".to_string());

        let config = desc.normalize();
        assert_eq!(config.input.port.get(), 4);
        assert_eq!(config.display_name(), "Studio A");
    }

    #[test]
    fn test_gop_display() {
        let gop = GopSpec {
            b_frames: 1,
            gop_length: 60,
            idr_interval: 1,
        };
        assert_eq!(gop.to_string(), "1,60,1");
    }

    #[test]
    fn test_wire_strings() {
        assert_eq!(AudioCodec::AacHev2.as_str(), "aac_hev2");
        assert_eq!(
            serde_json::to_string(&AudioCodec::AacHev2).unwrap(),
            "\"aac_hev2\""
        );
        assert_eq!(ImageSize::Hd720.as_str(), "1280,720");
        assert_eq!(PixelFormat::Nv16.as_str(), "NV16");
        assert_eq!(VideoCodec::Off.as_str(), "off");
    }

    #[test]
    fn test_parse_wire_strings() {
        assert_eq!("h265".parse::<VideoCodec>().unwrap(), VideoCodec::H265);
        assert_eq!("1920,1080".parse::<ImageSize>().unwrap(), ImageSize::Hd1080);
        assert_eq!("xv20".parse::<PixelFormat>().unwrap(), PixelFormat::Xv20);
        assert!("vp9".parse::<VideoCodec>().is_err());
        assert!("640,480".parse::<ImageSize>().is_err());
    }

    #[test]
    fn test_cgi_module_paths() {
        assert_eq!(CgiModule::AvInput.path(), "av_input.cgi");
        assert_eq!(CgiModule::VideoInputStatus.path(), "video_input_status.cgi");
        assert_eq!("stream".parse::<CgiModule>().unwrap(), CgiModule::Stream);
        assert!("inquiry".parse::<CgiModule>().is_err());
    }
}
