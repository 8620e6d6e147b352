//! Device parameter names and parameter sets.
//!
//! The appliance addresses every setting by a positional name such as
//! `EncVidCodec1` or `Channel2RTPAudio3EncId1`. [`Param`] models each
//! parameter family as a variant carrying typed indices, so a name can only
//! be built with the right number and kind of arguments.
//!
//! [`ParameterSet`] is the ordered list of `name=value` pairs sent to one
//! CGI module in one request.

use crate::allocator::AudioSlot;
use crate::types::{bounded_index, ChannelId};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt;

/// Bytes that would end or split a query value. `,`, `:` and `/` stay
/// literal; the device reads `1280,720` and `srt://...` values raw.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'=')
    .add(b'<')
    .add(b'>')
    .add(b'`');

bounded_index!(
    /// Position of an elementary stream inside a channel's transport stream
    /// (audio 1–4).
    TrackPosition,
    4,
    "track position"
);

impl TrackPosition {
    /// Positions 1 through 4.
    pub fn all() -> impl Iterator<Item = TrackPosition> {
        (1..=Self::MAX).map(TrackPosition)
    }

    /// Zero-based index into the stream's audio track list.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

/// Per-channel fields of `stream.cgi`, rendered between `Channel<ch>` and
/// the trailing `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamField {
    Name,
    Protocol,

    RtpClientIp,
    RtpClientPort,
    RtpVideoEncId,
    RtpVideoPid,
    RtpAudioPid(TrackPosition),
    RtpPcrPid,
    RtpAudioEncId(TrackPosition),

    TsProtocol,
    TsClientIp,
    TsClientPort,
    TsTtl,
    TsVideoPid,
    TsAudioPid(TrackPosition),
    TsPcrPid,
    TsPcrCheck,
    TsAudioEncId(TrackPosition),

    SrtMode,
    SrtUrl,
    SrtTos,
    SrtTtl,
    SrtBandwidthOverhead,
    SrtMtu,
    SrtLatency,
    SrtEncryption,
    SrtEncryptionKey,
    SrtVideoEncId,
    SrtAudioEncId(TrackPosition),
}

impl fmt::Display for StreamField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamField::Name => f.write_str("Name"),
            StreamField::Protocol => f.write_str("Protocol"),

            StreamField::RtpClientIp => f.write_str("RTPclientIP"),
            StreamField::RtpClientPort => f.write_str("RTPclientPort"),
            StreamField::RtpVideoEncId => f.write_str("RTPVideo1EncId"),
            StreamField::RtpVideoPid => f.write_str("RTPVideoPid"),
            StreamField::RtpAudioPid(n) => write!(f, "RTPAudio{n}Pid"),
            StreamField::RtpPcrPid => f.write_str("RTPPcrPid"),
            StreamField::RtpAudioEncId(n) => write!(f, "RTPAudio{n}EncId"),

            StreamField::TsProtocol => f.write_str("TSprotocol"),
            StreamField::TsClientIp => f.write_str("TSclientIP"),
            StreamField::TsClientPort => f.write_str("TSclientPort"),
            StreamField::TsTtl => f.write_str("TSTTL"),
            StreamField::TsVideoPid => f.write_str("TSVideoPid"),
            // The first TS audio PID carries no index on the device.
            StreamField::TsAudioPid(n) if n.get() == 1 => f.write_str("TSAudioPid"),
            StreamField::TsAudioPid(n) => write!(f, "TSAudio{n}Pid"),
            StreamField::TsPcrPid => f.write_str("TSPcrPid"),
            StreamField::TsPcrCheck => f.write_str("TSPcrCheck"),
            StreamField::TsAudioEncId(n) => write!(f, "TSAudio{n}EncId"),

            StreamField::SrtMode => f.write_str("SRTMode"),
            StreamField::SrtUrl => f.write_str("SRTUrl"),
            StreamField::SrtTos => f.write_str("SRTToS"),
            StreamField::SrtTtl => f.write_str("SRTTTL"),
            StreamField::SrtBandwidthOverhead => f.write_str("SRTBandwidthOverhead"),
            StreamField::SrtMtu => f.write_str("SRTMTU"),
            StreamField::SrtLatency => f.write_str("SRTLatency"),
            StreamField::SrtEncryption => f.write_str("SRTEncryption"),
            StreamField::SrtEncryptionKey => f.write_str("SRTEncryptionKey"),
            StreamField::SrtVideoEncId => f.write_str("SRTVideo1EncId"),
            StreamField::SrtAudioEncId(n) => write!(f, "SRTAudio{n}EncId"),
        }
    }
}

/// A device parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    // video.cgi, per channel
    EncVidCodec(ChannelId),
    EncVidCodecSrcId(ChannelId),
    ImageSize(ChannelId),
    BitRate(ChannelId),
    IFrameInterval(ChannelId),
    PixelFormat(ChannelId),
    RePipeline,

    // av_input.cgi, per audio encoder slot
    EncAudSrcId(AudioSlot),
    EncAudCodec(AudioSlot),
    EncAudSrcStereo(AudioSlot),
    AudBitRate(AudioSlot),
    AudSampleRate(AudioSlot),

    // av_input.cgi, per channel ancillary data
    AncEnable(ChannelId),
    AncDid(ChannelId),
    AncSdid(ChannelId),

    // stream.cgi
    Stream(ChannelId, StreamField),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::EncVidCodec(ch) => write!(f, "EncVidCodec{ch}"),
            Param::EncVidCodecSrcId(ch) => write!(f, "EncVidCodecSrcId{ch}"),
            Param::ImageSize(ch) => write!(f, "ImageSize{ch}"),
            Param::BitRate(ch) => write!(f, "BitRate{ch}"),
            Param::IFrameInterval(ch) => write!(f, "IFrameInterval{ch}"),
            Param::PixelFormat(ch) => write!(f, "PixelFormat{ch}"),
            Param::RePipeline => f.write_str("re_pipeline"),

            Param::EncAudSrcId(slot) => write!(f, "EncAudSrcId{slot}"),
            Param::EncAudCodec(slot) => write!(f, "EncAudCodec{slot}"),
            Param::EncAudSrcStereo(slot) => write!(f, "EncAudSrcStereo{slot}"),
            Param::AudBitRate(slot) => write!(f, "AudBitRate{slot}"),
            Param::AudSampleRate(slot) => write!(f, "AudSampleRate{slot}"),

            Param::AncEnable(ch) => write!(f, "Channel{ch}AncEnable1"),
            Param::AncDid(ch) => write!(f, "Channel{ch}AncDID1"),
            Param::AncSdid(ch) => write!(f, "Channel{ch}AncSDID1"),

            Param::Stream(ch, field) => write!(f, "Channel{ch}{field}1"),
        }
    }
}

/// Ordered parameters for a single CGI request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    entries: Vec<(Param, String)>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    pub fn push(&mut self, param: Param, value: impl ToString) -> &mut Self {
        self.entries.push((param, value.to_string()));
        self
    }

    /// Append a parameter only when a value is present.
    pub fn push_opt<V: ToString>(&mut self, param: Param, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.push(param, value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Value of the first entry named `param`, if any.
    pub fn get(&self, param: &Param) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == param)
            .map(|(_, v)| v.as_str())
    }

    /// `name=value` pairs joined by `&`. Values are percent-encoded only
    /// where they would otherwise break the query apart.
    pub fn to_query(&self) -> String {
        self.entries
            .iter()
            .map(|(p, v)| format!("{p}={}", utf8_percent_encode(v, QUERY_VALUE)))
            .collect::<Vec<_>>()
            .join("&")
    }
}
