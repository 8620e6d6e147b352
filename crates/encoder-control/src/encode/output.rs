//! Output transport encoding (`stream.cgi`).
//!
//! The output URL scheme selects the transport. Each transport writes a
//! fixed layout of PIDs and tuning values followed by the four
//! audio-position bindings, which point each transport-stream audio PID at
//! the device audio encoder feeding it.

use crate::allocator::AudioSlotAllocator;
use crate::errors::{EncoderError, Result};
use crate::params::{Param, ParameterSet, StreamField, TrackPosition};
use crate::types::{ChannelId, StreamConfig};
use reqwest::Url;
use std::fmt;
use std::str::FromStr;

pub const VIDEO_PID: u16 = 100;
pub const PCR_PID: u16 = 100;
/// Audio PIDs for positions 1–4 are `AUDIO_PID_BASE + n`.
pub const AUDIO_PID_BASE: u16 = 100;

pub const TS_TTL: u8 = 64;

pub const SRT_TOS: u8 = 10;
pub const SRT_TTL: u8 = 10;
pub const SRT_BANDWIDTH_OVERHEAD: u8 = 20;
pub const SRT_MTU: u16 = 1500;
pub const SRT_DEFAULT_LATENCY_MS: u32 = 1000;

/// SRT connection mode, from the `mode` query parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SrtMode {
    #[default]
    Caller,
    Listener,
    Rendezvous,
}

impl SrtMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SrtMode::Caller => "caller",
            SrtMode::Listener => "listener",
            SrtMode::Rendezvous => "rendezvous",
        }
    }
}

impl fmt::Display for SrtMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SrtMode {
    type Err = EncoderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "caller" => Ok(SrtMode::Caller),
            "listener" => Ok(SrtMode::Listener),
            "rendezvous" => Ok(SrtMode::Rendezvous),
            other => Err(EncoderError::InvalidOutputUrl(format!(
                "unknown SRT mode: {other}"
            ))),
        }
    }
}

/// Output transport resolved from a stream's output URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Rtp {
        host: String,
        port: u16,
    },
    Udp {
        host: String,
        port: u16,
    },
    Srt {
        mode: SrtMode,
        latency_ms: u32,
        /// The URL with `mode` and `latency` removed from the query.
        url: String,
    },
    Rtmp,
}

impl OutputTarget {
    /// Parse an output URL.
    ///
    /// # Errors
    ///
    /// - `UnsupportedProtocol` for a scheme other than rtp, udp, srt or rtmp
    /// - `InvalidOutputUrl` when the URL does not parse, or lacks the host
    ///   or port the transport needs
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw)
            .map_err(|e| EncoderError::InvalidOutputUrl(format!("{raw}: {e}")))?;

        match url.scheme() {
            "rtp" => {
                let (host, port) = host_and_port(&url, raw)?;
                Ok(OutputTarget::Rtp { host, port })
            }
            "udp" => {
                let (host, port) = host_and_port(&url, raw)?;
                Ok(OutputTarget::Udp { host, port })
            }
            "srt" => parse_srt(url, raw),
            "rtmp" => Ok(OutputTarget::Rtmp),
            other => Err(EncoderError::UnsupportedProtocol(format!("{other}:"))),
        }
    }
}

fn host_and_port(url: &Url, raw: &str) -> Result<(String, u16)> {
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| EncoderError::InvalidOutputUrl(format!("{raw}: missing host")))?;
    let port = url
        .port()
        .ok_or_else(|| EncoderError::InvalidOutputUrl(format!("{raw}: missing port")))?;
    Ok((host.to_string(), port))
}

fn parse_srt(mut url: Url, raw: &str) -> Result<OutputTarget> {
    if url.host_str().map_or(true, str::is_empty) {
        return Err(EncoderError::InvalidOutputUrl(format!("{raw}: missing host")));
    }

    let mut mode = None;
    let mut latency = None;
    let mut rest = Vec::new();

    // The first `mode` and `latency` win; every occurrence is stripped.
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "mode" => {
                if mode.is_none() {
                    mode = Some(value.into_owned());
                }
            }
            "latency" => {
                if latency.is_none() {
                    latency = Some(value.into_owned());
                }
            }
            _ => rest.push((key.into_owned(), value.into_owned())),
        }
    }

    let mode = match mode.as_deref() {
        None | Some("") => SrtMode::default(),
        Some(value) => value.parse()?,
    };
    let latency_ms = latency
        .as_deref()
        .and_then(leading_millis)
        .unwrap_or(SRT_DEFAULT_LATENCY_MS);

    url.set_query(None);
    if !rest.is_empty() {
        url.query_pairs_mut().extend_pairs(rest);
    }

    Ok(OutputTarget::Srt {
        mode,
        latency_ms,
        url: url.to_string(),
    })
}

/// Leading decimal digits of `raw`, ignoring leading whitespace and a `+`
/// sign, so `500ms` reads as 500. Zero and digitless values give `None`.
fn leading_millis(raw: &str) -> Option<u32> {
    let raw = raw.trim_start();
    let raw = raw.strip_prefix('+').unwrap_or(raw);
    let end = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    raw.get(..end)?.parse::<u32>().ok().filter(|ms| *ms > 0)
}

/// `stream.cgi` parameters for one stream.
///
/// # Errors
///
/// Fails on an unusable output URL, and with `ProtocolNotImplemented` for
/// rtmp, which the device lists but this client does not configure.
pub fn output(config: &StreamConfig, slots: &AudioSlotAllocator) -> Result<ParameterSet> {
    let target = OutputTarget::parse(&config.output.url)?;
    let ch = config.id;
    let field = |f: StreamField| Param::Stream(ch, f);
    let tracks = config.audio_track_count();

    let mut set = ParameterSet::new();
    set.push(field(StreamField::Name), config.display_name());

    match target {
        OutputTarget::Rtp { host, port } => {
            set.push(field(StreamField::Protocol), "TSoverRTP")
                .push(field(StreamField::RtpClientIp), host)
                .push(field(StreamField::RtpClientPort), port)
                .push(field(StreamField::RtpVideoEncId), ch)
                .push(field(StreamField::RtpVideoPid), VIDEO_PID);
            for n in TrackPosition::all() {
                set.push(field(StreamField::RtpAudioPid(n)), audio_pid(n));
            }
            set.push(field(StreamField::RtpPcrPid), PCR_PID);
            push_bindings(&mut set, ch, StreamField::RtpAudioEncId, slots, tracks);
        }
        OutputTarget::Udp { host, port } => {
            set.push(field(StreamField::Protocol), "TSoverIP")
                .push(field(StreamField::TsProtocol), "udp")
                .push(field(StreamField::TsClientIp), host)
                .push(field(StreamField::TsClientPort), port)
                .push(field(StreamField::TsTtl), TS_TTL)
                .push(field(StreamField::TsVideoPid), VIDEO_PID);
            for n in TrackPosition::all() {
                set.push(field(StreamField::TsAudioPid(n)), audio_pid(n));
            }
            set.push(field(StreamField::TsPcrPid), PCR_PID)
                .push(field(StreamField::TsPcrCheck), 1);
            push_bindings(&mut set, ch, StreamField::TsAudioEncId, slots, tracks);
        }
        OutputTarget::Srt {
            mode,
            latency_ms,
            url,
        } => {
            set.push(field(StreamField::Protocol), "SRT")
                .push(field(StreamField::SrtMode), mode)
                .push(field(StreamField::SrtUrl), url)
                .push(field(StreamField::SrtTos), SRT_TOS)
                .push(field(StreamField::SrtTtl), SRT_TTL)
                .push(field(StreamField::SrtBandwidthOverhead), SRT_BANDWIDTH_OVERHEAD)
                .push(field(StreamField::SrtMtu), SRT_MTU)
                .push(field(StreamField::SrtLatency), latency_ms)
                .push(field(StreamField::SrtEncryption), "none")
                .push(field(StreamField::SrtEncryptionKey), "")
                .push(field(StreamField::SrtVideoEncId), ch);
            push_bindings(&mut set, ch, StreamField::SrtAudioEncId, slots, tracks);
        }
        OutputTarget::Rtmp => return Err(EncoderError::ProtocolNotImplemented("rtmp")),
    }

    Ok(set)
}

fn audio_pid(n: TrackPosition) -> u16 {
    AUDIO_PID_BASE + u16::from(n.get())
}

fn push_bindings(
    set: &mut ParameterSet,
    ch: ChannelId,
    field: fn(TrackPosition) -> StreamField,
    slots: &AudioSlotAllocator,
    tracks: usize,
) {
    for n in TrackPosition::all() {
        set.push(Param::Stream(ch, field(n)), slots.binding_for(n, tracks));
    }
}
