//! Stream description fixtures.

use encoder_control::types::{
    AudioCodec, AudioSpec, ChannelId, EncodingSpec, GopSpec, ImageSize, OutputSpec, PixelFormat,
    StereoPair, StreamDescription, VideoCodec, VideoSpec,
};

/// Stereo AAC-LC track on the first SDI pair.
pub fn aac_track() -> AudioSpec {
    AudioSpec {
        codec: AudioCodec::AacLc,
        bitrate: 48000,
        sample_rate: 48000,
        pair: StereoPair::new(1).expect("pair 1 is valid"),
    }
}

/// H.264 720p stream on channel `id` with `tracks` AAC tracks and the
/// given output URL.
pub fn stream_with_output(id: u8, url: &str, tracks: usize) -> StreamDescription {
    StreamDescription {
        id: ChannelId::new(id).expect("fixture channel id is valid"),
        name: None,
        input: None,
        encoding: EncodingSpec {
            video: VideoSpec {
                codec: VideoCodec::H264,
                image_size: ImageSize::Hd720,
                bitrate: 15000,
                gop: Some(GopSpec {
                    b_frames: 1,
                    gop_length: 60,
                    idr_interval: 1,
                }),
                rate_control: None,
                pixel_format: Some(PixelFormat::Xv20),
            },
            audio: (0..tracks).map(|_| aac_track()).collect(),
            scte104_to_35_conversion: false,
        },
        output: OutputSpec {
            url: url.to_string(),
        },
    }
}

/// RTP stream to `127.0.0.1:4000 + 10 * id`.
pub fn rtp_stream(id: u8, tracks: usize) -> StreamDescription {
    let port = 4000 + 10 * u16::from(id);
    stream_with_output(id, &format!("rtp://127.0.0.1:{port}"), tracks)
}

/// SRT listener stream on port `9000 + id` with 500 ms latency.
pub fn srt_stream(id: u8, tracks: usize) -> StreamDescription {
    let port = 9000 + u16::from(id);
    stream_with_output(
        id,
        &format!("srt://127.0.0.1:{port}?mode=listener&latency=500"),
        tracks,
    )
}
