use crate::params::{Param, ParameterSet};
use crate::types::StreamConfig;

/// `video.cgi` parameters for one stream.
pub fn video(config: &StreamConfig) -> ParameterSet {
    let ch = config.id;
    let video = &config.encoding.video;

    let mut set = ParameterSet::new();
    set.push(Param::EncVidCodec(ch), video.codec.as_str())
        .push(Param::EncVidCodecSrcId(ch), config.input.port.zero_based())
        .push(Param::ImageSize(ch), video.image_size.as_str())
        .push(Param::BitRate(ch), video.bitrate)
        .push_opt(Param::IFrameInterval(ch), video.gop)
        .push_opt(Param::PixelFormat(ch), video.pixel_format.map(|p| p.as_str()));
    set
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::encode::tests::stream;
    use crate::types::{GopSpec, PixelFormat, SdiPort};

    #[test]
    fn test_video_with_gop_and_pixel_format() {
        let mut config = stream(1, "rtp://127.0.0.1:4010", 1);
        config.encoding.video.gop = Some(GopSpec {
            b_frames: 1,
            gop_length: 60,
            idr_interval: 1,
        });
        config.encoding.video.pixel_format = Some(PixelFormat::Xv20);

        let set = video(&config);
        assert_eq!(
            set.to_query(),
            "EncVidCodec1=h264&EncVidCodecSrcId1=0&ImageSize1=1280,720&BitRate1=15000\
             &IFrameInterval1=1,60,1&PixelFormat1=XV20"
        );
    }

    #[test]
    fn test_video_without_optionals() {
        let config = stream(3, "rtp://127.0.0.1:4030", 0);
        let set = video(&config);

        assert_eq!(set.len(), 4);
        assert!(!set.to_query().contains("IFrameInterval"));
        assert!(!set.to_query().contains("PixelFormat"));
        assert_eq!(set.get(&Param::EncVidCodecSrcId(config.id)), Some("2"));
    }

    #[test]
    fn test_source_follows_input_port_not_channel() {
        let mut config = stream(1, "rtp://127.0.0.1:4010", 0);
        config.input.port = SdiPort::new(4).unwrap();

        let set = video(&config);
        assert_eq!(set.get(&Param::EncVidCodecSrcId(config.id)), Some("3"));
    }
}
