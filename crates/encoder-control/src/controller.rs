//! Stream orchestration.
//!
//! [`StreamController`] owns the command transport and the audio slot
//! allocator for one device session. Applying a batch of streams resets the
//! allocator, then for each stream encodes every domain up front and sends
//! the parameter sets in device order: video, ancillary data, audio, output.
//! A single `re_pipeline` command closes the batch.
//!
//! Nothing is rolled back on failure. Commands already sent stay applied;
//! [`StreamController::reset`] returns the device to a known state.

use crate::allocator::{AudioSlot, AudioSlotAllocator};
use crate::encode;
use crate::errors::{EncoderError, Result};
use crate::inquiry::{parse_declarations, InquiryValues};
use crate::params::{Param, ParameterSet, StreamField};
use crate::transport::CommandTransport;
use crate::types::{CgiModule, ChannelId, StreamDescription};
use tracing::{debug, info, instrument, warn};

/// Channel whose video encoder `disable_streams` leaves on.
const PRIMARY_CHANNEL: u8 = 1;

/// Applies stream configurations to one device.
pub struct StreamController<T: CommandTransport> {
    transport: T,
    slots: AudioSlotAllocator,
}

impl<T: CommandTransport> StreamController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            slots: AudioSlotAllocator::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Audio encoder slots claimed since the last batch started.
    pub fn audio_slots_used(&self) -> u8 {
        self.slots.used()
    }

    /// Apply a batch of streams, in order, then rebuild the device pipeline.
    ///
    /// The audio slot count restarts at zero for the batch. Processing stops
    /// at the first failing stream; streams before it stay applied and the
    /// pipeline is not rebuilt.
    ///
    /// # Errors
    ///
    /// - `EncoderError::StreamCreation` wrapping the cause, naming the channel
    /// - transport errors from the final `re_pipeline` command
    #[instrument(skip_all, fields(streams = descriptions.len()))]
    pub async fn create_streams(&mut self, descriptions: &[StreamDescription]) -> Result<()> {
        self.slots.reset();

        for description in descriptions {
            self.apply_stream(description).await?;
        }

        let mut pipeline = ParameterSet::new();
        pipeline.push(Param::RePipeline, "on");
        self.transport.send(CgiModule::Video, &pipeline).await?;

        info!(
            target: "encoder.controller",
            streams = descriptions.len(),
            audio_slots = self.slots.used(),
            "Streams created"
        );
        Ok(())
    }

    /// Apply one stream on top of the current session without resetting
    /// the slot count or rebuilding the pipeline.
    ///
    /// # Errors
    ///
    /// Returns `EncoderError::StreamCreation` wrapping the cause.
    #[instrument(skip_all, fields(channel = %description.id))]
    pub async fn create_stream(&mut self, description: &StreamDescription) -> Result<()> {
        self.apply_stream(description).await
    }

    async fn apply_stream(&mut self, description: &StreamDescription) -> Result<()> {
        let config = description.normalize();
        let channel = config.id;

        let commands = encode::stream(&config, &self.slots).map_err(|e| {
            warn!(target: "encoder.controller", channel = %channel, error = %e, "Stream rejected");
            EncoderError::stream_creation(channel, e)
        })?;

        for (module, params) in commands.in_dispatch_order() {
            if params.is_empty() {
                continue;
            }
            self.transport.send(module, params).await.map_err(|e| {
                warn!(
                    target: "encoder.controller",
                    channel = %channel,
                    module = %module,
                    error = %e,
                    "Stream command failed"
                );
                EncoderError::stream_creation(channel, e)
            })?;
        }

        self.slots.commit(config.audio_track_count());

        debug!(
            target: "encoder.controller",
            channel = %channel,
            name = %config.display_name(),
            audio_tracks = config.audio_track_count(),
            audio_slots = self.slots.used(),
            "Stream applied"
        );
        Ok(())
    }

    /// Turn off the output, video encoder and ancillary capture of each
    /// channel. Channel 1's video encoder is left running.
    ///
    /// # Errors
    ///
    /// Returns the first transport error; later modules are not touched.
    #[instrument(skip_all, fields(channels = ids.len()))]
    pub async fn disable_streams(&mut self, ids: &[ChannelId]) -> Result<()> {
        let mut stream = ParameterSet::new();
        let mut video = ParameterSet::new();
        let mut av_input = ParameterSet::new();

        for &id in ids {
            stream.push(Param::Stream(id, StreamField::Protocol), "off");
            if id.get() != PRIMARY_CHANNEL {
                video.push(Param::EncVidCodec(id), "off");
            }
            av_input.push(Param::AncEnable(id), "off");
        }

        for (module, params) in [
            (CgiModule::Stream, &stream),
            (CgiModule::Video, &video),
            (CgiModule::AvInput, &av_input),
        ] {
            if !params.is_empty() {
                self.transport.send(module, params).await?;
            }
        }

        info!(target: "encoder.controller", channels = ids.len(), "Streams disabled");
        Ok(())
    }

    /// Disable every channel and switch off all eight audio encoders.
    ///
    /// The slot count is zeroed before any command is sent, so it is zero
    /// even if the device rejects the reset.
    ///
    /// # Errors
    ///
    /// Returns the first transport error.
    #[instrument(skip_all)]
    pub async fn reset(&mut self) -> Result<()> {
        self.slots.reset();

        let channels: Vec<ChannelId> = ChannelId::all().collect();
        self.disable_streams(&channels).await?;

        let mut audio = ParameterSet::new();
        for slot in AudioSlot::all() {
            audio.push(Param::EncAudCodec(slot), "off");
        }
        self.transport.send(CgiModule::AvInput, &audio).await?;

        info!(target: "encoder.controller", "Device reset");
        Ok(())
    }

    /// Raw inquiry text for the given modules.
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged.
    #[instrument(skip_all, fields(modules = modules.len()))]
    pub async fn inquiry(&self, modules: &[CgiModule]) -> Result<String> {
        self.transport.get(&inquiry_path(modules)).await
    }

    /// Inquiry parsed into name/value pairs.
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged.
    pub async fn inquiry_values(&self, modules: &[CgiModule]) -> Result<InquiryValues> {
        let text = self.inquiry(modules).await?;
        Ok(parse_declarations(&text))
    }
}

/// `inquiry.cgi?inqjs=<m1>&inqjs=<m2>...`
pub fn inquiry_path(modules: &[CgiModule]) -> String {
    if modules.is_empty() {
        return "inquiry.cgi".to_string();
    }
    let query = modules
        .iter()
        .map(|m| format!("inqjs={m}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("inquiry.cgi?{query}")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::transport::mock::{RecordedCall, RecordingTransport};
    use crate::types::{
        AudioCodec, AudioSpec, EncodingSpec, ImageSize, OutputSpec, StereoPair, VideoCodec,
        VideoSpec,
    };

    fn description(id: u8, tracks: usize) -> StreamDescription {
        StreamDescription {
            id: ChannelId::new(id).unwrap(),
            name: None,
            input: None,
            encoding: EncodingSpec {
                video: VideoSpec {
                    codec: VideoCodec::H265,
                    image_size: ImageSize::Hd1080,
                    bitrate: 15000,
                    gop: None,
                    rate_control: None,
                    pixel_format: None,
                },
                audio: (0..tracks)
                    .map(|_| AudioSpec {
                        codec: AudioCodec::AacLc,
                        bitrate: 48000,
                        sample_rate: 48000,
                        pair: StereoPair::new(1).unwrap(),
                    })
                    .collect(),
                scte104_to_35_conversion: false,
            },
            output: OutputSpec {
                url: format!("rtp://127.0.0.1:{}", 4000 + u16::from(id) * 10),
            },
        }
    }

    fn ids(ns: &[u8]) -> Vec<ChannelId> {
        ns.iter().map(|&n| ChannelId::new(n).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_create_streams_order_and_pipeline() {
        let mut controller = StreamController::new(RecordingTransport::new());
        controller
            .create_streams(&[description(1, 1), description(2, 2)])
            .await
            .unwrap();

        let paths = controller.transport().paths();
        assert_eq!(paths.len(), 9);
        assert!(paths[0].starts_with("video.cgi?EncVidCodec1=h265"));
        assert_eq!(paths[1], "av_input.cgi?Channel1AncEnable1=off");
        assert!(paths[2].starts_with("av_input.cgi?EncAudSrcId1=0"));
        assert!(paths[3].starts_with("stream.cgi?Channel1Name1=Stream-1"));
        assert!(paths[6].starts_with("av_input.cgi?EncAudSrcId2=1"));
        assert!(paths[6].contains("EncAudSrcId3=1"));
        assert!(paths[7].contains("Channel2RTPAudio1EncId1=2&Channel2RTPAudio2EncId1=3"));
        assert_eq!(paths[8], "video.cgi?re_pipeline=on");

        assert_eq!(controller.audio_slots_used(), 3);
    }

    #[tokio::test]
    async fn test_stream_without_audio_skips_audio_command() {
        let mut controller = StreamController::new(RecordingTransport::new());
        controller.create_streams(&[description(3, 0)]).await.unwrap();

        let modules: Vec<CgiModule> = controller
            .transport()
            .sent()
            .into_iter()
            .map(|(m, _)| m)
            .collect();
        assert_eq!(
            modules,
            vec![
                CgiModule::Video,
                CgiModule::AvInput,
                CgiModule::Stream,
                CgiModule::Video
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_batch_still_rebuilds_pipeline() {
        let mut controller = StreamController::new(RecordingTransport::new());
        controller.create_streams(&[]).await.unwrap();

        assert_eq!(
            controller.transport().paths(),
            vec!["video.cgi?re_pipeline=on".to_string()]
        );
    }

    #[tokio::test]
    async fn test_slot_overflow_stops_batch_without_commands() {
        let mut controller = StreamController::new(RecordingTransport::new());
        let batch = [description(1, 4), description(2, 3), description(3, 2)];

        let err = controller.create_streams(&batch).await.unwrap_err();
        match err {
            EncoderError::StreamCreation { channel, source } => {
                assert_eq!(channel.get(), 3);
                assert!(matches!(
                    *source,
                    EncoderError::AudioSlotsExhausted {
                        requested: 9,
                        max: 8
                    }
                ));
            }
            other => panic!("expected StreamCreation, got {other:?}"),
        }

        let paths = controller.transport().paths();
        assert_eq!(paths.len(), 8);
        assert!(paths.iter().all(|p| !p.contains("Channel3")));
        assert!(paths.iter().all(|p| !p.contains("re_pipeline")));
        assert_eq!(controller.audio_slots_used(), 7);
    }

    #[tokio::test]
    async fn test_transport_failure_is_wrapped_with_channel() {
        // Stream 1 sends 4 commands; the 6th call is stream 2's ancillary set.
        let mut controller = StreamController::new(RecordingTransport::new().failing_on(6));

        let err = controller
            .create_streams(&[description(1, 1), description(2, 1)])
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Failed to create stream on channel 2"));
        assert_eq!(controller.audio_slots_used(), 1);
        assert_eq!(controller.transport().call_count(), 6);
    }

    #[tokio::test]
    async fn test_create_stream_continues_slot_count() {
        let mut controller = StreamController::new(RecordingTransport::new());
        controller.create_streams(&[description(1, 2)]).await.unwrap();
        controller.create_stream(&description(2, 1)).await.unwrap();

        assert_eq!(controller.audio_slots_used(), 3);
        let paths = controller.transport().paths();
        assert!(paths.last().unwrap().contains("Channel2RTPAudio1EncId1=3"));
        assert_eq!(
            paths.iter().filter(|p| p.contains("re_pipeline")).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_disable_keeps_primary_video() {
        let mut controller = StreamController::new(RecordingTransport::new());
        controller.disable_streams(&ids(&[1, 3])).await.unwrap();

        assert_eq!(
            controller.transport().paths(),
            vec![
                "stream.cgi?Channel1Protocol1=off&Channel3Protocol1=off".to_string(),
                "video.cgi?EncVidCodec3=off".to_string(),
                "av_input.cgi?Channel1AncEnable1=off&Channel3AncEnable1=off".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_disable_only_primary_skips_video() {
        let mut controller = StreamController::new(RecordingTransport::new());
        controller.disable_streams(&ids(&[1])).await.unwrap();

        let sent = controller.transport().sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(m, _)| *m != CgiModule::Video));
    }

    #[tokio::test]
    async fn test_reset_after_failed_batch_zeroes_slots() {
        // Stream 1 applies fully; stream 2 fails on its output command.
        let mut controller = StreamController::new(RecordingTransport::new().failing_on(8));

        let result = controller
            .create_streams(&[description(1, 2), description(2, 1)])
            .await;
        assert!(result.is_err());
        assert_eq!(controller.audio_slots_used(), 2);

        controller.reset().await.unwrap();
        assert_eq!(controller.audio_slots_used(), 0);

        let calls = controller.transport().calls();
        let last = calls.last().unwrap();
        assert_eq!(
            last.path(),
            "av_input.cgi?EncAudCodec1=off&EncAudCodec2=off&EncAudCodec3=off&EncAudCodec4=off\
             &EncAudCodec5=off&EncAudCodec6=off&EncAudCodec7=off&EncAudCodec8=off"
        );
        assert!(matches!(last, RecordedCall::Send { module: CgiModule::AvInput, .. }));
    }

    #[tokio::test]
    async fn test_reset_zeroes_slots_even_when_device_fails() {
        // Calls 1-5 apply the batch; call 7 is the reset's video command.
        let mut broken = StreamController::new(RecordingTransport::new().failing_on(7));
        broken.create_streams(&[description(1, 2)]).await.unwrap();
        assert_eq!(broken.audio_slots_used(), 2);
        assert!(broken.reset().await.is_err());
        assert_eq!(broken.audio_slots_used(), 0);
    }

    #[tokio::test]
    async fn test_inquiry_values() {
        let transport = RecordingTransport::new()
            .with_response("var EncVidCodec1 = \"h265\";\n\nvar BitRate1 = \"15000\";");
        let controller = StreamController::new(transport);

        let values = controller
            .inquiry_values(&[CgiModule::Video, CgiModule::Stream])
            .await
            .unwrap();

        assert_eq!(values.get("EncVidCodec1"), Some("h265"));
        assert_eq!(values.get("BitRate1"), Some("15000"));
        assert_eq!(
            controller.transport().paths(),
            vec!["inquiry.cgi?inqjs=video&inqjs=stream".to_string()]
        );
    }

    #[test]
    fn test_inquiry_path() {
        assert_eq!(
            inquiry_path(&[CgiModule::AvInput, CgiModule::Video, CgiModule::Encode]),
            "inquiry.cgi?inqjs=av_input&inqjs=video&inqjs=encode"
        );
        assert_eq!(inquiry_path(&[]), "inquiry.cgi");
    }
}
