//! # Encoder Test Utilities
//!
//! Shared test utilities for the encoder control crates.
//!
//! This crate provides:
//! - Device harness (`MockDevice`, a wiremock server speaking the CGI
//!   command interface)
//! - Stream fixtures (`rtp_stream`, `srt_stream`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use encoder_control::StreamController;
//! use encoder_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let device = MockDevice::start().await;
//!     device.accept_all().await;
//!
//!     let mut controller = StreamController::new(device.transport());
//!     controller.create_streams(&[rtp_stream(1, 1)]).await.unwrap();
//!
//!     let commands = device.received_commands().await;
//!     assert_eq!(commands.last().unwrap().module, "video");
//! }
//! ```

pub mod device_harness;
pub mod fixtures;

// Re-export commonly used items
pub use device_harness::*;
pub use fixtures::*;
