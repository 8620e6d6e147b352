//! Encoder Control Library
//!
//! Control-plane client for SDI-to-IP hardware encoders that expose their
//! configuration as HTTP CGI endpoints with positionally named parameters
//! (`EncVidCodec1`, `Channel2RTPclientPort1`, ...).
//!
//! A caller describes streams as typed values; the library turns each one
//! into the device's parameter sets, assigns the shared audio encoders
//! across the batch, and delivers the commands over a retrying HTTP
//! transport.
//!
//! # Architecture
//!
//! ```text
//! controller -> encode/*.rs -> params.rs
//!            -> allocator.rs
//!            -> transport/ -> retry.rs
//!            -> inquiry.rs
//! ```
//!
//! # Modules
//!
//! - `allocator` - Audio encoder slot allocation across a batch
//! - `config` - Client configuration from environment
//! - `controller` - Stream orchestration (`StreamController`)
//! - `encode` - Stream configuration to parameter set encoding
//! - `errors` - Error types
//! - `inquiry` - Inquiry response parsing
//! - `params` - Device parameter names and parameter sets
//! - `retry` - Fixed-delay retry policy
//! - `transport` - HTTP command transport and test mock
//! - `types` - Stream description data model
//!
//! # Example
//!
//! ```rust,no_run
//! use encoder_control::config::ClientConfig;
//! use encoder_control::controller::StreamController;
//! use encoder_control::types::StreamDescription;
//!
//! # async fn run(descriptions: Vec<StreamDescription>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let mut controller = StreamController::new(config.transport()?);
//!
//! controller.reset().await?;
//! controller.create_streams(&descriptions).await?;
//! # Ok(())
//! # }
//! ```

pub mod allocator;
pub mod config;
pub mod controller;
pub mod encode;
pub mod errors;
pub mod inquiry;
pub mod params;
pub mod retry;
pub mod transport;
pub mod types;

pub use controller::StreamController;
pub use errors::{EncoderError, Result};
pub use transport::{CommandTransport, HttpTransport};
