//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for device credentials. Any struct
//! that derives `Debug` and holds a `SecretString` prints `[REDACTED]` in
//! place of the value, so a config dumped through `tracing` never leaks the
//! encoder's password.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct DeviceLogin {
//!     username: String,
//!     password: SecretString,
//! }
//!
//! let login = DeviceLogin {
//!     username: "root".to_string(),
//!     password: SecretString::from("edgeedge"),
//! };
//!
//! assert!(!format!("{login:?}").contains("edgeedge"));
//! let password: &str = login.password.expose_secret();
//! assert_eq!(password, "edgeedge");
//! ```

pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("321321");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("321321"));
    }

    #[test]
    fn test_expose_secret_returns_inner_value() {
        let secret = SecretString::from("password123");
        assert_eq!(secret.expose_secret(), "password123");
    }

    #[test]
    fn test_deserialize_device_credentials() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct Credentials {
            username: String,
            password: SecretString,
        }

        let json = r#"{"username": "root", "password": "my-secret-value"}"#;
        let creds: Credentials = serde_json::from_str(json).expect("deserialize");

        assert_eq!(creds.password.expose_secret(), "my-secret-value");

        let debug = format!("{creds:?}");
        assert!(debug.contains("root"));
        assert!(!debug.contains("my-secret-value"));
    }
}
