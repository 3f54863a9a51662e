//! # Envelope Codec
//!
//! The self-contained wire message and its canonical JSON form.
//!
//! ## Wire Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ENVELOPE (type = message)                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  type           "message"                              required        │
//! │  from           sender principal                       required        │
//! │  to             recipient principal                    required        │
//! │  ciphertext     base64 RSA-OAEP ciphertext             required        │
//! │  signature      base64 Ed25519 over ciphertext bytes   optional        │
//! │  sender_pub     base64 SPKI encryption key             optional        │
//! │  sender_pubsig  base64 SPKI signing key                optional        │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                         NOTICE (type = system)                          │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  from           announcing principal                   optional        │
//! │  message        relay status text                      optional        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Fields are emitted in the order above; absent optional fields are
//! omitted rather than written as `null`. Unknown extra fields are ignored
//! on decode.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single encrypted, optionally signed message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sender principal
    pub from: String,
    /// Recipient principal; advisory, enforced by the receiver
    pub to: String,
    /// RSA-OAEP ciphertext
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    /// Ed25519 signature over `ciphertext`
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_opt")]
    pub signature: Option<Vec<u8>>,
    /// Sender's encryption public key (SPKI), for bootstrap
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_opt")]
    pub sender_pub: Option<Vec<u8>>,
    /// Sender's signing public key (SPKI), for bootstrap
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_opt")]
    pub sender_pubsig: Option<Vec<u8>>,
}

/// How a received envelope can be authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authentication<'a> {
    /// No signature present
    Unsigned,
    /// Signature plus the signer's key embedded in the envelope
    Embedded {
        /// Signature bytes
        signature: &'a [u8],
        /// Embedded SPKI signing key
        signing_key: &'a [u8],
    },
    /// Signature present; the signing key must come from the directory
    Lookup {
        /// Signature bytes
        signature: &'a [u8],
    },
}

impl Envelope {
    /// Classify which authentication material this envelope carries
    pub fn authentication(&self) -> Authentication<'_> {
        match (&self.signature, &self.sender_pubsig) {
            (None, _) => Authentication::Unsigned,
            (Some(signature), Some(key)) => Authentication::Embedded {
                signature,
                signing_key: key,
            },
            (Some(signature), None) => Authentication::Lookup { signature },
        }
    }
}

/// Presence / status notice; carries no cryptographic payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemNotice {
    /// Principal announcing itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Free-form status text from the relay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SystemNotice {
    /// Presence announcement for `principal`
    pub fn presence(principal: impl Into<String>) -> Self {
        Self {
            from: Some(principal.into()),
            message: None,
        }
    }
}

/// A decoded relay frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// An encrypted message
    Envelope(Envelope),
    /// A presence or status notice
    System(SystemNotice),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InboundFrame {
    Message(Envelope),
    System(SystemNotice),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutboundFrame<'a> {
    Message(&'a Envelope),
    System(&'a SystemNotice),
}

/// Serialize an envelope to its canonical wire bytes
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>> {
    serde_json::to_vec(&OutboundFrame::Message(envelope))
        .map_err(|e| Error::Internal(format!("envelope serialization failed: {}", e)))
}

/// Serialize a system notice to wire bytes
pub fn encode_notice(notice: &SystemNotice) -> Result<Vec<u8>> {
    serde_json::to_vec(&OutboundFrame::System(notice))
        .map_err(|e| Error::Internal(format!("notice serialization failed: {}", e)))
}

/// Strictly parse wire bytes into an envelope
///
/// Anything other than a well-formed `type: "message"` frame is
/// [`Error::MalformedEnvelope`].
pub fn decode(bytes: &[u8]) -> Result<Envelope> {
    match decode_frame(bytes)? {
        Frame::Envelope(envelope) => Ok(envelope),
        Frame::System(_) => Err(Error::MalformedEnvelope(
            "system notice is not an envelope".into(),
        )),
    }
}

/// Parse wire bytes into either an envelope or a system notice
pub fn decode_frame(bytes: &[u8]) -> Result<Frame> {
    let frame: InboundFrame =
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedEnvelope(e.to_string()))?;
    Ok(match frame {
        InboundFrame::Message(envelope) => Frame::Envelope(envelope),
        InboundFrame::System(notice) => Frame::System(notice),
    })
}

/// Serde helper for byte vectors as standard base64
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

/// Serde helper for optional byte vectors as standard base64
mod base64_opt {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

// ============================================================================
// TESTS
// ============================================================================
