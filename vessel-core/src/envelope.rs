//! The RPC envelope and the typed method catalog.
//!
//! Every message on the wire is one [`RpcEnvelope`]: an `action` string
//! (`Call_<Method>` on the way in, `Result_<Method>` on the way out) and an
//! optional `data` string holding the method payload. Correlation identity
//! never rides inside the envelope; it travels as delivery metadata.
//!
//! Incoming requests are decoded through [`ServiceRequest`], a tagged union
//! keyed by the action string — each variant carries its concretely-typed
//! payload, so dynamic shapes never leak past the protocol edge.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::codec::{CodecError, MessageCodec};
use crate::wire_messages;

/// The four operations a client may invoke on the container service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read the current derived pressure.
    GetPressure,
    /// Read the destroyed flag.
    IsDestroyed,
    /// Add mass, subject to the lower pressure threshold.
    IncreaseMass,
    /// Remove mass, subject to the upper pressure threshold.
    DecreaseMass,
}

impl Method {
    /// Every method, in catalog order.
    pub const ALL: [Method; 4] = [
        Method::GetPressure,
        Method::IsDestroyed,
        Method::IncreaseMass,
        Method::DecreaseMass,
    ];

    /// The bare method name as it appears inside action strings.
    pub const fn name(self) -> &'static str {
        match self {
            Method::GetPressure => "GetPressure",
            Method::IsDestroyed => "IsDestroyed",
            Method::IncreaseMass => "IncreaseMass",
            Method::DecreaseMass => "DecreaseMass",
        }
    }

    /// Action string for a request envelope.
    pub const fn call_action(self) -> &'static str {
        match self {
            Method::GetPressure => "Call_GetPressure",
            Method::IsDestroyed => "Call_IsDestroyed",
            Method::IncreaseMass => "Call_IncreaseMass",
            Method::DecreaseMass => "Call_DecreaseMass",
        }
    }

    /// Action string for a response envelope.
    pub const fn result_action(self) -> &'static str {
        match self {
            Method::GetPressure => "Result_GetPressure",
            Method::IsDestroyed => "Result_IsDestroyed",
            Method::IncreaseMass => "Result_IncreaseMass",
            Method::DecreaseMass => "Result_DecreaseMass",
        }
    }

    /// Resolve a request action string back to its method.
    pub fn from_call_action(action: &str) -> Option<Method> {
        Method::ALL.into_iter().find(|m| m.call_action() == action)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Wire envelope carried in every delivery, both directions.
///
/// `data` holds the method payload serialized as a JSON string, or `None`
/// for payload-less requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcEnvelope {
    /// `Call_<Method>` or `Result_<Method>`.
    pub action: String,
    /// Serialized method payload, if the method carries one.
    pub data: Option<String>,
}

impl RpcEnvelope {
    /// Build a payload-less request envelope.
    pub fn call(method: Method) -> Self {
        Self {
            action: method.call_action().to_string(),
            data: None,
        }
    }

    /// Build a request envelope carrying a payload.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the payload cannot be serialized.
    pub fn call_with<T, C>(method: Method, payload: &T, codec: &C) -> Result<Self, CodecError>
    where
        T: Serialize,
        C: MessageCodec,
    {
        Ok(Self {
            action: method.call_action().to_string(),
            data: Some(encode_data(payload, codec)?),
        })
    }

    /// Build a response envelope carrying a payload.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the payload cannot be serialized.
    pub fn result<T, C>(method: Method, payload: &T, codec: &C) -> Result<Self, CodecError>
    where
        T: Serialize,
        C: MessageCodec,
    {
        Ok(Self {
            action: method.result_action().to_string(),
            data: Some(encode_data(payload, codec)?),
        })
    }

    /// Decode the payload into its concrete type.
    ///
    /// # Errors
    ///
    /// Fails with [`DecodeError::MissingPayload`] if `data` is absent, or a
    /// codec error if the payload does not parse as `T`.
    pub fn decode_data<T, C>(&self, codec: &C) -> Result<T, DecodeError>
    where
        T: DeserializeOwned,
        C: MessageCodec,
    {
        let data = self.data.as_ref().ok_or_else(|| DecodeError::MissingPayload {
            action: self.action.clone(),
        })?;
        Ok(codec.decode(data.as_bytes())?)
    }
}

fn encode_data<T, C>(payload: &T, codec: &C) -> Result<String, CodecError>
where
    T: Serialize,
    C: MessageCodec,
{
    let bytes = codec.encode(payload)?;
    String::from_utf8(bytes).map_err(|e| CodecError::Encode(Box::new(e)))
}

/// Failure to interpret an envelope.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The action string names no known method.
    #[error("unknown action {action:?}")]
    UnknownAction {
        /// The unrecognized action string.
        action: String,
    },

    /// The method requires a payload but `data` was absent.
    #[error("missing payload for {action}")]
    MissingPayload {
        /// Action of the offending envelope.
        action: String,
    },

    /// The payload bytes did not parse as the method's payload type.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

wire_messages! {
    /// Response payload of `GetPressure`: the derived pressure.
    #[serde(rename_all = "PascalCase")]
    pub struct PressureReading {
        /// Current pressure, `mass * temperature / 22.4`.
        pub value: f64,
    }

    /// Response payload of `IsDestroyed`.
    #[serde(rename_all = "PascalCase")]
    pub struct DestroyedFlag {
        /// Whether the container is currently destroyed.
        pub value: bool,
    }

    /// Request payload of `IncreaseMass` and `DecreaseMass`.
    #[serde(rename_all = "PascalCase")]
    pub struct MassDelta {
        /// Amount of mass to add or remove.
        pub mass: f64,
    }

    /// Response payload of `IncreaseMass` and `DecreaseMass`.
    ///
    /// A rejected adjustment is a successfully-delivered result, not an
    /// error; `failure_reason` is absent on success.
    #[serde(rename_all = "PascalCase")]
    pub struct MassOutcome {
        /// Whether the adjustment was applied.
        pub is_success: bool,
        /// Why the adjustment was rejected, absent on success.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        pub failure_reason: Option<String>,
    }
}

/// A fully-decoded incoming request.
///
/// The decoder is the schema registry: the action string selects the
/// variant, and the variant's payload type decides how `data` is parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceRequest {
    /// `Call_GetPressure`, no payload.
    GetPressure,
    /// `Call_IsDestroyed`, no payload.
    IsDestroyed,
    /// `Call_IncreaseMass` with its mass delta.
    IncreaseMass(MassDelta),
    /// `Call_DecreaseMass` with its mass delta.
    DecreaseMass(MassDelta),
}

impl ServiceRequest {
    /// Decode a request envelope into its typed form.
    ///
    /// # Errors
    ///
    /// Fails on unknown actions, missing payloads and malformed payloads;
    /// the caller is expected to log and drop such envelopes.
    pub fn decode<C: MessageCodec>(envelope: &RpcEnvelope, codec: &C) -> Result<Self, DecodeError> {
        let method =
            Method::from_call_action(&envelope.action).ok_or_else(|| DecodeError::UnknownAction {
                action: envelope.action.clone(),
            })?;
        match method {
            Method::GetPressure => Ok(ServiceRequest::GetPressure),
            Method::IsDestroyed => Ok(ServiceRequest::IsDestroyed),
            Method::IncreaseMass => Ok(ServiceRequest::IncreaseMass(envelope.decode_data(codec)?)),
            Method::DecreaseMass => Ok(ServiceRequest::DecreaseMass(envelope.decode_data(codec)?)),
        }
    }

    /// The method this request invokes.
    pub fn method(&self) -> Method {
        match self {
            ServiceRequest::GetPressure => Method::GetPressure,
            ServiceRequest::IsDestroyed => Method::IsDestroyed,
            ServiceRequest::IncreaseMass(_) => Method::IncreaseMass,
            ServiceRequest::DecreaseMass(_) => Method::DecreaseMass,
        }
    }
}
