//! Response envelope: the `Ok`/`Err` wrapper around every remote call result.
//!
//! Wire form: `{"Ok": value}` or `{"Err": "message"}`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Success/failure wrapper returned by every remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Envelope<T> {
    Ok(T),
    Err(String),
}

impl<T> Envelope<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self {
            Envelope::Ok(v) => Envelope::Ok(f(v)),
            Envelope::Err(message) => Envelope::Err(message),
        }
    }
}

impl<T> From<std::result::Result<T, String>> for Envelope<T> {
    fn from(r: std::result::Result<T, String>) -> Self {
        match r {
            Ok(v) => Envelope::Ok(v),
            Err(message) => Envelope::Err(message),
        }
    }
}

/// Message used when the remote produced no envelope at all.
pub const NO_RESPONSE: &str = "no response from remote";

/// Turn an envelope (or its absence) into a value or a domain error.
pub fn unwrap<T>(envelope: Option<Envelope<T>>) -> Result<T> {
    match envelope {
        Some(Envelope::Ok(v)) => Ok(v),
        Some(Envelope::Err(message)) => Err(Error::RemoteCallFailed(message)),
        None => Err(Error::RemoteCallFailed(NO_RESPONSE.to_string())),
    }
}

/// Same as [`unwrap`], but the error names the chunk that failed.
pub fn unwrap_chunk<T>(index: u64, envelope: Option<Envelope<T>>) -> Result<T> {
    unwrap(envelope).map_err(|e| match e {
        Error::RemoteCallFailed(message) => Error::ChunkFailed { index, message },
        other => other,
    })
}

/// Serde adapter for the "zero- or one-element sequence" idiom the remote
/// uses for optional values: `[]` is `None`, `[x]` is `Some(x)`.
///
/// ```ignore
/// #[serde(with = "asynce_core::envelope::opt_seq")]
/// pub picture: Option<Vec<u8>>,
/// ```
pub mod opt_seq {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(v) => [v].serialize(serializer),
            None => Vec::<&T>::new().serialize(serializer),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let mut items = Vec::<T>::deserialize(deserializer)?;
        match items.len() {
            0 => Ok(None),
            1 => Ok(items.pop()),
            n => Err(de::Error::invalid_length(n, &"a sequence of at most one element")),
        }
    }
}

/// An optional value as the remote encodes it at the top level of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    transparent,
    bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>")
)]
pub struct OptSeq<T>(#[serde(with = "opt_seq")] pub Option<T>);

impl<T> From<OptSeq<T>> for Option<T> {
    fn from(v: OptSeq<T>) -> Self {
        v.0
    }
}
