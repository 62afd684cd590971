//! Single-frame message value.
//!
//! A [`Message`] is one ZeroMQ frame backed by a refcounted [`Bytes`] buffer.
//! Whether more frames follow is not part of the value: senders pass it with
//! the call and receivers read it back with `has_more()`.

use bytes::Bytes;
use std::fmt;
use std::ops::Deref;

use crate::error::{Error, Result};

/// One message frame.
///
/// # Examples
///
/// ```
/// use zbaton::Message;
///
/// let frame = Message::from("hello");
/// assert_eq!(frame.len(), 5);
/// assert_eq!(frame.as_str(), Some("hello"));
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Message(Bytes);

impl Message {
    /// Create an empty frame.
    #[must_use]
    pub const fn new() -> Self {
        Self(Bytes::new())
    }

    /// Wrap a static slice without copying.
    #[must_use]
    pub const fn from_static(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }

    /// Copy a slice into a new frame.
    #[must_use]
    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The frame as UTF-8, if it is valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Borrow the underlying buffer.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.0
    }

    /// Consume the frame and return the underlying buffer.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Serialize `value` as a JSON frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if serialization fails.
    #[cfg(feature = "serde")]
    pub fn from_json<T: serde::Serialize>(value: &T) -> Result<Self> {
        serde_json::to_vec(value)
            .map(|json| Self(Bytes::from(json)))
            .map_err(|e| Error::decode(e.to_string()))
    }

    /// Parse the frame as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the frame isn't valid JSON for `T`.
    #[cfg(feature = "serde")]
    pub fn read_json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.0).map_err(|e| Error::decode(e.to_string()))
    }

    /// Parse the frame as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the frame isn't valid UTF-8.
    pub fn read_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.0).map_err(|e| Error::decode(e.to_string()))
    }
}

impl Deref for Message {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Bytes> for Message {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for Message {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Message {
    fn from(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }
}

impl<const N: usize> From<&'static [u8; N]> for Message {
    fn from(bytes: &'static [u8; N]) -> Self {
        Self(Bytes::from_static(bytes))
    }
}

impl From<&'static str> for Message {
    fn from(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl From<Message> for Bytes {
    fn from(msg: Message) -> Self {
        msg.0
    }
}

impl PartialEq<[u8]> for Message {
    fn eq(&self, other: &[u8]) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Message {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(text) => f.debug_tuple("Message").field(&text).finish(),
            None => f.debug_tuple("Message").field(&self.0).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Message::from("abc"), "abc");
        assert_eq!(Message::from(vec![1u8, 2, 3]), [1u8, 2, 3][..]);
        assert_eq!(Message::from(b"raw"), "raw");
        assert_eq!(Message::from(String::from("owned")).len(), 5);
        assert!(Message::new().is_empty());

        let bytes: Bytes = Message::copy_from_slice(b"xy").into();
        assert_eq!(&bytes[..], b"xy");
    }

    #[test]
    fn test_read_str() {
        assert_eq!(Message::from("topic").read_str().unwrap(), "topic");
        let invalid = Message::from(vec![0xff, 0xfe]);
        assert!(invalid.as_str().is_none());
        assert!(matches!(invalid.read_str(), Err(Error::Decode(_))));
    }

    #[test]
    fn test_debug_prefers_text() {
        assert_eq!(format!("{:?}", Message::from("hi")), "Message(\"hi\")");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_frame() {
        use serde::{Deserialize, Serialize};

        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Reading {
            sensor: String,
            value: i32,
        }

        let reading = Reading {
            sensor: "temp".to_string(),
            value: 21,
        };
        let frame = Message::from_json(&reading).unwrap();
        assert_eq!(frame.read_json::<Reading>().unwrap(), reading);
        assert!(matches!(
            Message::from("not json").read_json::<Reading>(),
            Err(Error::Decode(_))
        ));
    }
}
