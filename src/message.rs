//! Typed payload encoding for messages carried in an [`Envelope`].
//!
//! [`Envelope`]: crate::envelope::Envelope

use bincode::{
    BorrowDecode,
    Encode,
    borrow_decode_from_slice,
    config,
    encode_to_vec,
    error::{DecodeError, EncodeError},
};

/// Wrapper trait for application message types.
///
/// Any type deriving [`Encode`] and [`BorrowDecode`] automatically implements
/// this trait via a blanket implementation. Typed adjustment functions use it
/// to decode a payload, shrink it and encode the result again.
pub trait Message: Encode + for<'de> BorrowDecode<'de, ()> {
    /// Serialize the message into a byte vector.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if serialization fails.
    fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> { encode_to_vec(self, config::standard()) }

    /// Deserialize a message from a byte slice, returning the message and
    /// the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if deserialization fails.
    fn from_bytes(bytes: &[u8]) -> Result<(Self, usize), DecodeError>
    where
        Self: Sized,
    {
        borrow_decode_from_slice(bytes, config::standard())
    }
}

impl<T> Message for T where for<'de> T: Encode + BorrowDecode<'de, ()> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(bincode::Encode, bincode::Decode, Debug, PartialEq, Eq)]
    struct Note {
        body: String,
    }

    #[test]
    fn decodes_what_it_encodes() {
        let note = Note {
            body: "hello".into(),
        };
        let bytes = note.to_bytes().expect("encode note");
        let (decoded, used) = Note::from_bytes(&bytes).expect("decode note");
        assert_eq!(decoded, note);
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn truncated_bytes_fail_to_decode() {
        let bytes = Note {
            body: "hello".into(),
        }
        .to_bytes()
        .expect("encode note");
        assert!(Note::from_bytes(&bytes[..2]).is_err());
    }
}
