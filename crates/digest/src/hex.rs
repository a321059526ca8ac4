use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Hex-encoded BLAKE3 digest.
///
/// Always [`Digest::HEX_LEN`] lowercase hexadecimal characters. Construct one
/// by hashing something, or by parsing previously persisted text with
/// [`FromStr`] (which validates and lowercases).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest(String);

impl Digest {
    /// Length of the hex representation (32 bytes, two characters each).
    pub const HEX_LEN: usize = blake3::OUT_LEN * 2;

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<blake3::Hash> for Digest {
    fn from(hash: blake3::Hash) -> Self {
        Self(hash.to_hex().to_string())
    }
}

impl FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            exn::bail!(ErrorKind::InvalidDigest(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
