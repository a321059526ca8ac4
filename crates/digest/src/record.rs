use crate::Digest;
use std::fmt::Display;

const PRESENT: u8 = 0x00;
const ABSENT: u8 = 0x01;
const TERMINATOR: u8 = 0x00;

/// Folds an ordered sequence of named fields into a single [`Digest`].
///
/// Each field contributes its name, a presence tag and (when present) its
/// [`Display`] value followed by a terminator byte. Fields are hashed in the
/// order they are added: there is no canonicalising sort, so the caller owns
/// the field order and must keep it in one place.
///
/// ```
/// use platter_digest::RecordHasher;
///
/// let key = RecordHasher::new()
///     .field("title", "Song")
///     .field("track", 1)
///     .optional("arthash", None::<&str>)
///     .finish();
/// assert_eq!(key.as_str().len(), 64);
/// ```
#[derive(Debug, Default, Clone)]
pub struct RecordHasher {
    hasher: blake3::Hasher,
}

impl RecordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field that always has a value.
    #[must_use]
    pub fn field(mut self, name: &str, value: impl Display) -> Self {
        self.hasher.update(name.as_bytes());
        self.hasher.update(&[PRESENT]);
        self.hasher.update(value.to_string().as_bytes());
        self.hasher.update(&[TERMINATOR]);
        self
    }

    /// Appends a field that may be absent. An absent value hashes differently
    /// from an empty one.
    #[must_use]
    pub fn optional(self, name: &str, value: Option<impl Display>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => {
                let mut this = self;
                this.hasher.update(name.as_bytes());
                this.hasher.update(&[ABSENT]);
                this
            },
        }
    }

    #[must_use]
    pub fn finish(self) -> Digest {
        self.hasher.finalize().into()
    }
}
