use derive_more::Display;

/// Why an album directory or a source file was left out of a run.
///
/// None of these stop the run; they are logged and the item is treated as if
/// it wasn't there (a skipped source has no expected output, so whatever it
/// produced before is reconciled away).
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    #[display("name does not start with a year between 1900 and 2200")]
    InvalidYear,
    #[display("name is not valid UTF-8")]
    NotUtf8,
    #[display("no source directory")]
    MissingSources,
    #[display("not a regular file")]
    NotAFile,
    #[display("not a WAV file")]
    NotWav,
    #[display("incorrect file name format")]
    InvalidName,
    #[display("another source already produces this output")]
    DuplicateOutput,
    #[display("source disappeared before it could be read")]
    Vanished,
}
