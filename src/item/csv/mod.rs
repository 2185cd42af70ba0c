/// Delimited text output for typed records.
///
/// This module turns [`Record`](crate::core::record::Record)s into lines of
/// comma-separated text, one record per line, fields in column order.
///
/// # Null handling
///
/// A null field is written as the two characters `\N`. A non-null value that
/// contains `\N` has each occurrence written as `"\N"`, so a reader can tell
/// a real null apart from data holding that sequence. This substitution is
/// applied before the row reaches the CSV emitter, which then applies its own
/// quoting to values holding the delimiter, a quote or a line break.
///
/// # Numbers
///
/// Doubles always carry a fractional part (`1.0`), use `1.0E20` style
/// notation below `1e-3` and from `1e7` on, and write non-finite values as
/// `NaN`, `Infinity` and `-Infinity`, so a double column never reads like a
/// bigint one.
///
/// # Charsets
///
/// String payloads are raw bytes. They are decoded with the writer's
/// [`Charset`](charset::Charset) and a payload that is not valid in that
/// charset fails the write. The produced text is encoded back with the same
/// charset.
///
/// # Counters
///
/// A writer can report to a record counter and a byte counter. Both are
/// incremented once, when the writer is closed successfully, so they only
/// ever account for complete outputs.
pub mod charset;

pub mod record_writer;
