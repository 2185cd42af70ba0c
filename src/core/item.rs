use crate::error::BatchError;

/// Result of an item writer operation.
pub type ItemWriterResult = Result<(), BatchError>;

/// A sink driven by the surrounding pipeline, one chunk of items at a time.
///
/// `open` is called once before the first chunk and `close` once after the
/// last one. Implementations that hold resources must release them in `close`.
pub trait ItemWriter<W> {
    /// Writes the items in order.
    fn write(&self, items: &[W]) -> ItemWriterResult;

    /// Pushes buffered output to the underlying destination.
    fn flush(&self) -> ItemWriterResult;

    fn open(&self) -> ItemWriterResult {
        Ok(())
    }

    fn close(&self) -> ItemWriterResult {
        Ok(())
    }
}
