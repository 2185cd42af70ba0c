use std::{
    borrow::Cow,
    cell::{Cell, RefCell},
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use csv::{Writer, WriterBuilder};
use log::{debug, error};

use crate::{
    core::{
        counter::Counter,
        item::{ItemWriter, ItemWriterResult},
        record::{FieldType, Record, Value},
    },
    error::BatchError,
    item::csv::charset::Charset,
};

/// Text written in place of a null field.
pub const NULL_TOKEN: &str = "\\N";

/// Replacement for a literal [`NULL_TOKEN`] found inside a non-null value.
pub const QUOTED_NULL_TOKEN: &str = "\"\\N\"";

/// Counter shared between the writers of a pipeline.
pub type SharedCounter = Arc<dyn Counter + Send + Sync>;

/// Escapes a column value so that a null can be told apart from a value containing `\N`.
///
/// ```
/// use record_sink_rs::item::csv::record_writer::encode_column_value;
///
/// assert_eq!(encode_column_value(None), "\\N");
/// assert_eq!(encode_column_value(Some("a\\Nb")), "a\"\\N\"b");
/// assert_eq!(encode_column_value(Some("plain")), "plain");
/// ```
pub fn encode_column_value(value: Option<&str>) -> Cow<'_, str> {
    match value {
        None => Cow::Borrowed(NULL_TOKEN),
        Some(value) if value.contains(NULL_TOKEN) => {
            Cow::Owned(value.replace(NULL_TOKEN, QUOTED_NULL_TOKEN))
        }
        Some(value) => Cow::Borrowed(value),
    }
}

/// Reverses [`encode_column_value`] for a column read back from the output.
pub fn decode_column_value(value: &str) -> Option<String> {
    if value == NULL_TOKEN {
        None
    } else {
        Some(value.replace(QUOTED_NULL_TOKEN, NULL_TOKEN))
    }
}

/// Byte-counting wrapper around the sink handed to the emitter.
struct CountingWrite<W> {
    inner: W,
    written: Arc<AtomicU64>,
}

impl<W: Write> Write for CountingWrite<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

enum State<W: Write> {
    Open(Writer<CountingWrite<W>>),
    Closed,
}

/// Writes typed records as delimited text lines.
///
/// Null fields are written as `\N`, and every `\N` found inside a value is
/// written as `"\N"`. The record and byte counters, when set, are
/// incremented once, by a successful [`close`](RecordItemWriter::close).
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use record_sink_rs::core::counter::LongCounter;
/// use record_sink_rs::core::record::{Column, FieldType, Record, Schema, Value};
/// use record_sink_rs::item::csv::record_writer::RecordItemWriterBuilder;
///
/// let schema = Arc::new(Schema::new(vec![
///     Column::new("name", FieldType::String),
///     Column::new("age", FieldType::Bigint),
/// ]));
/// let records = Arc::new(LongCounter::new("records"));
///
/// let mut buffer = Vec::new();
/// let writer = RecordItemWriterBuilder::new()
///     .record_counter(records.clone())
///     .from_writer(&mut buffer);
///
/// writer.write_record(&Record::new(schema.clone(), vec!["Alice".into(), 30i64.into()])).unwrap();
/// writer.write_record(&Record::new(schema, vec![Value::Null, 25i64.into()])).unwrap();
/// writer.close().unwrap();
/// drop(writer);
///
/// assert_eq!(String::from_utf8(buffer).unwrap(), "Alice,30\n\\N,25\n");
/// assert_eq!(records.value(), 2);
/// ```
pub struct RecordItemWriter<W: Write = File> {
    state: RefCell<State<W>>,
    path: Option<PathBuf>,
    written: Arc<AtomicU64>,
    charset: Charset,
    count: Cell<u64>,
    record_counter: Option<SharedCounter>,
    byte_counter: Option<SharedCounter>,
}

impl<W: Write> RecordItemWriter<W> {
    /// Encodes a record and appends it as one row.
    pub fn write_record(&self, record: &Record) -> ItemWriterResult {
        let mut state = self.state.borrow_mut();
        let State::Open(emitter) = &mut *state else {
            return Err(BatchError::Closed);
        };

        let row = self.encode_record(record)?;

        emitter.write_record(&row).map_err(|e| {
            error!("Unable to write record {}: {}", self.count.get() + 1, e);
            BatchError::Write(e)
        })?;

        self.count.set(self.count.get() + 1);
        Ok(())
    }

    fn encode_record(&self, record: &Record) -> Result<Vec<Vec<u8>>, BatchError> {
        let columns = record.columns();

        record
            .values()
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let field_type = columns.get(index).map(|column| column.field_type);
                let raw = self.to_text(index, field_type, value)?;
                let escaped = encode_column_value(raw.as_deref());
                let bytes = self
                    .charset
                    .encode(&escaped)
                    .map_err(|source| BatchError::Encode { index, source })?;
                Ok(bytes.into_owned())
            })
            .collect()
    }

    fn to_text(
        &self,
        index: usize,
        field_type: Option<FieldType>,
        value: &Value,
    ) -> Result<Option<String>, BatchError> {
        match value {
            Value::Null => Ok(None),
            Value::String(bytes) => self
                .charset
                .decode(bytes)
                .map(Some)
                .map_err(|source| BatchError::Decode { index, source }),
            other if field_type == Some(FieldType::String) => Err(BatchError::FieldType {
                index,
                expected: FieldType::String,
                found: other.kind(),
            }),
            other => Ok(Some(other.to_string())),
        }
    }

    /// Flushes the emitter, releases the output and reports the counters.
    ///
    /// Only the first call does anything. The writer is closed even when
    /// flushing fails, in which case no counter is incremented.
    pub fn close(&self) -> ItemWriterResult {
        let State::Open(emitter) = self.state.replace(State::Closed) else {
            debug!("Writer already closed");
            return Ok(());
        };

        // into_inner flushes both the emitter buffer and the sink
        let sink = emitter.into_inner().map_err(|e| {
            error!("Unable to close output: {}", e.error());
            BatchError::Flush(e.into_error())
        })?;
        drop(sink);

        let count = self.count.get();
        let len = if self.byte_counter.is_some() {
            Some(self.get_len()?)
        } else {
            None
        };

        if let Some(counter) = &self.record_counter {
            counter.increment(count);
        }
        if let (Some(counter), Some(len)) = (&self.byte_counter, len) {
            counter.increment(len);
        }

        debug!("Writer closed: {} records, {:?} bytes", count, len);
        Ok(())
    }

    /// Current size of the output.
    ///
    /// For a file this is the size seen by the filesystem; for any other sink,
    /// the number of bytes it has accepted so far.
    pub fn get_len(&self) -> Result<u64, BatchError> {
        match &self.path {
            Some(path) => fs::metadata(path)
                .map(|metadata| metadata.len())
                .map_err(|source| BatchError::Length {
                    path: path.clone(),
                    source,
                }),
            None => Ok(self.written.load(Ordering::Relaxed)),
        }
    }

    /// Number of records written so far.
    pub fn count(&self) -> u64 {
        self.count.get()
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.state.borrow(), State::Closed)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }
}

impl<W: Write> ItemWriter<Record> for RecordItemWriter<W> {
    fn write(&self, items: &[Record]) -> ItemWriterResult {
        for item in items {
            self.write_record(item)?;
        }
        Ok(())
    }

    fn flush(&self) -> ItemWriterResult {
        match &mut *self.state.borrow_mut() {
            State::Open(emitter) => emitter
                .flush()
                .map_err(BatchError::Flush),
            State::Closed => Ok(()),
        }
    }

    fn close(&self) -> ItemWriterResult {
        RecordItemWriter::close(self)
    }
}

/// Builder for [`RecordItemWriter`]. Fields are comma separated unless
/// [`delimiter`](RecordItemWriterBuilder::delimiter) says otherwise.
pub struct RecordItemWriterBuilder {
    delimiter: u8,
    charset: Charset,
    record_counter: Option<SharedCounter>,
    byte_counter: Option<SharedCounter>,
}

impl Default for RecordItemWriterBuilder {
    fn default() -> Self {
        RecordItemWriterBuilder {
            delimiter: b',',
            charset: Charset::default(),
            record_counter: None,
            byte_counter: None,
        }
    }
}

impl RecordItemWriterBuilder {
    pub fn new() -> RecordItemWriterBuilder {
        Self::default()
    }

    pub fn delimiter(mut self, delimiter: u8) -> RecordItemWriterBuilder {
        self.delimiter = delimiter;
        self
    }

    pub fn charset(mut self, charset: Charset) -> RecordItemWriterBuilder {
        self.charset = charset;
        self
    }

    pub fn record_counter(mut self, counter: SharedCounter) -> RecordItemWriterBuilder {
        self.record_counter = Some(counter);
        self
    }

    pub fn byte_counter(mut self, counter: SharedCounter) -> RecordItemWriterBuilder {
        self.byte_counter = Some(counter);
        self
    }

    /// Creates (or truncates) the file at `path` and binds a writer to it.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<RecordItemWriter<File>, BatchError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| {
            error!("Unable to open {}: {}", path.display(), source);
            BatchError::Open {
                path: path.clone(),
                source,
            }
        })?;

        debug!("Writing records to {} as {}", path.display(), self.charset);
        Ok(self.build(file, Some(path)))
    }

    pub fn from_writer<W: Write>(self, wtr: W) -> RecordItemWriter<W> {
        self.build(wtr, None)
    }

    fn build<W: Write>(self, wtr: W, path: Option<PathBuf>) -> RecordItemWriter<W> {
        let written = Arc::new(AtomicU64::new(0));
        let sink = CountingWrite {
            inner: wtr,
            written: Arc::clone(&written),
        };

        // Row width is the caller's concern, hence flexible.
        let emitter = WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_writer(sink);

        RecordItemWriter {
            state: RefCell::new(State::Open(emitter)),
            path,
            written,
            charset: self.charset,
            count: Cell::new(0),
            record_counter: self.record_counter,
            byte_counter: self.byte_counter,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error, sync::Arc};

    use crate::{
        core::{
            counter::LongCounter,
            item::ItemWriter,
            record::{Column, FieldType, Record, Schema, Value},
        },
        error::BatchError,
        item::csv::charset::Charset,
    };

    use super::{RecordItemWriterBuilder, decode_column_value, encode_column_value};

    fn single_string_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![Column::new("value", FieldType::String)]))
    }

    fn string_record(schema: &Arc<Schema>, value: Option<&str>) -> Record {
        Record::new(schema.clone(), vec![value.into()])
    }

    #[test]
    fn values_without_null_token_should_be_left_untouched() {
        for value in ["", "x", "a,b", "N", "\\", "back\\slash", "\"quoted\""] {
            assert_eq!(encode_column_value(Some(value)), value);
        }
    }

    #[test]
    fn every_null_token_occurrence_should_be_quoted() {
        assert_eq!(encode_column_value(Some("\\N")), "\"\\N\"");
        assert_eq!(
            encode_column_value(Some("\\N-\\N\\N")),
            "\"\\N\"-\"\\N\"\"\\N\""
        );
    }

    #[test]
    fn decode_column_value_should_reverse_encoding() {
        for value in ["a\\Nb", "\\N", "plain", ""] {
            let encoded = encode_column_value(Some(value));
            assert_eq!(decode_column_value(&encoded).as_deref(), Some(value));
        }
        assert_eq!(decode_column_value(&encode_column_value(None)), None);
    }

    #[test]
    fn records_should_be_written_one_per_line() -> Result<(), Box<dyn Error>> {
        let schema = Arc::new(Schema::new(vec![
            Column::new("name", FieldType::String),
            Column::new("score", FieldType::Double),
            Column::new("active", FieldType::Boolean),
        ]));
        let mut buffer = Vec::new();

        let writer = RecordItemWriterBuilder::new().from_writer(&mut buffer);
        writer.write_record(&Record::new(
            schema.clone(),
            vec!["Boston".into(), 4.5f64.into(), true.into()],
        ))?;
        writer.write_record(&Record::new(
            schema,
            vec!["a\\Nb".into(), Value::Null, false.into()],
        ))?;
        writer.close()?;
        drop(writer);

        assert_eq!(
            String::from_utf8(buffer)?,
            "Boston,4.5,true\n\"a\"\"\\N\"\"b\",\\N,false\n"
        );
        Ok(())
    }

    #[test]
    fn default_builder_should_separate_fields_with_commas() -> Result<(), Box<dyn Error>> {
        let schema = Arc::new(Schema::new(vec![
            Column::new("a", FieldType::Bigint),
            Column::new("b", FieldType::Bigint),
        ]));
        let mut buffer = Vec::new();

        let writer = RecordItemWriterBuilder::default().from_writer(&mut buffer);
        writer.write_record(&Record::new(schema, vec![1i64.into(), 2i64.into()]))?;
        writer.close()?;
        drop(writer);

        assert_eq!(String::from_utf8(buffer)?, "1,2\n");
        Ok(())
    }

    #[test]
    fn whole_number_double_should_not_read_like_a_bigint() -> Result<(), Box<dyn Error>> {
        let schema = Arc::new(Schema::new(vec![
            Column::new("count", FieldType::Bigint),
            Column::new("ratio", FieldType::Double),
            Column::new("total", FieldType::Double),
        ]));
        let mut buffer = Vec::new();

        let writer = RecordItemWriterBuilder::new().from_writer(&mut buffer);
        writer.write_record(&Record::new(
            schema,
            vec![1i64.into(), 1.0f64.into(), 1e20f64.into()],
        ))?;
        writer.close()?;
        drop(writer);

        assert_eq!(String::from_utf8(buffer)?, "1,1.0,1.0E20\n");
        Ok(())
    }

    #[test]
    fn custom_delimiter_should_be_used() -> Result<(), Box<dyn Error>> {
        let schema = Arc::new(Schema::new(vec![
            Column::new("a", FieldType::Bigint),
            Column::new("b", FieldType::Bigint),
        ]));
        let mut buffer = Vec::new();

        let writer = RecordItemWriterBuilder::new()
            .delimiter(b'|')
            .from_writer(&mut buffer);
        writer.write_record(&Record::new(schema, vec![1i64.into(), 2i64.into()]))?;
        writer.close()?;
        drop(writer);

        assert_eq!(String::from_utf8(buffer)?, "1|2\n");
        Ok(())
    }

    #[test]
    fn counters_should_be_incremented_once_on_close() -> Result<(), Box<dyn Error>> {
        let schema = single_string_schema();
        let records = Arc::new(LongCounter::new("records"));
        let bytes = Arc::new(LongCounter::new("bytes"));
        let mut buffer = Vec::new();

        let writer = RecordItemWriterBuilder::new()
            .record_counter(records.clone())
            .byte_counter(bytes.clone())
            .from_writer(&mut buffer);

        writer.write(&[
            string_record(&schema, Some("x")),
            string_record(&schema, None),
        ])?;
        assert_eq!(writer.count(), 2);
        assert_eq!(records.value(), 0);

        writer.close()?;
        writer.close()?;
        assert!(writer.is_closed());
        drop(writer);

        assert_eq!(records.value(), 2);
        assert_eq!(bytes.value(), buffer.len() as u64);
        assert_eq!(bytes.value(), 5);
        Ok(())
    }

    #[test]
    fn write_after_close_should_fail() -> Result<(), Box<dyn Error>> {
        let schema = single_string_schema();
        let writer = RecordItemWriterBuilder::new().from_writer(Vec::new());

        writer.close()?;
        let result = writer.write_record(&string_record(&schema, Some("late")));

        assert!(matches!(result, Err(BatchError::Closed)));
        assert_eq!(writer.count(), 0);
        Ok(())
    }

    #[test]
    fn invalid_utf8_payload_should_fail_loudly() {
        let schema = single_string_schema();
        let records = Arc::new(LongCounter::new("records"));
        let writer = RecordItemWriterBuilder::new()
            .record_counter(records.clone())
            .from_writer(Vec::new());

        let record = Record::new(schema, vec![Value::String(vec![b'o', b'k', 0xc3])]);
        let result = writer.write_record(&record);

        match result {
            Err(BatchError::Decode { index, source }) => {
                assert_eq!(index, 0);
                assert!(source.to_string().contains("byte 2"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(writer.count(), 0);
    }

    #[test]
    fn latin1_writer_should_decode_and_encode_payloads() -> Result<(), Box<dyn Error>> {
        let schema = single_string_schema();
        let mut buffer = Vec::new();

        let writer = RecordItemWriterBuilder::new()
            .charset(Charset::Latin1)
            .from_writer(&mut buffer);
        writer.write_record(&Record::new(schema, vec![Value::String(b"caf\xe9".to_vec())]))?;
        writer.close()?;
        drop(writer);

        assert_eq!(buffer, b"caf\xe9\n");
        Ok(())
    }

    #[test]
    fn ascii_writer_should_reject_non_ascii_text() {
        let schema = Arc::new(Schema::new(vec![Column::new("when", FieldType::Bigint)]));
        let writer = RecordItemWriterBuilder::new()
            .charset(Charset::Ascii)
            .from_writer(Vec::new());

        let result = writer.write_record(&Record::new(schema, vec![Value::String("é".into())]));

        assert!(matches!(result, Err(BatchError::Decode { index: 0, .. })));
    }

    #[test]
    fn string_column_with_non_string_value_should_fail() {
        let schema = single_string_schema();
        let writer = RecordItemWriterBuilder::new().from_writer(Vec::new());

        let result = writer.write_record(&Record::new(schema, vec![Value::Bigint(1)]));

        assert!(matches!(
            result,
            Err(BatchError::FieldType {
                index: 0,
                expected: FieldType::String,
                found: "bigint"
            })
        ));
    }

    #[test]
    fn get_len_should_track_bytes_accepted_by_sink() -> Result<(), Box<dyn Error>> {
        let schema = single_string_schema();
        let writer = RecordItemWriterBuilder::new().from_writer(Vec::new());

        writer.write_record(&string_record(&schema, Some("abc")))?;
        ItemWriter::flush(&writer)?;

        assert_eq!(writer.get_len()?, 4);
        assert!(writer.path().is_none());
        Ok(())
    }
}
