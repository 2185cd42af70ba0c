#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # Record Sink for Rust

 Terminal sink of a row-processing pipeline: it turns typed records into a
 single delimited text file and reports how many records and bytes it wrote.

 ## Core Concepts

- **Record:** an ordered list of values, laid out according to a `Schema` of typed columns.
- **RecordItemWriter:** writes one record per line, comma separated, with nulls written as `\N`.
- **Counter:** an external sink the writer reports its record and byte counts to, once, on close.
- **ItemWriter:** the trait through which a pipeline drives any writer.

 ## Output format

| **Value**                    | **Written as**     |
|------------------------------|--------------------|
| null                         | `\N`               |
| string containing `\N`       | each `\N` → `"\N"` |
| any other string             | unchanged          |
| bigint, boolean              | default text       |
| double                       | `1.0`, `1.0E20`, `Infinity` |
| datetime                     | `%Y-%m-%d %H:%M:%S` |

The CSV layer then quotes values holding the delimiter, a quote or a line break.

 ## Getting Started

```rust
# use std::sync::Arc;
# use record_sink_rs::{
#     core::{
#         counter::LongCounter,
#         record::{Column, FieldType, Record, Schema},
#     },
#     BatchError, RecordItemWriterBuilder,
# };
fn main() -> Result<(), BatchError> {
    let schema = Arc::new(Schema::new(vec![Column::new("value", FieldType::String)]));
    let records = Arc::new(LongCounter::new("records"));
    let bytes = Arc::new(LongCounter::new("bytes"));

    let dir = std::env::temp_dir();
    let writer = RecordItemWriterBuilder::new()
        .record_counter(records.clone())
        .byte_counter(bytes.clone())
        .from_path(dir.join("values.csv"))?;

    for value in [Some("x"), None, Some("a\\Nb")] {
        writer.write_record(&Record::new(schema.clone(), vec![value.into()]))?;
    }
    writer.close()?;

    assert_eq!(records.value(), 3);
    assert_eq!(bytes.value(), writer.get_len()?);

    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Core module: writer trait, counters and records
pub mod core;

/// Error types for writer operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of item writers
pub mod item;

#[doc(inline)]
pub use item::csv::record_writer::{RecordItemWriter, RecordItemWriterBuilder};
