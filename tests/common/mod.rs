#![allow(dead_code)]

mod mocks;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use rand::distr::{Alphanumeric, SampleString};
use record_sink_rs::core::record::{Column, FieldType, Record, Schema};

pub use mocks::MockFile;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Random file name inside `dir`.
pub fn output_path(dir: &Path) -> PathBuf {
    let file_name = Alphanumeric.sample_string(&mut rand::rng(), 16);
    dir.join(format!("{}.csv", file_name))
}

pub fn string_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![Column::new("value", FieldType::String)]))
}

pub fn string_record(schema: &Arc<Schema>, value: Option<&str>) -> Record {
    Record::new(schema.clone(), vec![value.into()])
}
