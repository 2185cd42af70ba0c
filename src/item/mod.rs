/// This module provides a delimited text writer for typed records.
pub mod csv;
