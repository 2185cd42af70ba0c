/// Pipeline seam implemented by every writer.
pub mod item;

/// External record and byte counters.
pub mod counter;

/// Typed records, their columns and values.
pub mod record;
