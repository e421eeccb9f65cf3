//! Results reporting

pub mod csv_writer;

pub use csv_writer::{render_csv, write_csv};
