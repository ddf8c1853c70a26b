pub mod csv_reader;

pub use csv_reader::{read_dataset, read_dataset_with_config, ReaderConfig};
