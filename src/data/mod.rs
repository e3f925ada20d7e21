// Record data model and the streaming bulk-input parser

pub mod parser;
pub mod record;

pub use parser::{ParseError, RecordParser};
pub use record::*;
