pub mod pactl;
pub mod plain;
pub mod runner;

pub use pactl::{Collector, JsonListing};
pub use plain::PlainSinkInputParser;
pub use runner::{SystemRunner, ToolError, ToolRunner};
