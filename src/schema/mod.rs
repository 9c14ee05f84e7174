mod from_thrift;
pub mod types;

pub use crate::thrift_bridge::Repetition;
