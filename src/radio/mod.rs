pub mod backend;
pub mod sink;
pub mod source;

pub use sink::{TransmitSink, TxRetune};
pub use source::SampleSource;
