//! Tax rules: IGST and sales tax on documents, TDS on vendor bills

pub mod gst;
pub mod tds;

pub use gst::*;
pub use tds::*;
