//! Response comparison between two API targets

mod diff;
mod response;

pub use response::{compare_responses, CompareOptions};
