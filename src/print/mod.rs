//! XML serialization

pub mod printer;
