pub mod convert;
pub mod frontend;
