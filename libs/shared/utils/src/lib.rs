pub mod cors;
pub mod extractor;
pub mod test_utils;
