pub mod ledger;
pub mod ocr;
pub mod reconstruct;
pub mod video;

#[cfg(test)]
pub(crate) mod testing;
