pub mod arbitration;
pub mod combined;
pub mod selector;
