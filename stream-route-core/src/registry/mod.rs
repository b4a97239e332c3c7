pub mod groups;
pub mod restriction;
pub mod streams;
