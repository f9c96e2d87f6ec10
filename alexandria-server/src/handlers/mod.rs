pub mod authors;
pub mod covers;
pub mod enrich;
pub mod harvest;
pub mod quota;
