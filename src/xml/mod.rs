// xml/mod.rs -- XML document parsing

pub mod metadata;
