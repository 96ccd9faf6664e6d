// lib.rs -- package provenance reporting for a Portage tree

pub mod actions;
pub mod changelog;
pub mod config;
pub mod exception;
pub mod herds;
pub mod output;
pub mod porttree;
pub mod xml;
