//! Storage backends and the document operations built on them.

pub mod document_service;
pub mod local_store;
pub mod memory_store;
pub mod object_store;
pub mod transfer;
