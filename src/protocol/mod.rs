//! Object-key and metadata protocol: how documents are named in the store,
//! how their original filenames survive the trip, and how they are presented
//! on download.

pub mod disposition;
pub mod key_codec;
pub mod metadata;
