pub mod defs;

pub use defs::{Delivery, DigestArtifact, DigestSink};
