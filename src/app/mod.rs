pub mod convert;
pub mod pipelines;
