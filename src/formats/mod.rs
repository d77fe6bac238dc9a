pub mod calimocho;
pub mod mitab;
pub mod psi_xml;
