pub mod catalog;
pub mod decoder;

pub use catalog::{CachedCatalog, FileCatalog, HttpCatalog, ReferenceCatalog, StaticCatalog};
pub use decoder::{decode_invoice, InvoiceFormat};
