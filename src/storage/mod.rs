pub mod bindings;
pub mod templates;

pub use bindings::BindingStore;
pub use templates::{DiskTemplateStore, TemplateRef, TemplateStore};
