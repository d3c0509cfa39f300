pub mod attribute;
pub mod value;

pub use attribute::Attribute;
pub use value::{AttributeType, Value};
