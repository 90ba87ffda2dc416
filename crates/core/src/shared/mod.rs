pub mod constants;
pub mod error;
pub mod image;
pub mod model_kind;
pub mod point;
pub mod rect;
