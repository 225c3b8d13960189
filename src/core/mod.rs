pub mod errors;
pub mod http;
pub mod models;
pub mod utils;

pub use errors::CardError;
pub use models::{
    Card,
    CardKey,
    FieldMap,
};
