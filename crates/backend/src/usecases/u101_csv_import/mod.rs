pub mod error;
pub mod executor;
pub mod parser;
pub mod resolver;
pub mod schema;
pub mod staging;
pub mod validator;
pub mod writer;

pub use error::ImportError;
pub use executor::ImportExecutor;
