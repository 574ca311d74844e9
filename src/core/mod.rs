pub mod domain;
pub mod errors;
pub mod injection;
pub mod languages;
pub mod pipeline;
pub mod traits;
