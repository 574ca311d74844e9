pub mod judging;
pub mod validating;
