pub mod rules;
pub mod status;
