pub mod check;
pub mod filters;
pub mod zones;
