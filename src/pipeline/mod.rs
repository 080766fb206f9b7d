pub mod persistence;
pub mod progression;
pub mod provider;
