pub mod input;
pub mod keyboard;
pub mod mode;
pub mod view;
