pub mod keyboard;
pub mod text;
pub mod validation;
