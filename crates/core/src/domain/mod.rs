pub mod fragment;
pub mod quote;
pub mod security;
