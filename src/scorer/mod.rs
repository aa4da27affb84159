pub mod screening;

pub use screening::{evaluate, screen, Screening};
