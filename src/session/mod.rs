pub mod classifier;

pub use classifier::{classify, current_session, wib};
