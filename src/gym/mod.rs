pub mod platformer;

pub use platformer::Platformer;
