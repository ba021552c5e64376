pub mod events;
pub mod layers;
pub mod pointer;
pub mod tools;
