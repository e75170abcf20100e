pub mod map_interface;
pub mod observer;
