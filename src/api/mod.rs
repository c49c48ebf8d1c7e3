pub mod attendance;
pub mod child;
pub mod coach;
pub mod event;
pub mod group;
pub mod message;
