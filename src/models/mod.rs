pub mod employee;
pub mod group;
pub mod post;
pub mod request;
