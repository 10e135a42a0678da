pub mod auth;
pub mod email;
pub mod media;
pub mod photos;
pub mod qr;
pub mod roles;
pub mod tags;
pub mod transform;
