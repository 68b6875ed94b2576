pub mod downscale;
pub mod health;
pub mod transfer;
