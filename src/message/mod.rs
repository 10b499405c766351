pub mod extensions;
pub mod handshake;
pub mod mse;
