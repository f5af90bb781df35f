mod client;

pub use client::LinearClient;
