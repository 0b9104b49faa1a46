// Interface adapters: backend client, wire protocol, and local platform ports.

pub mod clients;
pub mod clock;
pub mod navigator;
pub mod protocol;
pub mod storage;
