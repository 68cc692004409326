//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements  | Connects to                  |
//! |---------------|-------------|------------------------------|
//! | `config_file` | ConfigPort  | JSON config file on disk     |
//! | `log_sink`    | (transport) | Subscriber queues → logger   |

pub mod config_file;
pub mod log_sink;
