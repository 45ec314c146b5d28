pub mod app; // per-round application instance
pub mod apps; // built-in demo programs
pub mod backend; // simulation backend boundary
pub mod channel; // classical channels
pub mod config; // typed configuration
pub mod connection; // per-role backend handle / flush barrier
pub mod driver; // top-level simulation driver
pub mod error; // error taxonomy
pub mod program; // role program trait and registry
pub mod round; // round coordinator
pub mod runner; // per-role concurrent runner
pub mod sink; // result persistence
