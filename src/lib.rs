pub mod adapters;
pub mod core;

/// Logger setup for binaries embedding the console core. Call once at
/// startup; the library itself only emits through `log`.
pub fn init_logging() {
    env_logger::init();
}
