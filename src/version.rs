/// Version of the software, taken from the package manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
