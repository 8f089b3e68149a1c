pub mod logger;
pub mod panic;

pub use logger::init_logger;
pub use panic::install_panic_handler;
