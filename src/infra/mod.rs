// Process-backed adapters for the external collaborators

pub mod plot_command;
pub mod ulog_decoder;

pub use plot_command::CommandPlotGenerator;
pub use ulog_decoder::UlogCommandDecoder;
