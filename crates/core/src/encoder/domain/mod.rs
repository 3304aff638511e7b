pub mod encoder_process;
pub mod invocation;
