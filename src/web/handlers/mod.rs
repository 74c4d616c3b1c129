pub mod job_info_handlers;
pub mod system_handlers;

pub use job_info_handlers::*;
pub use system_handlers::*;
