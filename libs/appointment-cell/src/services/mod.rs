pub mod conflict;
pub mod directory;
pub mod locks;
pub mod scheduling;

pub use scheduling::SchedulingService;
