mod id;
mod memo;
mod profile;
mod rab;
mod realization;
mod report;

pub use id::*;
pub use memo::*;
pub use profile::*;
pub use rab::*;
pub use realization::*;
pub use report::*;
