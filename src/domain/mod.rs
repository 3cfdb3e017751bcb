pub mod lifecycle;
pub mod role;
pub mod stats;
pub mod status;
pub mod visibility;
