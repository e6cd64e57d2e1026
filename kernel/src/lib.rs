// Gridstore Kernel
//
// Sheet registry, table storage and active-collection tracking
// behind the HTTP API.

pub mod registry;
pub mod session;
pub mod sheet;
pub mod store;
pub mod tables;
