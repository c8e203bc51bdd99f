//! Session management and the resource clients built on top of it.

pub mod container_service;
pub mod object_service;
pub mod session;
pub mod storage_service;
