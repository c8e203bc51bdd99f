//! Resource handles for the object storage service.
//!
//! Handles are lightweight: a name plus the client they were obtained from.
//! They address remote resources but do not mirror remote state, with the
//! single exception of an object's opt-in cached payload.

pub mod container;
pub mod metadata;
pub mod object;
