//! Value resolution against the remote store
//!
//! `ValueResolver` maps each operation to one backend round trip;
//! `BatchedResolver` wraps it with per-queue debounce windows so bursts of
//! concurrent calls coalesce into grouped dispatches.

mod batch;
mod traits;
mod value;

pub use batch::{BatchedResolver, RESOLVE_WINDOW, SET_WINDOW};
pub use traits::{
    ResolverError, ResolverResult, ValueBackend, ValueOperation, ValueRequest, ValueResponse,
};
pub use value::ValueResolver;

pub(crate) use batch::DebounceTimer;
