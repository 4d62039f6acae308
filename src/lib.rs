//! A headless tree-to-flat-list streaming cache for virtualized tree views.
//!
//! Tree widgets that render through a virtualized list need "the next N visible rows" at an
//! arbitrary offset, without materializing the whole tree and without re-fetching rows on every
//! scroll or expand/collapse. [`TreeFlattener`] keeps a depth-first, randomly addressable cache of
//! the rows visited so far and keeps it consistent under:
//!
//! - on-demand fetches ([`TreeFlattener::fetch_window`], iterator pages)
//! - source mutations ([`TreeFlattener::handle_event`])
//! - expand/collapse ([`TreeFlattener::set_expanded`])
//! - sort/filter changes ([`TreeFlattener::set_criteria`])
//!
//! It is UI-agnostic. The embedding layer provides:
//! - a [`TreeSource`] implementation that pages children of a node
//! - the set of expanded nodes
//! - source mutation/refresh notifications, forwarded in order
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod cache;
mod emitter;
mod error;
mod event;
mod expand;
mod expansion;
mod fetch;
mod flattener;
mod key;
mod options;
mod reconcile;
mod registry;
mod source;
mod state;
mod tracker;
mod types;


pub use emitter::Listener;
pub use error::{Error, Result};
pub use event::{
    Addition, FlatMutation, InsertPosition, Mutation, RefreshScope, RowChange, SourceEvent,
    TreeChange, Update,
};
pub use expansion::{ExpandedNotice, ExpansionDiff, ExpansionSet, ExpansionStatus};
pub use flattener::TreeFlattener;
pub use key::{KeyMap, KeySet, TreeKey};
pub use options::FlattenerOptions;
pub use source::{
    Children, Criteria, FilterPredicate, OffsetRequest, Page, SortComparator, TreeSource,
};
pub use types::{
    Caching, Capability, CapabilityName, Emptiness, FetchSize, Item, IterationSpeed, IteratorId,
    ListenerId, OffsetImplementation, Row, Window,
};
