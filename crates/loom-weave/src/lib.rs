//! Embedding layer for the loom record store.
//!
//! One loom can be embedded inside another under a [`LoomPath`]. Every
//! mutation of an embedded loom is dual-written: the real record goes to
//! the inner loom's own branch, and a [`ControlEnvelope`] record goes to
//! the embedding loom's control log. Folding those envelopes up to an
//! outer sequence yields [`HeadsMap`] — the inner loom's per-branch head
//! positions *as of that outer time* — which is the primitive behind
//! cross-timeline time travel: branching the outer store freezes the
//! envelope prefix, and with it every embedded loom's heads.
//!
//! [`LoomPath`]: loom_types::LoomPath

pub mod envelope;
pub mod error;
pub mod heads;
pub mod namespace;

pub use envelope::{AccessKind, ControlEnvelope};
pub use error::{WeaveError, WeaveResult};
pub use heads::{fold_heads, heads_at, HeadsIndex, HeadsMap, HeadsPolicy};
pub use namespace::{qualify, split_qualified};
