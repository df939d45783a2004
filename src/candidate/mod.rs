//! Vote peaks and their bounded, deterministic selection.

pub(crate) mod topk;
