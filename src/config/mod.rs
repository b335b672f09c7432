//! Configuration defaults for the discovery engine.
//!
//! There is no process-wide state: every tunable flows into a discovery call
//! through an explicit parameter struct (`TableSearch`, `FieldQuery`,
//! `ResolverConfig`), and this module only supplies the defaults those
//! structs start from.

pub mod constants;
