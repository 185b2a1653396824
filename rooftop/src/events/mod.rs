//! Hardware-event resolution.
//!
//! Maps symbolic profiling event names (`FP_ARITH:SCALAR_DOUBLE`) to the
//! raw register identifiers the profiler expects (`r53...`). The mapping
//! goes through two external artifacts: a vendor descriptor dump
//! enumerating events and their sub-masks ([`dump`]), and a checking tool
//! that turns one `(event, umask)` pair into a numeric code ([`checker`]).
//!
//! Available counters vary by machine and by the invoking user's
//! permissions, so resolution is strictly best-effort: a missing event or a
//! failing check is skipped with a diagnostic and every other candidate
//! still resolves. Results live in memory for the session only.

pub mod checker;
pub mod dump;
pub mod resolver;

pub use checker::{CheckEventsTool, EventChecker, NO_UMASK};
pub use dump::EventDump;
pub use resolver::{resolve, with_user_modifier, EventQuery, RegisterMapping};
