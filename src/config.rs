//! Compile-time configuration constants, mirroring the reference
//! implementation's compile-time knobs (spec §6).

/// Number of sparse-array entries per page, sized so a page is close to one
/// host page (4096 bytes / 4-byte sparse elements).
pub const PAGE_LEN_SPARSE: usize = 1024;

/// Number of dense-array / component-page entries per page.
pub const PAGE_LEN_DENSE: usize = 512;

/// Maximum number of constraints ([`crate::query::Query::with`],
/// `without`, `optional`) a single query may carry.
pub const MAX_QUERY_ARGS: usize = 15;

/// All-ones sentinel for the 16-bit id field: "no entity" / end-of-free-list.
pub const ID_NONE: u16 = u16::MAX;
