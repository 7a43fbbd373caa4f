//! Policy data model.
//!
//! Policies and APIs reference each other by id only; the binding relation is
//! owned by the binding store, never embedded in either record.

pub mod ids;
pub mod ip_range;
pub mod page;
pub mod policy;

pub use ids::{parse_api_ids, ApiId, PolicyId};
pub use ip_range::IpRange;
pub use page::{PageList, PageParams};
pub use policy::{
    ApiSummary, Binding, BoundApi, Policy, PolicyDraft, PolicyFields, PolicyKind, PolicyStatus,
    PolicyWithApis, RangesInput,
};
