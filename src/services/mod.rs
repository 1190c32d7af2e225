//! Business rules that sit between the HTTP layer and the store.

pub mod accounts;
pub mod integrity;
pub mod org_tree;

pub use org_tree::OrgTree;
