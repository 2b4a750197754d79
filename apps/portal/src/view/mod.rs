//! View-state building blocks shared by every screen.

pub mod action;
pub mod list;

pub use action::{ActionTracker, AsyncAction};
pub use list::{
    ApplyOutcome, FilterValue, ListQuery, ListResult, ListViewController, Listable, PageSource,
    Pagination, SortDirection, SortValue,
};
