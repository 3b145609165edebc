//! Data models for shopping lists.
//!
//! Typed view over the list records the backend returns. The offline layer
//! stores records as raw JSON; these types are for callers that render them.

pub mod list;

pub use list::{
    CompletionInfo, ItemStatus, ListSummary, NewListItem, ShoppingList, ShoppingListItem,
};
