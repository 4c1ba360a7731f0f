//! Grid API
//!
//! Backs the spreadsheet-style bookmark grid. The widget talks to a single
//! form-encoded endpoint and picks the operation with `cmd`:
//!
//! - `get-records`: one page of bookmarks, newest update first
//! - `save-records`: inline edits, `changes[i][recid|title|url|note|tags]`
//! - `delete-records`: bulk delete of `selected[]`
//!
//! # Usage
//!
//! ```rust,ignore
//! use mybookmarks::grid;
//!
//! let app = Router::new()
//!     .nest("/api/grid", grid::routes())
//!     .with_state(app_state);
//! ```

mod form;
mod handler;
mod routes;

pub use form::{GridCommand, GridForm, Page};
pub use routes::routes;
