//! Pipeline stages for turning a document's headings into PDF bookmarks.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets the
//! PDF backend change without touching the outline logic.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ tree ──┐
//! (source)  (h1..h6)   (nest)  ├──▶ bookmarks ──▶ crate::pdf
//!            rendered PDF ──▶ pages ┘  (match)      (write outline)
//! ```
//!
//! 1. [`input`]   — load the source HTML again (fetch, read, or in-memory)
//! 2. [`extract`] — collect `h1`..`h6` in document order; runs in
//!    `spawn_blocking` because the DOM is not `Send`
//! 3. [`tree`]    — nest the flat heading list by level
//! 4. [`pages`]   — normalised per-page text of the rendered PDF
//! 5. [`bookmarks`] — match each heading to the first page containing it,
//!    dropping headings that match no page
//!
//! Steps 3 to 5 are pure functions with no I/O.

pub mod bookmarks;
pub mod extract;
pub mod input;
pub mod pages;
pub mod tree;
