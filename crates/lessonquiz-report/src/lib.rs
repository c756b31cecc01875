//! lessonquiz-report: rendering graded attempts for people.
//!
//! Turns a `GradeResult` and its quiz version into review rows, then into a
//! self-contained HTML page or a markdown summary.

pub mod html;
pub mod markdown;
pub mod review;

pub use html::{generate_html, write_html_report};
pub use markdown::generate_markdown;
pub use review::{review_items, ReviewItem, Verdict};
