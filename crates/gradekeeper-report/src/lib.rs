//! Text, HTML and Gradescope renderers for grade reports.

pub mod gradescope;
pub mod html;
pub mod text;
