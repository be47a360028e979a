pub mod add;
pub mod calendar;
pub mod delete;
pub mod r#move;
pub mod parse;
pub mod preview;
pub mod recur;
pub mod show;
