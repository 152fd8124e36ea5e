pub mod listing;
pub mod object;
pub mod path;
pub mod poll;
