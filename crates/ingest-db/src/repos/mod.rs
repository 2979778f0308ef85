pub mod document;
pub mod run;
