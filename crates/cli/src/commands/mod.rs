pub mod config;
pub mod doctor;
pub mod generate;
pub mod history;
pub mod post;
pub mod run;
pub mod split;
