pub mod capture;
pub mod catalog;
pub mod control;
pub mod error;
pub mod features;
pub mod input;
pub mod logger;
pub mod matching;
pub mod perception;
pub mod platform;
pub mod routines;
pub mod rules;
pub mod settings;
pub mod sleep;
pub mod types;
pub mod worker;
