pub mod activity;
pub mod application;
pub mod concept;
pub mod knowledge;
pub mod partner;
pub mod project;
