pub mod document;
pub mod member;
pub mod message;
pub mod note;
pub mod personal_note;
pub mod project;
pub mod task;
pub mod user;
