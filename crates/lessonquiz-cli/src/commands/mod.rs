pub mod grade;
pub mod init;
pub mod submit;
pub mod take;
pub mod validate;
