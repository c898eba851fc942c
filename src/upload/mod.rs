//! Upload validation module
//!
//! Checks user-selected files before they are processed into an artifact.

mod validator;

pub use validator::{UploadValidator, ValidatedUpload};
