//! Built-in leaf steps.

pub mod abort;
pub mod compare_files;
pub mod delete_file;
pub mod file_exists;
pub mod find_files;
pub mod log;
pub mod manual_instruction;
pub mod render;
pub mod result_condition;
pub mod write_file;

pub use abort::Abort;
pub use compare_files::CompareFiles;
pub use delete_file::DeleteFile;
pub use file_exists::FileExists;
pub use find_files::FindFiles;
pub use log::{Log, LogLevel};
pub use manual_instruction::ManualInstruction;
pub use result_condition::ResultCondition;
pub use write_file::WriteFile;
