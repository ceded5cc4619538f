pub mod codegen;
pub mod sourcemap;
pub mod symbols;

pub use codegen::{compile_class, CodegenError, CodegenResult, CompiledClass, Signatures};
