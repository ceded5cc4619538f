pub mod call_graph;
pub mod command;
pub mod sourcemap;
pub mod translator;

pub use call_graph::CallGraph;
pub use command::{to_vm_text, Command, Segment};
pub use sourcemap::{VmCommandId, VmSourceMap};
pub use translator::{translate, TranslatedProgram, VmFile};
