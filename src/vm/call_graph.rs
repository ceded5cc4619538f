use super::command::Command;
use super::translator::VmFile;
use std::collections::{HashMap, HashSet};

/// Which functions call which, built from the `function` and `call` commands of a program
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallGraph {
    calls: HashMap<String, HashSet<String>>,
}

impl CallGraph {
    pub fn new(files: &[VmFile]) -> Self {
        let mut graph = Self::default();

        for file in files {
            let mut caller: Option<&str> = None;
            for command in &file.commands {
                match command {
                    Command::Function { name, .. } => {
                        graph.calls.entry(name.clone()).or_default();
                        caller = Some(name.as_str());
                    }
                    Command::Call { name, .. } => {
                        // calls outside of any function are made by the file itself
                        let caller = caller.unwrap_or(file.name.as_str());
                        graph
                            .calls
                            .entry(caller.to_owned())
                            .or_default()
                            .insert(name.clone());
                    }
                    _ => {}
                }
            }
        }

        graph
    }

    pub fn callees(&self, caller: &str) -> impl Iterator<Item = &str> {
        self.calls
            .get(caller)
            .into_iter()
            .flat_map(|callees| callees.iter().map(String::as_str))
    }

    /// The root and every function it can call, directly or through other functions
    pub fn reachable_from(&self, root: &str) -> HashSet<String> {
        let mut discovered = HashSet::new();
        let mut todo = vec![root];

        while let Some(name) = todo.pop() {
            if discovered.insert(name.to_owned()) {
                todo.extend(self.callees(name).filter(|callee| !discovered.contains(*callee)));
            }
        }

        discovered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::bytecode::parse_vm;

    fn graph(src: &str) -> CallGraph {
        CallGraph::new(&[VmFile::new("Sys", parse_vm(src).unwrap())])
    }

    #[test]
    fn test_reachable_functions() {
        let graph = graph(
            "function Sys.init 0\ncall Sys.a 0\nreturn\n\
             function Sys.a 0\ncall Sys.b 0\ncall Sys.a 0\nreturn\n\
             function Sys.b 0\ncall Sys.a 0\nreturn\n\
             function Sys.unused 0\ncall Sys.b 0\nreturn",
        );

        let reachable = graph.reachable_from("Sys.init");
        let expected: HashSet<_> = ["Sys.init", "Sys.a", "Sys.b"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(expected, reachable);

        assert!(graph.reachable_from("Sys.unused").contains("Sys.a"));
        assert_eq!(2, graph.reachable_from("Sys.b").len());
    }

    #[test]
    fn test_undefined_callees_are_still_reachable() {
        let graph = graph("function Sys.init 0\ncall Output.printInt 1\nreturn");
        assert!(graph.reachable_from("Sys.init").contains("Output.printInt"));
        assert_eq!(0, graph.callees("Output.printInt").count());
    }
}
