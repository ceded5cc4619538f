use crate::parse::jack::ast::{Ast, NodeIdx};
use serde::Serialize;
use std::collections::BTreeSet;
use std::ops::Range;

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct NodeInfo {
    pub index: NodeIdx,
    pub token_range: Range<usize>,
    pub child_node_idxs: Vec<NodeIdx>,
}

/// Token <-> node relations of one parsed file
#[derive(Debug, Default, PartialEq, Eq, Clone, Serialize)]
pub struct ParserSourceMap {
    /// every node whose token range contains the token, outermost first
    pub token_idx_to_jack_node_idxs: Vec<Vec<NodeIdx>>,
    pub jack_nodes: Vec<NodeInfo>,
}

impl ParserSourceMap {
    pub fn new(ast: &Ast, token_count: usize) -> Self {
        let mut token_idx_to_jack_node_idxs = vec![Vec::new(); token_count];
        let mut jack_nodes = Vec::with_capacity(ast.len());

        for node in ast.nodes() {
            for token_idx in node.token_range.clone() {
                if let Some(nodes) = token_idx_to_jack_node_idxs.get_mut(token_idx) {
                    nodes.push(node.idx);
                }
            }
            jack_nodes.push(NodeInfo {
                index: node.idx,
                token_range: node.token_range.clone(),
                child_node_idxs: node.children.clone(),
            });
        }

        // parents are completed after their children, so reversing yields outermost first
        for nodes in &mut token_idx_to_jack_node_idxs {
            nodes.reverse();
        }

        Self {
            token_idx_to_jack_node_idxs,
            jack_nodes,
        }
    }

    pub fn node(&self, idx: NodeIdx) -> Option<&NodeInfo> {
        self.jack_nodes.get(idx)
    }
}

/// Node <-> vm command relations of one compiled file. A node only maps to the commands it
/// emitted itself, see [all_vm_command_idxs] for the commands of a whole subtree
#[derive(Debug, Default, PartialEq, Eq, Clone, Serialize)]
pub struct CodegenSourceMap {
    pub jack_node_idx_to_vm_command_idxs: Vec<Vec<usize>>,
    pub vm_command_idx_to_jack_node_idx: Vec<NodeIdx>,
}

impl CodegenSourceMap {
    pub fn with_nodes(node_count: usize) -> Self {
        Self {
            jack_node_idx_to_vm_command_idxs: vec![Vec::new(); node_count],
            vm_command_idx_to_jack_node_idx: Vec::new(),
        }
    }

    pub fn record(&mut self, node: NodeIdx, vm_command_idx: usize) {
        if self.jack_node_idx_to_vm_command_idxs.len() <= node {
            self.jack_node_idx_to_vm_command_idxs
                .resize(node + 1, Vec::new());
        }
        self.jack_node_idx_to_vm_command_idxs[node].push(vm_command_idx);
        self.vm_command_idx_to_jack_node_idx.push(node);
    }

    pub fn node_of(&self, vm_command_idx: usize) -> Option<NodeIdx> {
        self.vm_command_idx_to_jack_node_idx
            .get(vm_command_idx)
            .copied()
    }

    pub fn direct_vm_command_idxs(&self, node: NodeIdx) -> &[usize] {
        self.jack_node_idx_to_vm_command_idxs
            .get(node)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// The node with the smallest token range that contains the token
pub fn innermost_node(parser: &ParserSourceMap, token_idx: usize) -> Option<NodeIdx> {
    parser
        .token_idx_to_jack_node_idxs
        .get(token_idx)?
        .iter()
        .filter_map(|&idx| parser.node(idx))
        .min_by_key(|node| node.token_range.len())
        .map(|node| node.index)
}

/// Every vm command emitted for the node or any of its descendants, in ascending order
pub fn all_vm_command_idxs(
    parser: &ParserSourceMap,
    codegen: &CodegenSourceMap,
    node: NodeIdx,
) -> Vec<usize> {
    let mut commands = BTreeSet::new();
    let mut pending = vec![node];

    while let Some(idx) = pending.pop() {
        commands.extend(codegen.direct_vm_command_idxs(idx));
        if let Some(info) = parser.node(idx) {
            pending.extend(&info.child_node_idxs);
        }
    }

    commands.into_iter().collect()
}

/// The token range of the node that produced a vm command
pub fn token_range_of_vm_command(
    parser: &ParserSourceMap,
    codegen: &CodegenSourceMap,
    vm_command_idx: usize,
) -> Option<Range<usize>> {
    let node = codegen.node_of(vm_command_idx)?;
    parser.node(node).map(|info| info.token_range.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::jack::{parse_statement, tokenize};

    #[test]
    fn test_token_to_nodes() {
        let tokens = tokenize("let x = a + 1;").unwrap();
        let ast = parse_statement(&tokens).unwrap();
        let map = ParserSourceMap::new(&ast, tokens.len());

        // nodes: 0 = a, 1 = 1, 2 = a + 1, 3 = let
        assert_eq!(vec![3], map.token_idx_to_jack_node_idxs[0]);
        assert_eq!(vec![3, 2, 0], map.token_idx_to_jack_node_idxs[3]);
        assert_eq!(vec![3, 2], map.token_idx_to_jack_node_idxs[4]);

        assert_eq!(Some(0), innermost_node(&map, 3));
        assert_eq!(Some(2), innermost_node(&map, 4));
        assert_eq!(Some(3), innermost_node(&map, 6));
        assert_eq!(None, innermost_node(&map, 7));
    }

    #[test]
    fn test_all_vm_command_idxs_includes_descendants() {
        let tokens = tokenize("let x = a + 1;").unwrap();
        let ast = parse_statement(&tokens).unwrap();
        let parser = ParserSourceMap::new(&ast, tokens.len());

        let mut codegen = CodegenSourceMap::with_nodes(ast.len());
        // push a, push 1, add, pop x
        codegen.record(0, 0);
        codegen.record(1, 1);
        codegen.record(2, 2);
        codegen.record(3, 3);

        assert_eq!(vec![0, 1, 2, 3], all_vm_command_idxs(&parser, &codegen, 3));
        assert_eq!(vec![0, 1, 2], all_vm_command_idxs(&parser, &codegen, 2));
        assert_eq!(&[3], codegen.direct_vm_command_idxs(3));
        assert_eq!(Some(5..6), token_range_of_vm_command(&parser, &codegen, 1));
    }
}
