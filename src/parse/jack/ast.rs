use serde::Serialize;
use std::ops::Range;

/// The position of a node in the node table of its file
pub type NodeIdx = usize;

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub enum Type {
    Int,
    Char,
    Boolean,
    ClassName(String),
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize)]
pub enum ClassVarKind {
    Static,
    Field,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize)]
pub enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    And,
    Or,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    Equals,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize)]
pub enum UnaryOperator {
    Minus,
    Not,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize)]
pub enum KeywordConstant {
    True,
    False,
    Null,
    This,
}

/// `name(args)` or `receiver.name(args)`, where receiver is a variable or a class name
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct SubroutineCall {
    pub receiver: Option<String>,
    pub name: String,
    pub arguments: Vec<NodeIdx>,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub enum Expression {
    IntConstant(u16),
    StringConstant(String),
    KeywordConstant(KeywordConstant),
    Variable(String),
    ArrayAccess {
        var_name: String,
        index: NodeIdx,
    },
    Call(SubroutineCall),
    Parenthesized(NodeIdx),
    Unary {
        operator: UnaryOperator,
        operand: NodeIdx,
    },
    Binary {
        operator: BinaryOperator,
        lhs: NodeIdx,
        rhs: NodeIdx,
    },
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub enum Statement {
    Let {
        var_name: String,
        index: Option<NodeIdx>,
        value: NodeIdx,
    },
    If {
        condition: NodeIdx,
        then_branch: Vec<NodeIdx>,
        else_branch: Option<Vec<NodeIdx>>,
    },
    While {
        condition: NodeIdx,
        body: Vec<NodeIdx>,
    },
    /// the call expression node
    Do(NodeIdx),
    Return(Option<NodeIdx>),
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct Class {
    pub name: String,
    pub var_declarations: Vec<NodeIdx>,
    pub subroutines: Vec<NodeIdx>,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct ClassVarDeclaration {
    pub kind: ClassVarKind,
    pub type_name: Type,
    pub var_names: Vec<String>,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct Subroutine {
    pub kind: SubroutineKind,
    /// None means void
    pub return_type: Option<Type>,
    pub name: String,
    pub parameters: Vec<NodeIdx>,
    pub body: NodeIdx,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct Parameter {
    pub type_name: Type,
    pub var_name: String,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct VarDeclaration {
    pub type_name: Type,
    pub var_names: Vec<String>,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct SubroutineBody {
    pub var_declarations: Vec<NodeIdx>,
    pub statements: Vec<NodeIdx>,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub enum NodeKind {
    Class(Class),
    ClassVarDeclaration(ClassVarDeclaration),
    Subroutine(Subroutine),
    Parameter(Parameter),
    SubroutineBody(SubroutineBody),
    VarDeclaration(VarDeclaration),
    Statement(Statement),
    Expression(Expression),
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct Node {
    pub idx: NodeIdx,
    /// [start, end) into the token stream of the file
    pub token_range: Range<usize>,
    /// in source order
    pub children: Vec<NodeIdx>,
    pub kind: NodeKind,
}

/// The flat node table of one file. It owns every node, nodes only refer to each other by index
#[derive(Debug, Default, PartialEq, Eq, Clone, Serialize)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn push(&mut self, kind: NodeKind, token_range: Range<usize>, children: Vec<NodeIdx>) -> NodeIdx {
        let idx = self.nodes.len();
        self.nodes.push(Node {
            idx,
            token_range,
            children,
            kind,
        });
        idx
    }

    pub fn node(&self, idx: NodeIdx) -> &Node {
        &self.nodes[idx]
    }

    pub fn get(&self, idx: NodeIdx) -> Option<&Node> {
        self.nodes.get(idx)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// the node that was completed last, which is the root for a finished parse
    pub fn root(&self) -> Option<NodeIdx> {
        self.nodes.len().checked_sub(1)
    }

    pub fn expression(&self, idx: NodeIdx) -> Option<&Expression> {
        match &self.node(idx).kind {
            NodeKind::Expression(expression) => Some(expression),
            _ => None,
        }
    }

    pub fn statement(&self, idx: NodeIdx) -> Option<&Statement> {
        match &self.node(idx).kind {
            NodeKind::Statement(statement) => Some(statement),
            _ => None,
        }
    }
}
