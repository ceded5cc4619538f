use super::sourcemap::CodegenSourceMap;
use super::symbols::{SymbolEntry, SymbolTable, VarKind};
use crate::parse::jack::ast::*;
use crate::vm::command::{Command, Segment};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CodegenError {
    #[error("node {node}: undefined symbol '{name}'")]
    UndefinedSymbol { name: String, node: NodeIdx },
    #[error("node {node}: '{name}' is already declared")]
    DuplicateDeclaration { name: String, node: NodeIdx },
    #[error("node {node}: '{name}' expects {expected} arguments, but got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        node: NodeIdx,
    },
    #[error("the root node is not a class")]
    MissingClass,
    #[error("node {node}: the body of '{name}' is not a subroutine body")]
    MissingSubroutineBody { name: String, node: NodeIdx },
    #[error("node {node}: expected {expected}")]
    UnexpectedNode {
        expected: &'static str,
        node: NodeIdx,
    },
}

pub type CodegenResult<T> = Result<T, CodegenError>;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Signature {
    pub kind: SubroutineKind,
    /// not counting the implicit this of methods
    pub n_params: usize,
}

/// Every subroutine declared by the classes of one program, by class and subroutine name
#[derive(Debug, Default, Clone)]
pub struct Signatures {
    classes: HashMap<String, HashMap<String, Signature>>,
}

fn root_class(ast: &Ast) -> CodegenResult<(NodeIdx, &Class)> {
    let root = ast.root().ok_or(CodegenError::MissingClass)?;
    match &ast.node(root).kind {
        NodeKind::Class(class) => Ok((root, class)),
        _ => Err(CodegenError::MissingClass),
    }
}

impl Signatures {
    pub fn add_class(&mut self, ast: &Ast) -> CodegenResult<()> {
        let (root, class) = root_class(ast)?;
        if self.classes.contains_key(&class.name) {
            return Err(CodegenError::DuplicateDeclaration {
                name: class.name.clone(),
                node: root,
            });
        }

        let mut subroutines = HashMap::new();
        for &idx in &class.subroutines {
            let NodeKind::Subroutine(subroutine) = &ast.node(idx).kind else {
                continue;
            };
            let signature = Signature {
                kind: subroutine.kind,
                n_params: subroutine.parameters.len(),
            };
            if subroutines
                .insert(subroutine.name.clone(), signature)
                .is_some()
            {
                return Err(CodegenError::DuplicateDeclaration {
                    name: subroutine.name.clone(),
                    node: idx,
                });
            }
        }

        self.classes.insert(class.name.clone(), subroutines);
        Ok(())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn lookup(&self, class: &str, subroutine: &str) -> Option<Signature> {
        self.classes.get(class)?.get(subroutine).copied()
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CompiledClass {
    pub class_name: String,
    pub commands: Vec<Command>,
    pub sourcemap: CodegenSourceMap,
}

/// Compiles the class at the root of the ast.
///
/// The signatures should contain every class of the program, calls into classes they don't know
/// (like the os) are emitted without any checks
pub fn compile_class(ast: &Ast, signatures: &Signatures) -> CodegenResult<CompiledClass> {
    let (_, class) = root_class(ast)?;

    let own_signatures;
    let signatures = if signatures.has_class(&class.name) {
        signatures
    } else {
        let mut with_class = signatures.clone();
        with_class.add_class(ast)?;
        own_signatures = with_class;
        &own_signatures
    };

    let mut compiler = ClassCompiler {
        ast,
        signatures,
        class_name: &class.name,
        class_scope: SymbolTable::default(),
        subroutine_scope: SymbolTable::default(),
        subroutine_kind: SubroutineKind::Function,
        label_counter: 0,
        commands: Vec::with_capacity(ast.len() * 2),
        sourcemap: CodegenSourceMap::with_nodes(ast.len()),
    };
    compiler.class(class)?;

    log::trace!(
        "compiled class {} into {} vm commands",
        class.name,
        compiler.commands.len()
    );

    Ok(CompiledClass {
        class_name: class.name.clone(),
        commands: compiler.commands,
        sourcemap: compiler.sourcemap,
    })
}

struct ClassCompiler<'a> {
    ast: &'a Ast,
    signatures: &'a Signatures,
    class_name: &'a str,
    class_scope: SymbolTable,
    subroutine_scope: SymbolTable,
    subroutine_kind: SubroutineKind,
    // numbers the labels of ifs and whiles, restarts for every subroutine
    label_counter: usize,
    commands: Vec<Command>,
    sourcemap: CodegenSourceMap,
}

impl<'a> ClassCompiler<'a> {
    fn emit(&mut self, node: NodeIdx, command: Command) {
        self.sourcemap.record(node, self.commands.len());
        self.commands.push(command);
    }

    fn next_label_id(&mut self) -> usize {
        let id = self.label_counter;
        self.label_counter += 1;
        id
    }

    fn has_this(&self) -> bool {
        self.subroutine_kind != SubroutineKind::Function
    }

    /// subroutine scope first, then the class scope
    fn resolve(&self, name: &str) -> Option<&SymbolEntry> {
        if let Some(entry) = self.subroutine_scope.lookup(name) {
            return Some(entry);
        }
        self.class_scope
            .lookup(name)
            // functions have no object whose fields they could access
            .filter(|entry| entry.kind != VarKind::Field || self.has_this())
    }

    fn resolve_variable(&self, name: &str, node: NodeIdx) -> CodegenResult<(Segment, u16)> {
        self.resolve(name)
            .map(|entry| (entry.segment(), entry.index))
            .ok_or_else(|| CodegenError::UndefinedSymbol {
                name: name.to_owned(),
                node,
            })
    }

    fn class(&mut self, class: &'a Class) -> CodegenResult<()> {
        for &idx in &class.var_declarations {
            let NodeKind::ClassVarDeclaration(declaration) = &self.ast.node(idx).kind else {
                continue;
            };
            let kind = match declaration.kind {
                ClassVarKind::Static => VarKind::Static,
                ClassVarKind::Field => VarKind::Field,
            };
            for name in &declaration.var_names {
                if self
                    .class_scope
                    .define(name, declaration.type_name.clone(), kind)
                    .is_none()
                {
                    return Err(CodegenError::DuplicateDeclaration {
                        name: name.clone(),
                        node: idx,
                    });
                }
            }
        }

        for &idx in &class.subroutines {
            if let NodeKind::Subroutine(subroutine) = &self.ast.node(idx).kind {
                self.subroutine(idx, subroutine)?;
            }
        }
        Ok(())
    }

    fn declare_local(
        &mut self,
        name: &str,
        type_name: &Type,
        kind: VarKind,
        node: NodeIdx,
    ) -> CodegenResult<()> {
        match self.subroutine_scope.define(name, type_name.clone(), kind) {
            Some(_) => Ok(()),
            None => Err(CodegenError::DuplicateDeclaration {
                name: name.to_owned(),
                node,
            }),
        }
    }

    fn subroutine(&mut self, node: NodeIdx, subroutine: &'a Subroutine) -> CodegenResult<()> {
        self.subroutine_scope.clear();
        self.subroutine_kind = subroutine.kind;
        self.label_counter = 0;

        if subroutine.kind == SubroutineKind::Method {
            let class_type = Type::ClassName(self.class_name.to_owned());
            self.declare_local("this", &class_type, VarKind::Argument, node)?;
        }

        for &idx in &subroutine.parameters {
            if let NodeKind::Parameter(parameter) = &self.ast.node(idx).kind {
                self.declare_local(
                    &parameter.var_name,
                    &parameter.type_name,
                    VarKind::Argument,
                    idx,
                )?;
            }
        }

        let NodeKind::SubroutineBody(body) = &self.ast.node(subroutine.body).kind else {
            return Err(CodegenError::MissingSubroutineBody {
                name: subroutine.name.clone(),
                node: subroutine.body,
            });
        };
        for &idx in &body.var_declarations {
            if let NodeKind::VarDeclaration(declaration) = &self.ast.node(idx).kind {
                for name in &declaration.var_names {
                    self.declare_local(name, &declaration.type_name, VarKind::Local, idx)?;
                }
            }
        }

        let name = format!("{}.{}", self.class_name, subroutine.name);
        let n_locals = self.subroutine_scope.count(VarKind::Local);
        self.emit(node, Command::function(name, n_locals));

        match subroutine.kind {
            SubroutineKind::Constructor => {
                let n_fields = self.class_scope.count(VarKind::Field);
                self.emit(node, Command::push(Segment::Constant, n_fields));
                self.emit(node, Command::call("Memory.alloc", 1));
                self.emit(node, Command::pop(Segment::Pointer, 0));
            }
            SubroutineKind::Method => {
                self.emit(node, Command::push(Segment::Argument, 0));
                self.emit(node, Command::pop(Segment::Pointer, 0));
            }
            SubroutineKind::Function => {}
        }

        self.statements(&body.statements)?;

        let ends_with_return = body
            .statements
            .last()
            .and_then(|&idx| self.ast.statement(idx))
            .map_or(false, |s| matches!(s, Statement::Return(_)));
        if !ends_with_return {
            self.emit(subroutine.body, Command::push(Segment::Constant, 0));
            self.emit(subroutine.body, Command::Return);
        }

        Ok(())
    }

    fn statements(&mut self, statements: &[NodeIdx]) -> CodegenResult<()> {
        for &idx in statements {
            self.statement(idx)?;
        }
        Ok(())
    }

    fn statement(&mut self, node: NodeIdx) -> CodegenResult<()> {
        let Some(statement) = self.ast.statement(node) else {
            return Err(CodegenError::UnexpectedNode {
                expected: "a statement",
                node,
            });
        };

        match statement {
            Statement::Let {
                var_name,
                index: None,
                value,
            } => {
                let (segment, index) = self.resolve_variable(var_name, node)?;
                self.expression(*value)?;
                self.emit(node, Command::pop(segment, index));
            }
            Statement::Let {
                var_name,
                index: Some(array_index),
                value,
            } => {
                let (segment, index) = self.resolve_variable(var_name, node)?;
                self.emit(node, Command::push(segment, index));
                self.expression(*array_index)?;
                self.emit(node, Command::Add);
                // the value could itself use pointer 1, so the address is only set afterwards
                self.expression(*value)?;
                self.emit(node, Command::pop(Segment::Temp, 0));
                self.emit(node, Command::pop(Segment::Pointer, 1));
                self.emit(node, Command::push(Segment::Temp, 0));
                self.emit(node, Command::pop(Segment::That, 0));
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let id = self.next_label_id();
                let else_label = format!("IF_ELSE_{}", id);
                let end_label = format!("IF_END_{}", id);

                self.expression(*condition)?;
                self.emit(node, Command::Not);
                match else_branch {
                    Some(else_branch) => {
                        self.emit(node, Command::if_goto(&else_label));
                        self.statements(then_branch)?;
                        self.emit(node, Command::goto(&end_label));
                        self.emit(node, Command::label(else_label));
                        self.statements(else_branch)?;
                    }
                    None => {
                        self.emit(node, Command::if_goto(&end_label));
                        self.statements(then_branch)?;
                    }
                }
                self.emit(node, Command::label(end_label));
            }
            Statement::While { condition, body } => {
                let id = self.next_label_id();
                let start_label = format!("WHILE_START_{}", id);
                let end_label = format!("WHILE_END_{}", id);

                self.emit(node, Command::label(&start_label));
                self.expression(*condition)?;
                self.emit(node, Command::Not);
                self.emit(node, Command::if_goto(&end_label));
                self.statements(body)?;
                self.emit(node, Command::goto(start_label));
                self.emit(node, Command::label(end_label));
            }
            Statement::Do(call) => {
                self.expression(*call)?;
                // every call returns something, do just throws it away
                self.emit(node, Command::pop(Segment::Temp, 0));
            }
            Statement::Return(Some(value)) => {
                self.expression(*value)?;
                self.emit(node, Command::Return);
            }
            Statement::Return(None) => {
                self.emit(node, Command::push(Segment::Constant, 0));
                self.emit(node, Command::Return);
            }
        }

        Ok(())
    }

    fn expression(&mut self, node: NodeIdx) -> CodegenResult<()> {
        let Some(expression) = self.ast.expression(node) else {
            return Err(CodegenError::UnexpectedNode {
                expected: "an expression",
                node,
            });
        };

        match expression {
            Expression::IntConstant(value) => {
                self.emit(node, Command::push(Segment::Constant, *value));
            }
            Expression::StringConstant(value) => self.string_constant(node, value),
            Expression::KeywordConstant(constant) => match constant {
                KeywordConstant::True => {
                    self.emit(node, Command::push(Segment::Constant, 0));
                    self.emit(node, Command::Not);
                }
                KeywordConstant::False | KeywordConstant::Null => {
                    self.emit(node, Command::push(Segment::Constant, 0));
                }
                KeywordConstant::This => {
                    if !self.has_this() {
                        return Err(CodegenError::UndefinedSymbol {
                            name: "this".to_owned(),
                            node,
                        });
                    }
                    self.emit(node, Command::push(Segment::Pointer, 0));
                }
            },
            Expression::Variable(name) => {
                let (segment, index) = self.resolve_variable(name, node)?;
                self.emit(node, Command::push(segment, index));
            }
            Expression::ArrayAccess { var_name, index } => {
                let (segment, base) = self.resolve_variable(var_name, node)?;
                self.emit(node, Command::push(segment, base));
                self.expression(*index)?;
                self.emit(node, Command::Add);
                self.emit(node, Command::pop(Segment::Pointer, 1));
                self.emit(node, Command::push(Segment::That, 0));
            }
            Expression::Call(call) => self.call(node, call)?,
            Expression::Parenthesized(inner) => self.expression(*inner)?,
            Expression::Unary { operator, operand } => {
                self.expression(*operand)?;
                let command = match operator {
                    UnaryOperator::Minus => Command::Neg,
                    UnaryOperator::Not => Command::Not,
                };
                self.emit(node, command);
            }
            Expression::Binary { operator, lhs, rhs } => {
                self.expression(*lhs)?;
                self.expression(*rhs)?;
                match operator {
                    BinaryOperator::Plus => self.emit(node, Command::Add),
                    BinaryOperator::Minus => self.emit(node, Command::Sub),
                    BinaryOperator::Multiply => self.emit(node, Command::call("Math.multiply", 2)),
                    BinaryOperator::Divide => self.emit(node, Command::call("Math.divide", 2)),
                    BinaryOperator::And => self.emit(node, Command::And),
                    BinaryOperator::Or => self.emit(node, Command::Or),
                    BinaryOperator::LessThan => self.emit(node, Command::Lt),
                    BinaryOperator::GreaterThan => self.emit(node, Command::Gt),
                    BinaryOperator::Equals => self.emit(node, Command::Eq),
                    BinaryOperator::LessThanOrEquals => {
                        self.emit(node, Command::Gt);
                        self.emit(node, Command::Not);
                    }
                    BinaryOperator::GreaterThanOrEquals => {
                        self.emit(node, Command::Lt);
                        self.emit(node, Command::Not);
                    }
                }
            }
        }

        Ok(())
    }

    fn string_constant(&mut self, node: NodeIdx, value: &str) {
        let units: Vec<u16> = value.encode_utf16().collect();
        self.emit(node, Command::push(Segment::Constant, units.len() as u16));
        self.emit(node, Command::call("String.new", 1));

        for unit in units {
            if unit > crate::definitions::MAX_CONSTANT {
                // constants only have 15 bits
                self.emit(node, Command::push(Segment::Constant, !unit));
                self.emit(node, Command::Not);
            } else {
                self.emit(node, Command::push(Segment::Constant, unit));
            }
            self.emit(node, Command::call("String.appendChar", 2));
        }
    }

    fn check_arity(
        &self,
        signature: Option<Signature>,
        name: &str,
        call: &SubroutineCall,
        node: NodeIdx,
    ) -> CodegenResult<()> {
        match signature {
            Some(signature) if signature.n_params != call.arguments.len() => {
                Err(CodegenError::ArityMismatch {
                    name: name.to_owned(),
                    expected: signature.n_params,
                    found: call.arguments.len(),
                    node,
                })
            }
            _ => Ok(()),
        }
    }

    fn arguments(&mut self, call: &SubroutineCall) -> CodegenResult<u16> {
        for &argument in &call.arguments {
            self.expression(argument)?;
        }
        Ok(call.arguments.len() as u16)
    }

    fn call(&mut self, node: NodeIdx, call: &SubroutineCall) -> CodegenResult<()> {
        let undefined = |name: String| CodegenError::UndefinedSymbol { name, node };

        match &call.receiver {
            // a method of the current object or a function of the current class
            None => {
                let name = format!("{}.{}", self.class_name, call.name);
                let signature = self
                    .signatures
                    .lookup(self.class_name, &call.name)
                    .ok_or_else(|| undefined(name.clone()))?;
                self.check_arity(Some(signature), &name, call, node)?;

                if signature.kind == SubroutineKind::Method {
                    if !self.has_this() {
                        return Err(undefined("this".to_owned()));
                    }
                    self.emit(node, Command::push(Segment::Pointer, 0));
                    let n_args = self.arguments(call)?;
                    self.emit(node, Command::call(name, n_args + 1));
                } else {
                    let n_args = self.arguments(call)?;
                    self.emit(node, Command::call(name, n_args));
                }
            }
            Some(receiver) => match self.resolve(receiver).cloned() {
                // a method call on an object
                Some(entry) => {
                    let Type::ClassName(class) = &entry.type_name else {
                        return Err(undefined(format!("{}.{}", receiver, call.name)));
                    };
                    let name = format!("{}.{}", class, call.name);
                    let signature = self.signatures.lookup(class, &call.name);
                    if signature.is_none() && self.signatures.has_class(class) {
                        return Err(undefined(name));
                    }
                    self.check_arity(signature, &name, call, node)?;

                    self.emit(node, Command::push(entry.segment(), entry.index));
                    let n_args = self.arguments(call)?;
                    self.emit(node, Command::call(name, n_args + 1));
                }
                // a function or constructor of some class
                None => {
                    let name = format!("{}.{}", receiver, call.name);
                    let signature = self.signatures.lookup(receiver, &call.name);
                    if signature.is_none() && self.signatures.has_class(receiver) {
                        return Err(undefined(name));
                    }
                    self.check_arity(signature, &name, call, node)?;

                    let n_args = self.arguments(call)?;
                    self.emit(node, Command::call(name, n_args));
                }
            },
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jack::sourcemap::{all_vm_command_idxs, ParserSourceMap};
    use crate::parse::jack::{parse_class, tokenize};

    fn parse(src: &str) -> Ast {
        parse_class(&tokenize(src).unwrap()).unwrap()
    }

    fn compile(src: &str) -> CodegenResult<Vec<String>> {
        let ast = parse(src);
        compile_class(&ast, &Signatures::default())
            .map(|c| c.commands.iter().map(ToString::to_string).collect())
    }

    fn compile_ok(src: &str) -> Vec<String> {
        compile(src).unwrap()
    }

    #[test]
    fn test_print_sum() {
        let commands =
            compile_ok("class Main { function void main() { do Output.printInt(1+2); return; } }");
        assert_eq!(
            commands,
            vec![
                "function Main.main 0",
                "push constant 1",
                "push constant 2",
                "add",
                "call Output.printInt 1",
                "pop temp 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_constructor_and_methods() {
        let commands = compile_ok(
            r#"
            class Point {
                field int x, y;
                static int count;

                constructor Point new(int ax, int ay) {
                    let x = ax;
                    let y = ay;
                    let count = count + 1;
                    return this;
                }

                method int getX() { return x; }

                method int sum() { return getX() + y; }
            }"#,
        );
        assert_eq!(
            commands,
            vec![
                "function Point.new 0",
                "push constant 2",
                "call Memory.alloc 1",
                "pop pointer 0",
                "push argument 0",
                "pop this 0",
                "push argument 1",
                "pop this 1",
                "push static 0",
                "push constant 1",
                "add",
                "pop static 0",
                "push pointer 0",
                "return",
                "function Point.getX 0",
                "push argument 0",
                "pop pointer 0",
                "push this 0",
                "return",
                "function Point.sum 0",
                "push argument 0",
                "pop pointer 0",
                "push pointer 0",
                "call Point.getX 1",
                "push this 1",
                "add",
                "return",
            ]
        );
    }

    #[test]
    fn test_method_arguments_start_after_this() {
        let commands = compile_ok(
            "class A { method int f(int a, int b) { var int c; let c = b; return c; } }",
        );
        assert_eq!(
            commands,
            vec![
                "function A.f 1",
                "push argument 0",
                "pop pointer 0",
                "push argument 2",
                "pop local 0",
                "push local 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_control_flow_labels() {
        let commands = compile_ok(
            r#"
            class Main {
                function void main() {
                    var int i;
                    while (i < 10) {
                        if (i = 5) { let i = 0; } else { let i = i + 1; }
                        if (false) { let i = 1; }
                    }
                    return;
                }
            }"#,
        );
        assert_eq!(
            commands,
            vec![
                "function Main.main 1",
                "label WHILE_START_0",
                "push local 0",
                "push constant 10",
                "lt",
                "not",
                "if-goto WHILE_END_0",
                "push local 0",
                "push constant 5",
                "eq",
                "not",
                "if-goto IF_ELSE_1",
                "push constant 0",
                "pop local 0",
                "goto IF_END_1",
                "label IF_ELSE_1",
                "push local 0",
                "push constant 1",
                "add",
                "pop local 0",
                "label IF_END_1",
                "push constant 0",
                "not",
                "if-goto IF_END_2",
                "push constant 1",
                "pop local 0",
                "label IF_END_2",
                "goto WHILE_START_0",
                "label WHILE_END_0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_label_counter_restarts_per_subroutine() {
        let commands = compile_ok(
            r#"
            class Main {
                function void a() { while (true) { } return; }
                function void b() { while (true) { } return; }
            }"#,
        );
        let labels: Vec<_> = commands
            .iter()
            .filter(|c| c.starts_with("label"))
            .collect();
        assert_eq!(
            labels,
            vec![
                "label WHILE_START_0",
                "label WHILE_END_0",
                "label WHILE_START_0",
                "label WHILE_END_0"
            ]
        );
    }

    #[test]
    fn test_arrays() {
        let commands = compile_ok(
            r#"
            class Main {
                function void main() {
                    var Array a;
                    let a[1] = a[2];
                    return;
                }
            }"#,
        );
        assert_eq!(
            commands,
            vec![
                "function Main.main 1",
                "push local 0",
                "push constant 1",
                "add",
                "push local 0",
                "push constant 2",
                "add",
                "pop pointer 1",
                "push that 0",
                "pop temp 0",
                "pop pointer 1",
                "push temp 0",
                "pop that 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_operators_and_constants() {
        let commands = compile_ok(
            "class Main { function int f() { return (-1 * 2) / ~true <= (3 >= null); } }",
        );
        assert_eq!(
            commands,
            vec![
                "function Main.f 0",
                "push constant 1",
                "neg",
                "push constant 2",
                "call Math.multiply 2",
                "push constant 0",
                "not",
                "not",
                "call Math.divide 2",
                "push constant 3",
                "push constant 0",
                "lt",
                "not",
                "gt",
                "not",
                "return",
            ]
        );
    }

    #[test]
    fn test_string_constants() {
        let commands = compile_ok("class Main { function void f() { do Output.printString(\"Hi\"); } }");
        assert_eq!(
            &commands[1..9],
            &[
                "push constant 2",
                "call String.new 1",
                "push constant 72",
                "call String.appendChar 2",
                "push constant 105",
                "call String.appendChar 2",
                "call Output.printString 1",
                "pop temp 0",
            ]
        );
        // implicit return
        assert_eq!(&commands[9..], &["push constant 0", "return"]);
    }

    #[test]
    fn test_method_calls_on_variables() {
        let commands = compile_ok(
            r#"
            class Main {
                function void main() {
                    var Point p;
                    let p = Point.new(1, 2);
                    do p.move(3);
                    return;
                }
            }"#,
        );
        assert_eq!(
            &commands[1..],
            &[
                "push constant 1",
                "push constant 2",
                "call Point.new 2",
                "pop local 0",
                "push local 0",
                "push constant 3",
                "call Point.move 2",
                "pop temp 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_undefined_symbols() {
        assert_eq!(
            compile("class Main { function void main() { let x = 1; return; } }"),
            Err(CodegenError::UndefinedSymbol {
                name: "x".to_owned(),
                node: 1
            })
        );

        // fields are not accessible from functions
        assert!(matches!(
            compile("class Main { field int x; function int f() { return x; } }"),
            Err(CodegenError::UndefinedSymbol { name, .. }) if name == "x"
        ));
        assert!(matches!(
            compile("class Main { function Main f() { return this; } }"),
            Err(CodegenError::UndefinedSymbol { name, .. }) if name == "this"
        ));
        assert!(matches!(
            compile("class Main { function void f() { do g(); return; } }"),
            Err(CodegenError::UndefinedSymbol { name, .. }) if name == "Main.g"
        ));
        assert!(matches!(
            compile("class Main { function void f() { do Main.g(); return; } }"),
            Err(CodegenError::UndefinedSymbol { name, .. }) if name == "Main.g"
        ));
    }

    #[test]
    fn test_duplicate_declarations() {
        assert!(matches!(
            compile("class Main { field int x; static int x; }"),
            Err(CodegenError::DuplicateDeclaration { name, .. }) if name == "x"
        ));
        assert!(matches!(
            compile("class Main { function void f(int a) { var int a; return; } }"),
            Err(CodegenError::DuplicateDeclaration { name, .. }) if name == "a"
        ));
        assert!(matches!(
            compile("class Main { function void f() { return; } method void f() { return; } }"),
            Err(CodegenError::DuplicateDeclaration { name, .. }) if name == "f"
        ));
        // locals may shadow fields
        assert!(compile("class Main { field int x; method void f() { var int x; let x = 1; return; } }").is_ok());
    }

    #[test]
    fn test_arity_mismatch() {
        assert!(matches!(
            compile("class Main { function int f(int a) { return a; } function void g() { do f(1, 2); return; } }"),
            Err(CodegenError::ArityMismatch { expected: 1, found: 2, .. })
        ));

        let point = parse("class Point { constructor Point new(int x) { return this; } }");
        let main = parse("class Main { function void main() { do Point.new(); return; } }");
        let mut signatures = Signatures::default();
        signatures.add_class(&point).unwrap();
        signatures.add_class(&main).unwrap();
        assert_eq!(
            compile_class(&main, &signatures).map(|_| ()),
            Err(CodegenError::ArityMismatch {
                name: "Point.new".to_owned(),
                expected: 1,
                found: 0,
                node: 0,
            })
        );
    }

    #[test]
    fn test_every_command_belongs_to_its_node_closure() {
        let src = r#"
            class Main {
                field Array a;
                method int f(int n) {
                    var int i, sum;
                    while (i < n) {
                        if (~(a[i] = 0)) { let sum = sum + a[i]; }
                        let i = i + 1;
                    }
                    do Output.printString("done");
                    return sum;
                }
            }"#;
        let tokens = tokenize(src).unwrap();
        let ast = parse_class(&tokens).unwrap();
        let parser = ParserSourceMap::new(&ast, tokens.len());
        let compiled = compile_class(&ast, &Signatures::default()).unwrap();

        assert_eq!(
            compiled.commands.len(),
            compiled.sourcemap.vm_command_idx_to_jack_node_idx.len()
        );
        for (vm_idx, &node) in compiled.sourcemap.vm_command_idx_to_jack_node_idx.iter().enumerate() {
            assert!(all_vm_command_idxs(&parser, &compiled.sourcemap, node).contains(&vm_idx));
        }

        // the class node covers everything
        let root = ast.root().unwrap();
        assert_eq!(
            (0..compiled.commands.len()).collect::<Vec<_>>(),
            all_vm_command_idxs(&parser, &compiled.sourcemap, root)
        );
    }

    /// `class Main { function void main() <body> }` with a body built by hand
    fn main_with_body(body: impl FnOnce(&mut Ast) -> NodeIdx) -> Ast {
        let mut ast = Ast::default();
        let body = body(&mut ast);
        let main = Subroutine {
            kind: SubroutineKind::Function,
            return_type: None,
            name: "main".to_owned(),
            parameters: Vec::new(),
            body,
        };
        let main = ast.push(NodeKind::Subroutine(main), 0..0, vec![body]);
        let class = Class {
            name: "Main".to_owned(),
            var_declarations: Vec::new(),
            subroutines: vec![main],
        };
        ast.push(NodeKind::Class(class), 0..0, vec![main]);
        ast
    }

    fn var_declaration(ast: &mut Ast) -> NodeIdx {
        let declaration = VarDeclaration {
            type_name: Type::Int,
            var_names: vec!["x".to_owned()],
        };
        ast.push(NodeKind::VarDeclaration(declaration), 0..0, Vec::new())
    }

    #[test]
    fn test_misplaced_nodes_are_errors() {
        let ast = main_with_body(|ast| {
            let declaration = var_declaration(ast);
            let body = SubroutineBody {
                var_declarations: Vec::new(),
                statements: vec![declaration],
            };
            ast.push(NodeKind::SubroutineBody(body), 0..0, vec![declaration])
        });
        assert_eq!(
            Err(CodegenError::UnexpectedNode {
                expected: "a statement",
                node: 0
            }),
            compile_class(&ast, &Signatures::default()).map(|_| ())
        );

        let ast = main_with_body(|ast| {
            let declaration = var_declaration(ast);
            let ret = ast.push(
                NodeKind::Statement(Statement::Return(Some(declaration))),
                0..0,
                vec![declaration],
            );
            let body = SubroutineBody {
                var_declarations: Vec::new(),
                statements: vec![ret],
            };
            ast.push(NodeKind::SubroutineBody(body), 0..0, vec![ret])
        });
        assert_eq!(
            Err(CodegenError::UnexpectedNode {
                expected: "an expression",
                node: 0
            }),
            compile_class(&ast, &Signatures::default()).map(|_| ())
        );

        let ast = main_with_body(var_declaration);
        assert_eq!(
            Err(CodegenError::MissingSubroutineBody {
                name: "main".to_owned(),
                node: 0
            }),
            compile_class(&ast, &Signatures::default()).map(|_| ())
        );
    }
}
