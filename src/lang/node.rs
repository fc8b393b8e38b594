/// Abstract Syntax Tree node for a `.lk` program.
///
/// The tree is built once by the parser and only read afterwards. Every node
/// owns its children outright, so there is no sharing and no cycles. Variable
/// references are already resolved to slot numbers; names survive only on
/// [`Function`] and on `Root` so the tree can be dumped back out.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // ───────────────────────────── Structure ────────────────────────────
    /// Whole program.
    ///
    /// Always has exactly three children: the global initializer block, the
    /// function table and `main`.
    Root {
        /// Global variable names, indexed by slot.
        globals: Vec<String>,
        init: Box<Node>,
        functions: Box<Node>,
        main: Box<Node>,
    },

    /// User functions in id order (ids start at 1, `main` is 0).
    FunctionTable(Vec<Node>),

    /// A `func name(params) lol ... kek` definition.
    UserFunctionDecl(Function),

    /// The `main() lol ... kek` entry point.
    MainFunction(Function),

    /// Hoisted initializers of one scope, in declaration order.
    ///
    /// Each child is an assignment `Operator` writing one declared slot.
    VarInitBlock(Vec<Node>),

    // ───────────────────────────── Leaves ───────────────────────────────
    /// Numeric literal.
    NumberLiteral(f64),

    /// Global variable, by absolute slot.
    GlobalVarRef(usize),

    /// Local variable, by frame offset (parameters come first).
    LocalVarRef(usize),

    /// Parameter, by frame offset.
    ParamRef(usize),

    // ───────────────────────────── Expressions ──────────────────────────
    /// Unary, binary or assignment operator.
    ///
    /// For assignments the first operand is the target variable reference.
    Operator { op: Operator, operands: Vec<Node> },

    /// Built-in operation or user function call.
    BuiltinCall { builtin: Builtin, args: Vec<Node> },

    // ───────────────────────────── Statements ───────────────────────────
    /// `if` / `while`.
    Logic(Logic),

    /// `return [expr];`
    Return(Option<Box<Node>>),
}

/// A user function or `main`.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub id: usize,
    pub name: String,
    pub params: Vec<String>,
    pub locals: Vec<String>,
    /// Always a `VarInitBlock`.
    pub init: Box<Node>,
    pub body: Vec<Node>,
}

impl Function {
    /// Slots occupied by one activation: parameters plus locals.
    pub fn frame_size(&self) -> usize {
        self.params.len() + self.locals.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Logic {
    If {
        cond: Box<Node>,
        then_body: Vec<Node>,
        else_body: Option<Vec<Node>>,
    },
    While {
        cond: Box<Node>,
        body: Vec<Node>,
    },
}

/// Operator codes, numbered as they appear in the tree dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Assign = 0,
    Plus = 1,
    Minus = 2,
    Multiply = 3,
    Divide = 4,
    Equal = 5,
    NotEqual = 6,
    Lower = 7,
    Greater = 8,
    NotLower = 9,
    NotGreater = 10,
    Not = 11,
    Or = 12,
    And = 13,
    PlusAssign = 14,
    MinusAssign = 15,
    MultiplyAssign = 16,
    DivideAssign = 17,
}

impl Operator {
    pub fn from_binary_symbol(symbol: &str) -> Option<Operator> {
        Some(match symbol {
            "+" => Operator::Plus,
            "-" => Operator::Minus,
            "*" => Operator::Multiply,
            "/" => Operator::Divide,
            "==" => Operator::Equal,
            "!=" => Operator::NotEqual,
            "<" => Operator::Lower,
            ">" => Operator::Greater,
            ">=" => Operator::NotLower,
            "<=" => Operator::NotGreater,
            "||" => Operator::Or,
            "&&" => Operator::And,
            _ => return None,
        })
    }

    pub fn from_assign_symbol(symbol: &str) -> Option<Operator> {
        Some(match symbol {
            "=" => Operator::Assign,
            "+=" => Operator::PlusAssign,
            "-=" => Operator::MinusAssign,
            "*=" => Operator::MultiplyAssign,
            "/=" => Operator::DivideAssign,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Assign => "=",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Lower => "<",
            Operator::Greater => ">",
            Operator::NotLower => ">=",
            Operator::NotGreater => "<=",
            Operator::Not => "!",
            Operator::Or => "||",
            Operator::And => "&&",
            Operator::PlusAssign => "+=",
            Operator::MinusAssign => "-=",
            Operator::MultiplyAssign => "*=",
            Operator::DivideAssign => "/=",
        }
    }

    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            Operator::Assign
                | Operator::PlusAssign
                | Operator::MinusAssign
                | Operator::MultiplyAssign
                | Operator::DivideAssign
        )
    }

    /// The arithmetic operator a compound assignment applies.
    pub fn compound_base(&self) -> Option<Operator> {
        match self {
            Operator::PlusAssign => Some(Operator::Plus),
            Operator::MinusAssign => Some(Operator::Minus),
            Operator::MultiplyAssign => Some(Operator::Multiply),
            Operator::DivideAssign => Some(Operator::Divide),
            _ => None,
        }
    }
}

/// Built-in codes, numbered as they appear in the tree dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Scan,
    Print,
    Sin,
    Cos,
    /// Call of the user function with this id.
    Call(usize),
    Sqrt,
}

impl Builtin {
    pub fn code(&self) -> usize {
        match self {
            Builtin::Scan => 0,
            Builtin::Print => 1,
            Builtin::Sin => 2,
            Builtin::Cos => 3,
            Builtin::Call(_) => 4,
            Builtin::Sqrt => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Scan => "scan",
            Builtin::Print => "print",
            Builtin::Sin => "sin",
            Builtin::Cos => "cos",
            Builtin::Call(_) => "call",
            Builtin::Sqrt => "sqrt",
        }
    }
}

impl Node {
    /// Numeric kind code used by the tree dump.
    pub fn code(&self) -> usize {
        match self {
            Node::Root { .. } => 0,
            Node::FunctionTable(_) => 1,
            Node::UserFunctionDecl(_) => 2,
            Node::NumberLiteral(_) => 3,
            Node::GlobalVarRef(_) => 4,
            Node::LocalVarRef(_) => 5,
            Node::ParamRef(_) => 6,
            Node::Operator { .. } => 7,
            Node::Logic(_) => 8,
            Node::MainFunction(_) => 9,
            Node::BuiltinCall { .. } => 10,
            Node::VarInitBlock(_) => 11,
            Node::Return(_) => 12,
        }
    }

    /// The kind-dependent numeric payload: literal value, slot, operator
    /// code, logic code, builtin code or function id.
    pub fn value(&self) -> f64 {
        match self {
            Node::NumberLiteral(v) => *v,
            Node::GlobalVarRef(slot) | Node::LocalVarRef(slot) | Node::ParamRef(slot) => {
                *slot as f64
            }
            Node::Operator { op, .. } => *op as usize as f64,
            Node::Logic(Logic::If { .. }) => 0.0,
            Node::Logic(Logic::While { .. }) => 2.0,
            Node::BuiltinCall { builtin, .. } => builtin.code() as f64,
            Node::UserFunctionDecl(f) | Node::MainFunction(f) => f.id as f64,
            Node::Root { .. } | Node::FunctionTable(_) | Node::VarInitBlock(_) | Node::Return(_) => 0.0,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Root { .. } => "Root",
            Node::FunctionTable(_) => "FunctionTable",
            Node::UserFunctionDecl(_) => "UserFunctionDecl",
            Node::NumberLiteral(_) => "NumberLiteral",
            Node::GlobalVarRef(_) => "GlobalVarRef",
            Node::LocalVarRef(_) => "LocalVarRef",
            Node::ParamRef(_) => "ParamRef",
            Node::Operator { .. } => "Operator",
            Node::Logic(_) => "Logic",
            Node::MainFunction(_) => "MainFunction",
            Node::BuiltinCall { .. } => "BuiltinCall",
            Node::VarInitBlock(_) => "VarInitBlock",
            Node::Return(_) => "Return",
        }
    }

    /// True for variable reference leaves, the only valid assignment targets.
    pub fn is_var_ref(&self) -> bool {
        matches!(
            self,
            Node::GlobalVarRef(_) | Node::LocalVarRef(_) | Node::ParamRef(_)
        )
    }

    pub fn binary(op: Operator, lhs: Node, rhs: Node) -> Node {
        Node::Operator {
            op,
            operands: vec![lhs, rhs],
        }
    }

    pub fn unary(op: Operator, operand: Node) -> Node {
        Node::Operator {
            op,
            operands: vec![operand],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_symbols_round_trip() {
        for sym in ["+", "-", "*", "/", "==", "!=", "<", ">", "<=", ">=", "||", "&&"] {
            let op = Operator::from_binary_symbol(sym).unwrap();
            assert_eq!(op.symbol(), sym);
            assert!(!op.is_assignment());
        }
        for sym in ["=", "+=", "-=", "*=", "/="] {
            let op = Operator::from_assign_symbol(sym).unwrap();
            assert_eq!(op.symbol(), sym);
            assert!(op.is_assignment());
        }
    }

    #[test]
    fn compound_assignment_base() {
        assert_eq!(Operator::DivideAssign.compound_base(), Some(Operator::Divide));
        assert_eq!(Operator::Assign.compound_base(), None);
    }

    #[test]
    fn value_reflects_payload() {
        assert_eq!(Node::NumberLiteral(2.5).value(), 2.5);
        assert_eq!(Node::LocalVarRef(3).value(), 3.0);
        let call = Node::BuiltinCall {
            builtin: Builtin::Call(4),
            args: vec![],
        };
        assert_eq!(call.value(), 4.0);
        assert_eq!(call.code(), 10);
    }

    #[test]
    fn frame_size_counts_params_and_locals() {
        let f = Function {
            id: 1,
            name: "f".to_string(),
            params: vec!["n".to_string()],
            locals: vec!["a".to_string(), "b".to_string()],
            init: Box::new(Node::VarInitBlock(vec![])),
            body: vec![],
        };
        assert_eq!(f.frame_size(), 3);
    }
}
