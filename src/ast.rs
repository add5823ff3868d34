use std::fmt;

#[derive(Debug, Clone)]
pub enum Stmt {
    FunctionDef {
        name: String,
        params: Vec<Parameter>,
        body: Vec<Box<Stmt>>,
        decorator_list: Vec<Box<Expr>>,
        returns: Option<Box<Expr>>,
        is_async: bool,
        line: usize,
        column: usize,
    },
    Return {
        value: Option<Box<Expr>>,
        line: usize,
        column: usize,
    },
    Assign {
        targets: Vec<Box<Expr>>,
        value: Box<Expr>,
        line: usize,
        column: usize,
    },
    AugAssign {
        target: Box<Expr>,
        op: Operator,
        value: Box<Expr>,
        line: usize,
        column: usize,
    },
    For {
        target: Box<Expr>,
        iter: Box<Expr>,
        body: Vec<Box<Stmt>>,
        orelse: Vec<Box<Stmt>>,
        line: usize,
        column: usize,
    },
    While {
        test: Box<Expr>,
        body: Vec<Box<Stmt>>,
        orelse: Vec<Box<Stmt>>,
        line: usize,
        column: usize,
    },
    If {
        test: Box<Expr>,
        body: Vec<Box<Stmt>>,
        orelse: Vec<Box<Stmt>>,
        line: usize,
        column: usize,
    },
    Assert {
        test: Box<Expr>,
        msg: Option<Box<Expr>>,
        line: usize,
        column: usize,
    },
    Expr {
        value: Box<Expr>,
        line: usize,
        column: usize,
    },
    Pass {
        line: usize,
        column: usize,
    },
    Break {
        line: usize,
        column: usize,
    },
    Continue {
        line: usize,
        column: usize,
    },
}

impl Stmt {
    pub fn line(&self) -> usize {
        match self {
            Stmt::FunctionDef { line, .. }
            | Stmt::Return { line, .. }
            | Stmt::Assign { line, .. }
            | Stmt::AugAssign { line, .. }
            | Stmt::For { line, .. }
            | Stmt::While { line, .. }
            | Stmt::If { line, .. }
            | Stmt::Assert { line, .. }
            | Stmt::Expr { line, .. }
            | Stmt::Pass { line, .. }
            | Stmt::Break { line, .. }
            | Stmt::Continue { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    BoolOp {
        op: BoolOperator,
        values: Vec<Box<Expr>>,
        line: usize,
        column: usize,
    },
    BinOp {
        left: Box<Expr>,
        op: Operator,
        right: Box<Expr>,
        line: usize,
        column: usize,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
        line: usize,
        column: usize,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
        line: usize,
        column: usize,
    },
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOperator>,
        comparators: Vec<Box<Expr>>,
        line: usize,
        column: usize,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Box<Expr>>,
        keywords: Vec<(Option<String>, Box<Expr>)>,
        line: usize,
        column: usize,
    },
    Yield {
        value: Option<Box<Expr>>,
        line: usize,
        column: usize,
    },
    Num {
        value: Number,
        line: usize,
        column: usize,
    },
    Str {
        value: String,
        line: usize,
        column: usize,
    },
    NameConstant {
        value: NameConstant,
        line: usize,
        column: usize,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
        ctx: ExprContext,
        line: usize,
        column: usize,
    },
    Subscript {
        value: Box<Expr>,
        slice: Box<Expr>,
        ctx: ExprContext,
        line: usize,
        column: usize,
    },
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
        line: usize,
        column: usize,
    },
    Starred {
        value: Box<Expr>,
        ctx: ExprContext,
        line: usize,
        column: usize,
    },
    Name {
        id: String,
        ctx: ExprContext,
        line: usize,
        column: usize,
    },
    List {
        elts: Vec<Box<Expr>>,
        ctx: ExprContext,
        line: usize,
        column: usize,
    },
    Tuple {
        elts: Vec<Box<Expr>>,
        ctx: ExprContext,
        line: usize,
        column: usize,
    },
}

impl Expr {
    pub fn line(&self) -> usize {
        match self {
            Expr::BoolOp { line, .. }
            | Expr::BinOp { line, .. }
            | Expr::UnaryOp { line, .. }
            | Expr::IfExp { line, .. }
            | Expr::Compare { line, .. }
            | Expr::Call { line, .. }
            | Expr::Yield { line, .. }
            | Expr::Num { line, .. }
            | Expr::Str { line, .. }
            | Expr::NameConstant { line, .. }
            | Expr::Attribute { line, .. }
            | Expr::Subscript { line, .. }
            | Expr::Slice { line, .. }
            | Expr::Starred { line, .. }
            | Expr::Name { line, .. }
            | Expr::List { line, .. }
            | Expr::Tuple { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprContext {
    Load,
    Store,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoolOperator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnaryOperator {
    Invert,
    Not,
    UAdd,
    USub,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CmpOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NameConstant {
    None,
    True,
    False,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub typ: Option<Box<Expr>>,
    pub default: Option<Box<Expr>>,
    pub is_vararg: bool, // For *args
    pub is_kwarg: bool,  // For **kwargs
}

#[derive(Debug, Clone)]
pub struct Module {
    pub body: Vec<Box<Stmt>>,
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Module:")?;
        for stmt in &self.body {
            write!(f, "  {}", stmt)?;
        }
        Ok(())
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stmt::FunctionDef { name, .. } => write!(f, "FunctionDef: {}", name),
            Stmt::Return { .. } => write!(f, "Return"),
            Stmt::Assign { .. } => write!(f, "Assign"),
            Stmt::AugAssign { .. } => write!(f, "AugAssign"),
            Stmt::For { .. } => write!(f, "For"),
            Stmt::While { .. } => write!(f, "While"),
            Stmt::If { .. } => write!(f, "If"),
            Stmt::Assert { .. } => write!(f, "Assert"),
            Stmt::Expr { .. } => write!(f, "Expr"),
            Stmt::Pass { .. } => write!(f, "Pass"),
            Stmt::Break { .. } => write!(f, "Break"),
            Stmt::Continue { .. } => write!(f, "Continue"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::BoolOp { .. } => write!(f, "BoolOp"),
            Expr::BinOp { .. } => write!(f, "BinOp"),
            Expr::UnaryOp { .. } => write!(f, "UnaryOp"),
            Expr::IfExp { .. } => write!(f, "IfExp"),
            Expr::Compare { .. } => write!(f, "Compare"),
            Expr::Call { .. } => write!(f, "Call"),
            Expr::Yield { .. } => write!(f, "Yield"),
            Expr::Num { value, .. } => write!(f, "Num({:?})", value),
            Expr::Str { value, .. } => write!(f, "Str({})", value),
            Expr::NameConstant { value, .. } => write!(f, "NameConstant({:?})", value),
            Expr::Attribute { value, attr, .. } => write!(f, "Attribute({}.{})", value, attr),
            Expr::Subscript { .. } => write!(f, "Subscript"),
            Expr::Slice { .. } => write!(f, "Slice"),
            Expr::Starred { .. } => write!(f, "Starred"),
            Expr::Name { id, .. } => write!(f, "Name({})", id),
            Expr::List { .. } => write!(f, "List"),
            Expr::Tuple { .. } => write!(f, "Tuple"),
        }
    }
}
