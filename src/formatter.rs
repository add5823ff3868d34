use crate::ast::{
    BoolOperator, CmpOperator, Expr, Module, NameConstant, Number, Operator, Parameter, Stmt,
    UnaryOperator,
};
use crate::visitor::Visitor;

// Precedence levels used to decide where parentheses are required when
// reconstructing source text. Higher binds tighter.
const PREC_TUPLE: u8 = 5;
const PREC_TERNARY: u8 = 10;
const PREC_OR: u8 = 20;
const PREC_AND: u8 = 30;
const PREC_NOT: u8 = 40;
const PREC_COMPARE: u8 = 50;
const PREC_BIT_OR: u8 = 60;
const PREC_BIT_XOR: u8 = 70;
const PREC_BIT_AND: u8 = 80;
const PREC_SHIFT: u8 = 90;
const PREC_ARITH: u8 = 100;
const PREC_TERM: u8 = 110;
const PREC_UNARY: u8 = 120;
const PREC_POWER: u8 = 130;
const PREC_POSTFIX: u8 = 140;
const PREC_ATOM: u8 = 150;

pub struct CodeFormatter {
    indent_level: usize,
    indent_size: usize,
    output: String,
}

impl CodeFormatter {
    pub fn new(indent_size: usize) -> Self {
        CodeFormatter {
            indent_level: 0,
            indent_size,
            output: String::new(),
        }
    }

    pub fn get_output(&self) -> &str {
        &self.output
    }

    fn indent(&self) -> String {
        " ".repeat(self.indent_level * self.indent_size)
    }

    fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn write_indented(&mut self, text: &str) {
        self.output.push_str(&self.indent());
        self.output.push_str(text);
    }

    fn increase_indent(&mut self) {
        self.indent_level += 1;
    }

    fn decrease_indent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    fn format_operator(op: &Operator) -> &'static str {
        match op {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mult => "*",
            Operator::Div => "/",
            Operator::FloorDiv => "//",
            Operator::Mod => "%",
            Operator::Pow => "**",
            Operator::LShift => "<<",
            Operator::RShift => ">>",
            Operator::BitOr => "|",
            Operator::BitXor => "^",
            Operator::BitAnd => "&",
        }
    }

    fn format_unary_operator(op: &UnaryOperator) -> &'static str {
        match op {
            UnaryOperator::Invert => "~",
            UnaryOperator::Not => "not ",
            UnaryOperator::UAdd => "+",
            UnaryOperator::USub => "-",
        }
    }

    fn format_cmp_operator(op: &CmpOperator) -> &'static str {
        match op {
            CmpOperator::Eq => "==",
            CmpOperator::NotEq => "!=",
            CmpOperator::Lt => "<",
            CmpOperator::LtE => "<=",
            CmpOperator::Gt => ">",
            CmpOperator::GtE => ">=",
            CmpOperator::Is => "is",
            CmpOperator::IsNot => "is not",
            CmpOperator::In => "in",
            CmpOperator::NotIn => "not in",
        }
    }

    fn operator_precedence(op: &Operator) -> u8 {
        match op {
            Operator::BitOr => PREC_BIT_OR,
            Operator::BitXor => PREC_BIT_XOR,
            Operator::BitAnd => PREC_BIT_AND,
            Operator::LShift | Operator::RShift => PREC_SHIFT,
            Operator::Add | Operator::Sub => PREC_ARITH,
            Operator::Mult | Operator::Div | Operator::FloorDiv | Operator::Mod => PREC_TERM,
            Operator::Pow => PREC_POWER,
        }
    }

    fn precedence(expr: &Expr) -> u8 {
        match expr {
            Expr::Tuple { .. } => PREC_TUPLE,
            Expr::IfExp { .. } => PREC_TERNARY,
            Expr::BoolOp { op, .. } => match op {
                BoolOperator::Or => PREC_OR,
                BoolOperator::And => PREC_AND,
            },
            Expr::UnaryOp { op, .. } => match op {
                UnaryOperator::Not => PREC_NOT,
                _ => PREC_UNARY,
            },
            Expr::Compare { .. } => PREC_COMPARE,
            Expr::BinOp { op, .. } => Self::operator_precedence(op),
            Expr::Yield { .. } => PREC_TUPLE,
            Expr::Call { .. } | Expr::Subscript { .. } | Expr::Attribute { .. } => PREC_POSTFIX,
            _ => PREC_ATOM,
        }
    }

    /// Write an expression, parenthesizing it when its precedence is below
    /// what the surrounding context requires.
    fn format_expr(&mut self, expr: &Expr, min_prec: u8) {
        let prec = Self::precedence(expr);
        let needs_parens = prec < min_prec;
        if needs_parens {
            self.write("(");
        }

        match expr {
            Expr::BoolOp { op, values, .. } => {
                let (text, inner) = match op {
                    BoolOperator::Or => (" or ", PREC_AND),
                    BoolOperator::And => (" and ", PREC_NOT),
                };
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.write(text);
                    }
                    self.format_expr(value, inner);
                }
            }
            Expr::BinOp {
                left, op, right, ..
            } => {
                let op_prec = Self::operator_precedence(op);
                if matches!(op, Operator::Pow) {
                    // Power is right-associative
                    self.format_expr(left, op_prec + 1);
                    self.write(" ** ");
                    self.format_expr(right, op_prec);
                } else {
                    self.format_expr(left, op_prec);
                    self.write(&format!(" {} ", Self::format_operator(op)));
                    self.format_expr(right, op_prec + 1);
                }
            }
            Expr::UnaryOp { op, operand, .. } => {
                self.write(Self::format_unary_operator(op));
                let inner = match op {
                    UnaryOperator::Not => PREC_NOT,
                    _ => PREC_UNARY,
                };
                self.format_expr(operand, inner);
            }
            Expr::IfExp {
                test, body, orelse, ..
            } => {
                self.format_expr(body, PREC_OR);
                self.write(" if ");
                self.format_expr(test, PREC_OR);
                self.write(" else ");
                self.format_expr(orelse, PREC_TERNARY);
            }
            Expr::Compare {
                left,
                ops,
                comparators,
                ..
            } => {
                self.format_expr(left, PREC_BIT_OR);
                for (op, comparator) in ops.iter().zip(comparators.iter()) {
                    self.write(&format!(" {} ", Self::format_cmp_operator(op)));
                    self.format_expr(comparator, PREC_BIT_OR);
                }
            }
            Expr::Call {
                func,
                args,
                keywords,
                ..
            } => {
                self.format_expr(func, PREC_POSTFIX);
                self.write("(");
                let mut first = true;
                for arg in args {
                    if !first {
                        self.write(", ");
                    }
                    first = false;
                    self.format_expr(arg, PREC_TERNARY);
                }
                for (name, value) in keywords {
                    if !first {
                        self.write(", ");
                    }
                    first = false;
                    match name {
                        Some(name) => {
                            self.write(name);
                            self.write("=");
                            self.format_expr(value, PREC_TERNARY);
                        }
                        None => {
                            self.write("**");
                            self.format_expr(value, PREC_TERNARY);
                        }
                    }
                }
                self.write(")");
            }
            Expr::Yield { value, .. } => {
                self.write("yield");
                if let Some(value) = value {
                    self.write(" ");
                    self.format_expr(value, PREC_TUPLE);
                }
            }
            Expr::Num { value, .. } => match value {
                Number::Integer(i) => self.write(&i.to_string()),
                Number::Float(f) => {
                    if f.fract() == 0.0 && f.is_finite() {
                        self.write(&format!("{:.1}", f));
                    } else {
                        self.write(&f.to_string());
                    }
                }
            },
            Expr::Str { value, .. } => {
                self.write(&format_string_literal(value));
            }
            Expr::NameConstant { value, .. } => match value {
                NameConstant::None => self.write("None"),
                NameConstant::True => self.write("True"),
                NameConstant::False => self.write("False"),
            },
            Expr::Attribute { value, attr, .. } => {
                self.format_expr(value, PREC_POSTFIX);
                self.write(".");
                self.write(attr);
            }
            Expr::Subscript { value, slice, .. } => {
                self.format_expr(value, PREC_POSTFIX);
                self.write("[");
                self.format_expr(slice, PREC_TUPLE);
                self.write("]");
            }
            Expr::Slice {
                lower, upper, step, ..
            } => {
                if let Some(lower) = lower {
                    self.format_expr(lower, PREC_TERNARY);
                }
                self.write(":");
                if let Some(upper) = upper {
                    self.format_expr(upper, PREC_TERNARY);
                }
                if let Some(step) = step {
                    self.write(":");
                    self.format_expr(step, PREC_TERNARY);
                }
            }
            Expr::Starred { value, .. } => {
                self.write("*");
                self.format_expr(value, PREC_TERNARY);
            }
            Expr::Name { id, .. } => self.write(id),
            Expr::List { elts, .. } => {
                self.write("[");
                for (i, elt) in elts.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.format_expr(elt, PREC_TERNARY);
                }
                self.write("]");
            }
            Expr::Tuple { elts, .. } => {
                if elts.is_empty() {
                    self.write("()");
                } else {
                    for (i, elt) in elts.iter().enumerate() {
                        if i > 0 {
                            self.write(", ");
                        }
                        self.format_expr(elt, PREC_TERNARY);
                    }
                    if elts.len() == 1 {
                        self.write(",");
                    }
                }
            }
        }

        if needs_parens {
            self.write(")");
        }
    }

    fn format_parameter(&mut self, param: &Parameter) {
        if param.is_vararg {
            self.write("*");
        }
        if param.is_kwarg {
            self.write("**");
        }
        self.write(&param.name);

        if let Some(typ) = &param.typ {
            self.write(": ");
            self.format_expr(typ, PREC_TERNARY);
        }
        if let Some(default) = &param.default {
            self.write(" = ");
            self.format_expr(default, PREC_TERNARY);
        }
    }

    fn format_body(&mut self, body: &[Box<Stmt>]) {
        self.increase_indent();
        if body.is_empty() {
            self.write_indented("pass");
            self.write("\n");
        } else {
            for stmt in body {
                self.visit_stmt(stmt);
            }
        }
        self.decrease_indent();
    }

    fn format_if(&mut self, test: &Expr, body: &[Box<Stmt>], orelse: &[Box<Stmt>], keyword: &str) {
        self.write_indented(keyword);
        self.write(" ");
        self.format_expr(test, PREC_TUPLE);
        self.write(":\n");
        self.format_body(body);

        if orelse.is_empty() {
            return;
        }

        // A lone nested `if` in the else branch collapses to `elif`
        if orelse.len() == 1 {
            if let Stmt::If {
                test: inner_test,
                body: inner_body,
                orelse: inner_orelse,
                ..
            } = orelse[0].as_ref()
            {
                self.format_if(inner_test, inner_body, inner_orelse, "elif");
                return;
            }
        }

        self.write_indented("else:\n");
        self.format_body(orelse);
    }
}

impl<'ast> Visitor<'ast, ()> for CodeFormatter {
    fn visit_module(&mut self, module: &'ast Module) {
        for (i, stmt) in module.body.iter().enumerate() {
            self.visit_stmt(stmt);

            if i < module.body.len() - 1 {
                // Blank line after function definitions
                if matches!(stmt.as_ref(), Stmt::FunctionDef { .. }) {
                    self.write("\n");
                }
            }
        }
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::FunctionDef {
                name,
                params,
                body,
                decorator_list,
                returns,
                is_async,
                ..
            } => {
                for decorator in decorator_list {
                    self.write_indented("@");
                    self.format_expr(decorator, PREC_POSTFIX);
                    self.write("\n");
                }

                if *is_async {
                    self.write_indented("async def ");
                } else {
                    self.write_indented("def ");
                }
                self.write(name);
                self.write("(");
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.format_parameter(param);
                }
                self.write(")");

                if let Some(ret) = returns {
                    self.write(" -> ");
                    self.format_expr(ret, PREC_TERNARY);
                }

                self.write(":\n");
                self.format_body(body);
            }
            Stmt::Return { value, .. } => {
                self.write_indented("return");
                if let Some(value) = value {
                    self.write(" ");
                    self.format_expr(value, 0);
                }
                self.write("\n");
            }
            Stmt::Assign { targets, value, .. } => {
                self.write_indented("");
                for target in targets {
                    self.format_expr(target, 0);
                    self.write(" = ");
                }
                self.format_expr(value, 0);
                self.write("\n");
            }
            Stmt::AugAssign {
                target, op, value, ..
            } => {
                self.write_indented("");
                self.format_expr(target, PREC_POSTFIX);
                self.write(&format!(" {}= ", Self::format_operator(op)));
                self.format_expr(value, 0);
                self.write("\n");
            }
            Stmt::For {
                target,
                iter,
                body,
                orelse,
                ..
            } => {
                self.write_indented("for ");
                self.format_expr(target, 0);
                self.write(" in ");
                self.format_expr(iter, 0);
                self.write(":\n");
                self.format_body(body);
                if !orelse.is_empty() {
                    self.write_indented("else:\n");
                    self.format_body(orelse);
                }
            }
            Stmt::While {
                test, body, orelse, ..
            } => {
                self.write_indented("while ");
                self.format_expr(test, PREC_TUPLE);
                self.write(":\n");
                self.format_body(body);
                if !orelse.is_empty() {
                    self.write_indented("else:\n");
                    self.format_body(orelse);
                }
            }
            Stmt::If {
                test, body, orelse, ..
            } => {
                self.format_if(test, body, orelse, "if");
            }
            Stmt::Assert { test, msg, .. } => {
                self.write_indented("assert ");
                self.format_expr(test, PREC_TERNARY);
                if let Some(msg) = msg {
                    self.write(", ");
                    self.format_expr(msg, PREC_TERNARY);
                }
                self.write("\n");
            }
            Stmt::Expr { value, .. } => {
                self.write_indented("");
                self.format_expr(value, 0);
                self.write("\n");
            }
            Stmt::Pass { .. } => {
                self.write_indented("pass");
                self.write("\n");
            }
            Stmt::Break { .. } => {
                self.write_indented("break");
                self.write("\n");
            }
            Stmt::Continue { .. } => {
                self.write_indented("continue");
                self.write("\n");
            }
        }
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        self.format_expr(expr, 0);
    }

    fn visit_parameter(&mut self, param: &'ast Parameter) {
        self.format_parameter(param);
    }
}

/// Reconstruct the source text of a single expression.
pub fn expr_source(expr: &Expr) -> String {
    let mut formatter = CodeFormatter::new(4);
    formatter.format_expr(expr, 0);
    formatter.get_output().to_string()
}

fn format_string_literal(value: &str) -> String {
    let mut result = String::with_capacity(value.len() + 2);
    result.push('"');
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            other => result.push(other),
        }
    }
    result.push('"');
    result
}
