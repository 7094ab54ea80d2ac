use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopLevel {
    FunctionDefinition(FunctionDefinition),
    GlobalVariableDefinition {
        name: String,
        expression: Box<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    pub name: String,
    pub args: Vec<String>,
    pub body: Block,
}

/// Top-level definitions in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub definitions: Vec<TopLevel>,
}

impl Program {
    pub fn new(definitions: Vec<TopLevel>) -> Program {
        Program { definitions }
    }
}

/// A sequence of expressions evaluated in the enclosing frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub expressions: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    BinaryExpression {
        operator: Operator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Literal(i64),
    Identifier(String),
    Assignment {
        name: String,
        expression: Box<Expression>,
    },
    Block(Block),
    While {
        condition: Box<Expression>,
        body: Block,
    },
    If {
        condition: Box<Expression>,
        then_clause: Block,
        else_clause: Option<Block>,
    },
    Println(Box<Expression>),
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Equal,
    NotEqual,
}

impl Operator {
    /// Surface token for the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::LessThan => "<",
            Operator::LessOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
        }
    }

    pub fn is_comparison(&self) -> bool {
        !matches!(
            self,
            Operator::Add | Operator::Subtract | Operator::Multiply | Operator::Divide
        )
    }
}

impl Expression {
    fn is_primary(&self) -> bool {
        matches!(
            self,
            Expression::Literal(_)
                | Expression::Identifier(_)
                | Expression::Println(_)
                | Expression::FunctionCall { .. }
        )
    }
}

// Builders, mostly for tests and hosts that construct trees by hand.

pub fn integer(value: i64) -> Expression {
    Expression::Literal(value)
}

pub fn identifier(name: &str) -> Expression {
    Expression::Identifier(name.to_string())
}

pub fn assign(name: &str, expression: Expression) -> Expression {
    Expression::Assignment {
        name: name.to_string(),
        expression: Box::new(expression),
    }
}

pub fn block(expressions: Vec<Expression>) -> Block {
    Block { expressions }
}

pub fn binary(operator: Operator, lhs: Expression, rhs: Expression) -> Expression {
    Expression::BinaryExpression {
        operator,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

pub fn add(lhs: Expression, rhs: Expression) -> Expression {
    binary(Operator::Add, lhs, rhs)
}

pub fn subtract(lhs: Expression, rhs: Expression) -> Expression {
    binary(Operator::Subtract, lhs, rhs)
}

pub fn multiply(lhs: Expression, rhs: Expression) -> Expression {
    binary(Operator::Multiply, lhs, rhs)
}

pub fn divide(lhs: Expression, rhs: Expression) -> Expression {
    binary(Operator::Divide, lhs, rhs)
}

pub fn less_than(lhs: Expression, rhs: Expression) -> Expression {
    binary(Operator::LessThan, lhs, rhs)
}

pub fn less_or_equal(lhs: Expression, rhs: Expression) -> Expression {
    binary(Operator::LessOrEqual, lhs, rhs)
}

pub fn greater_than(lhs: Expression, rhs: Expression) -> Expression {
    binary(Operator::GreaterThan, lhs, rhs)
}

pub fn greater_or_equal(lhs: Expression, rhs: Expression) -> Expression {
    binary(Operator::GreaterOrEqual, lhs, rhs)
}

pub fn equal(lhs: Expression, rhs: Expression) -> Expression {
    binary(Operator::Equal, lhs, rhs)
}

pub fn not_equal(lhs: Expression, rhs: Expression) -> Expression {
    binary(Operator::NotEqual, lhs, rhs)
}

pub fn if_then(condition: Expression, then_clause: Block) -> Expression {
    Expression::If {
        condition: Box::new(condition),
        then_clause,
        else_clause: None,
    }
}

pub fn if_else(condition: Expression, then_clause: Block, else_clause: Block) -> Expression {
    Expression::If {
        condition: Box::new(condition),
        then_clause,
        else_clause: Some(else_clause),
    }
}

pub fn while_loop(condition: Expression, body: Block) -> Expression {
    Expression::While {
        condition: Box::new(condition),
        body,
    }
}

pub fn println(argument: Expression) -> Expression {
    Expression::Println(Box::new(argument))
}

pub fn call(name: &str, args: Vec<Expression>) -> Expression {
    Expression::FunctionCall {
        name: name.to_string(),
        args,
    }
}

pub fn define_function(name: &str, args: &[&str], body: Block) -> TopLevel {
    TopLevel::FunctionDefinition(FunctionDefinition {
        name: name.to_string(),
        args: args.iter().map(|arg| arg.to_string()).collect(),
        body,
    })
}

pub fn define_global(name: &str, expression: Expression) -> TopLevel {
    TopLevel::GlobalVariableDefinition {
        name: name.to_string(),
        expression: Box::new(expression),
    }
}

// Display renders trees back into surface syntax that the parser accepts.

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

struct Operand<'a>(&'a Expression);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_primary() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "({})", self.0)
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.expressions.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{ ")?;
        for (i, expression) in self.expressions.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", expression)?;
        }
        f.write_str(" }")
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::BinaryExpression { operator, lhs, rhs } => {
                write!(f, "{} {} {}", Operand(lhs), operator, Operand(rhs))
            }
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::Identifier(name) => f.write_str(name),
            Expression::Assignment { name, expression } => write!(f, "{} = {}", name, expression),
            Expression::Block(block) => write!(f, "{}", block),
            Expression::While { condition, body } => {
                write!(f, "while {} {}", Operand(condition), body)
            }
            Expression::If {
                condition,
                then_clause,
                else_clause,
            } => {
                write!(f, "if {} {}", Operand(condition), then_clause)?;
                match else_clause {
                    Some(else_clause) => write!(f, " else {}", else_clause),
                    None => Ok(()),
                }
            }
            Expression::Println(argument) => write!(f, "println({})", argument),
            Expression::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for TopLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopLevel::FunctionDefinition(definition) => write!(
                f,
                "define {}({}) {}",
                definition.name,
                definition.args.join(", "),
                definition.body
            ),
            TopLevel::GlobalVariableDefinition { name, expression } => {
                write!(f, "global {} = {}", name, expression)
            }
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for top_level in &self.definitions {
            writeln!(f, "{}", top_level)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_nested_binary_expression() {
        let expression = add(
            subtract(integer(1), multiply(integer(2), integer(3))),
            integer(4),
        );

        assert_eq!("(1 - (2 * 3)) + 4", expression.to_string());
    }

    #[test]
    fn display_control_flow() {
        let expression = while_loop(
            greater_than(identifier("n"), integer(0)),
            block(vec![
                assign("n", subtract(identifier("n"), integer(1))),
                println(identifier("n")),
            ]),
        );

        assert_eq!(
            "while (n > 0) { n = n - 1; println(n) }",
            expression.to_string()
        );

        let expression = if_else(
            less_than(identifier("n"), integer(2)),
            block(vec![integer(1)]),
            block(vec![]),
        );
        assert_eq!("if (n < 2) { 1 } else {}", expression.to_string());
    }

    #[test]
    fn display_program() {
        let program = Program::new(vec![
            define_global("n", integer(1)),
            define_function(
                "twice",
                &["a", "b"],
                block(vec![call("add", vec![identifier("a"), integer(-2)])]),
            ),
        ]);

        assert_eq!(
            "global n = 1\ndefine twice(a, b) { add(a, -2) }\n",
            program.to_string()
        );
    }

    #[test]
    fn comparison_operators() {
        assert!(Operator::LessOrEqual.is_comparison());
        assert!(Operator::NotEqual.is_comparison());
        assert!(!Operator::Divide.is_comparison());
    }
}
