use std::collections::{HashMap, HashSet};
use std::io::{self, Stdout, Write};
use std::ops::{Deref, DerefMut};

use crate::ast::*;
use crate::environment::Environment;
use crate::error::{EvalError, EvalResult};

pub const MAIN_FUNCTION: &str = "main";

/// Evaluates programs by walking their syntax tree.
///
/// Function definitions are borrowed from the program passed to
/// [`Interpreter::call_main`]; variables live in the [`Environment`].
/// `println` writes to `W`, standard output by default.
pub struct Interpreter<'a, W: Write = Stdout> {
    environment: Environment,
    function_environment: HashMap<&'a str, &'a FunctionDefinition>,
    writer: W,
}

impl<'a> Interpreter<'a, Stdout> {
    pub fn new() -> Interpreter<'a, Stdout> {
        Interpreter::with_writer(io::stdout())
    }
}

impl Default for Interpreter<'_, Stdout> {
    fn default() -> Self {
        Interpreter::new()
    }
}

/// Runs `program` with `println` output going to standard output.
pub fn run_program(program: &Program) -> EvalResult {
    Interpreter::new().call_main(program)
}

/// Runs `program` with `println` output going to `writer`.
pub fn run_program_with_writer<W: Write>(program: &Program, writer: W) -> EvalResult {
    Interpreter::with_writer(writer).call_main(program)
}

impl<'a, W: Write> Interpreter<'a, W> {
    pub fn with_writer(writer: W) -> Interpreter<'a, W> {
        Interpreter {
            environment: Environment::new(),
            function_environment: HashMap::new(),
            writer,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Walks the top levels in declaration order, registering functions and
    /// evaluating globals as they appear, then returns the value of `main`'s body.
    #[tracing::instrument(level = "debug", skip_all, fields(definitions = program.definitions.len()))]
    pub fn call_main(&mut self, program: &'a Program) -> EvalResult {
        // checked before any global runs so a program without an entry
        // point produces no output
        if !has_entry_point(program) {
            return Err(EvalError::MissingEntryPoint);
        }

        for top in &program.definitions {
            match top {
                TopLevel::FunctionDefinition(definition) => {
                    validate_definition(definition)?;
                    self.function_environment
                        .insert(definition.name.as_str(), definition);
                }
                TopLevel::GlobalVariableDefinition { name, expression } => {
                    let value = self.interpret(expression)?;
                    let global = self.environment.global();
                    self.environment.define(global, name, value);
                    tracing::debug!(name = name.as_str(), value, "defined global");
                }
            }
        }

        let main = self
            .function_environment
            .get(MAIN_FUNCTION)
            .copied()
            .ok_or(EvalError::MissingEntryPoint)?;
        let result = self.interpret_block(&main.body)?;
        tracing::debug!(result, "main returned");
        Ok(result)
    }

    pub fn get_variable(&self, name: &str) -> Option<i64> {
        self.environment.get(self.environment.current(), name)
    }

    pub fn set_variable(&mut self, name: &str, value: i64) -> Option<i64> {
        let current = self.environment.current();
        self.environment.bind_or_assign(current, name, value)
    }

    pub fn interpret(&mut self, expression: &Expression) -> EvalResult {
        tracing::trace!(%expression, "interpret");
        match expression {
            Expression::BinaryExpression { operator, lhs, rhs } => {
                let l = self.interpret(lhs)?;
                let r = self.interpret(rhs)?;
                binary_operation(*operator, l, r)
            }
            Expression::Literal(value) => Ok(*value),
            Expression::Identifier(name) => self
                .get_variable(name)
                .ok_or_else(|| EvalError::UnboundIdentifier(name.to_string())),
            Expression::Assignment { name, expression } => {
                if name.is_empty() {
                    return Err(EvalError::MalformedExpression(
                        "assignment to an empty name".to_string(),
                    ));
                }
                let value = self.interpret(expression)?;
                self.set_variable(name, value);
                Ok(value)
            }
            Expression::Block(block) => self.interpret_block(block),
            Expression::While { condition, body } => {
                while self.condition(condition)? {
                    self.interpret_block(body)?;
                }
                Ok(1)
            }
            Expression::If {
                condition,
                then_clause,
                else_clause,
            } => {
                if self.condition(condition)? {
                    self.interpret_block(then_clause)
                } else {
                    match else_clause {
                        Some(else_clause) => self.interpret_block(else_clause),
                        None => Ok(1),
                    }
                }
            }
            Expression::Println(argument) => {
                let value = self.interpret(argument)?;
                write!(self.writer, "{}", value)?;
                self.writer.flush()?;
                Ok(value)
            }
            Expression::FunctionCall { name, args } => self.call_function(name, args),
        }
    }

    /// Evaluates a block in the current frame. An empty block yields 0.
    pub fn interpret_block(&mut self, block: &Block) -> EvalResult {
        let mut ret = 0;
        for expression in &block.expressions {
            ret = self.interpret(expression)?;
        }
        Ok(ret)
    }

    fn condition(&mut self, condition: &Expression) -> EvalResult<bool> {
        Ok(self.interpret(condition)? != 0)
    }

    #[tracing::instrument(level = "debug", skip(self, args), fields(arity = args.len()))]
    fn call_function(&mut self, name: &str, args: &[Expression]) -> EvalResult {
        let definition = self
            .function_environment
            .get(name)
            .copied()
            .ok_or_else(|| EvalError::UndefinedFunction(name.to_string()))?;

        if args.len() != definition.args.len() {
            return Err(EvalError::ArityMismatch {
                name: name.to_string(),
                expected: definition.args.len(),
                found: args.len(),
            });
        }

        // arguments see the caller's frame, left to right
        let values = args
            .iter()
            .map(|arg| self.interpret(arg))
            .collect::<EvalResult<Vec<_>>>()?;

        let mut frame = CallFrame::enter(self);
        for (param, value) in definition.args.iter().zip(values) {
            frame.bind_argument(param, value);
        }
        frame.interpret_block(&definition.body)
    }
}

/// Frame of one function call. The frame is popped when the guard drops, so
/// the caller's frame is back in place on every exit path.
struct CallFrame<'i, 'a, W: Write> {
    interpreter: &'i mut Interpreter<'a, W>,
}

impl<'i, 'a, W: Write> CallFrame<'i, 'a, W> {
    fn enter(interpreter: &'i mut Interpreter<'a, W>) -> Self {
        // function bodies only see their own frame and the globals
        let global = interpreter.environment.global();
        interpreter.environment.push(global);
        CallFrame { interpreter }
    }

    fn bind_argument(&mut self, param: &str, value: i64) {
        let frame = self.interpreter.environment.current();
        self.interpreter.environment.define(frame, param, value);
    }
}

impl<W: Write> Drop for CallFrame<'_, '_, W> {
    fn drop(&mut self) {
        self.interpreter.environment.pop();
    }
}

impl<'a, W: Write> Deref for CallFrame<'_, 'a, W> {
    type Target = Interpreter<'a, W>;

    fn deref(&self) -> &Self::Target {
        self.interpreter
    }
}

impl<W: Write> DerefMut for CallFrame<'_, '_, W> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.interpreter
    }
}

/// The last `main` definition wins, and it must take no parameters.
fn has_entry_point(program: &Program) -> bool {
    program
        .definitions
        .iter()
        .rev()
        .find_map(|top| match top {
            TopLevel::FunctionDefinition(definition) if definition.name == MAIN_FUNCTION => {
                Some(definition.args.is_empty())
            }
            _ => None,
        })
        .unwrap_or(false)
}

fn validate_definition(definition: &FunctionDefinition) -> EvalResult<()> {
    if definition.name.is_empty() {
        return Err(EvalError::MalformedExpression(
            "function definition without a name".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for arg in &definition.args {
        if !seen.insert(arg.as_str()) {
            return Err(EvalError::MalformedExpression(format!(
                "parameter `{}` repeated in `{}`",
                arg, definition.name
            )));
        }
    }
    Ok(())
}

fn binary_operation(operator: Operator, l: i64, r: i64) -> EvalResult {
    let overflow = || EvalError::IntegerOverflow(operator);
    match operator {
        Operator::Add => l.checked_add(r).ok_or_else(overflow),
        Operator::Subtract => l.checked_sub(r).ok_or_else(overflow),
        Operator::Multiply => l.checked_mul(r).ok_or_else(overflow),
        Operator::Divide => {
            if r == 0 {
                return Err(EvalError::DivisionByZero);
            }
            // truncates toward zero; only i64::MIN / -1 overflows
            l.checked_div(r).ok_or_else(overflow)
        }
        Operator::LessThan => Ok(i64::from(l < r)),
        Operator::LessOrEqual => Ok(i64::from(l <= r)),
        Operator::GreaterThan => Ok(i64::from(l > r)),
        Operator::GreaterOrEqual => Ok(i64::from(l >= r)),
        Operator::Equal => Ok(i64::from(l == r)),
        Operator::NotEqual => Ok(i64::from(l != r)),
    }
}
