use nom::branch::alt;
use nom::bytes::complete::{tag, take_while};
use nom::character::complete::{char, digit1, multispace1, not_line_ending, satisfy};
use nom::combinator::{cut, map, not, opt, recognize, value, verify};
use nom::error::{Error, ErrorKind};
use nom::multi::{many0, separated_list0};
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::IResult;

use crate::ast::*;
use crate::error::ParseError;

type ParseResult<'a, T> = IResult<&'a str, T>;

const KEYWORDS: &[&str] = &["define", "global", "if", "else", "while", "println"];

/// Parses a whole source file into a [`Program`].
pub fn parse(source: &str) -> Result<Program, ParseError> {
    match terminated(many0(top_level), skip)(source) {
        Ok(("", definitions)) => Ok(Program::new(definitions)),
        Ok((rest, _)) => {
            let (line, column) = position(source, rest);
            Err(ParseError::ExpectedTopLevel { line, column })
        }
        Err(e) => Err(convert_error(source, e)),
    }
}

/// Parses a single expression, e.g. `1 + f(2)`.
pub fn parse_expression(source: &str) -> Result<Expression, ParseError> {
    match terminated(expression, skip)(source) {
        Ok(("", exp)) => Ok(exp),
        Ok((rest, _)) => Err(syntax_error(source, rest)),
        Err(e) => Err(convert_error(source, e)),
    }
}

fn convert_error(source: &str, e: nom::Err<Error<&str>>) -> ParseError {
    match e {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            if e.code == ErrorKind::MapRes {
                let (line, column) = position(source, e.input);
                let literal = e
                    .input
                    .char_indices()
                    .take_while(|&(i, c)| c.is_ascii_digit() || (i == 0 && c == '-'))
                    .map(|(_, c)| c)
                    .collect();
                ParseError::IntegerOutOfRange {
                    line,
                    column,
                    literal,
                }
            } else {
                syntax_error(source, e.input)
            }
        }
        nom::Err::Incomplete(_) => syntax_error(source, ""),
    }
}

fn syntax_error(source: &str, rest: &str) -> ParseError {
    let rest = rest.trim_start();
    let (line, column) = position(source, rest);
    let found = match rest.split_whitespace().next() {
        Some(word) => format!("`{}`", word.chars().take(16).collect::<String>()),
        None => "end of input".to_string(),
    };
    ParseError::Syntax {
        line,
        column,
        found,
    }
}

fn position(source: &str, rest: &str) -> (usize, usize) {
    let consumed = &source[..source.len() - rest.len()];
    let line = consumed.matches('\n').count() + 1;
    let column = consumed
        .rsplit('\n')
        .next()
        .map_or(0, |last| last.chars().count())
        + 1;
    (line, column)
}

// Whitespace and `//` comments.
fn skip(input: &str) -> ParseResult<()> {
    value(
        (),
        many0(alt((multispace1, preceded(tag("//"), not_line_ending)))),
    )(input)
}

fn token<'a>(t: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
    preceded(skip, tag(t))
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
    preceded(skip, terminated(tag(word), not(satisfy(is_identifier_char))))
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn assign_token(input: &str) -> ParseResult<&str> {
    terminated(token("="), not(char('=')))(input)
}

fn parse_identifier(input: &str) -> ParseResult<String> {
    let name = recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_identifier_char),
    ));
    map(
        preceded(skip, verify(name, |s: &str| !KEYWORDS.contains(&s))),
        str::to_string,
    )(input)
}

fn parse_integer(input: &str) -> ParseResult<Expression> {
    let (input, _) = skip(input)?;
    let (rest, digits) = recognize(pair(opt(char('-')), digit1))(input)?;
    match digits.parse::<i64>() {
        Ok(value) => Ok((rest, Expression::Literal(value))),
        Err(_) => Err(nom::Err::Failure(Error::new(input, ErrorKind::MapRes))),
    }
}

fn top_level(input: &str) -> ParseResult<TopLevel> {
    alt((function_definition, global_variable_definition))(input)
}

fn function_definition(input: &str) -> ParseResult<TopLevel> {
    let params = delimited(
        token("("),
        separated_list0(token(","), parse_identifier),
        token(")"),
    );
    map(
        preceded(
            keyword("define"),
            cut(tuple((parse_identifier, params, parse_block))),
        ),
        |(name, args, body)| TopLevel::FunctionDefinition(FunctionDefinition { name, args, body }),
    )(input)
}

fn global_variable_definition(input: &str) -> ParseResult<TopLevel> {
    map(
        preceded(
            keyword("global"),
            cut(tuple((parse_identifier, assign_token, expression))),
        ),
        |(name, _, expression)| TopLevel::GlobalVariableDefinition {
            name,
            expression: Box::new(expression),
        },
    )(input)
}

fn parse_block(input: &str) -> ParseResult<Block> {
    map(
        preceded(
            token("{"),
            cut(terminated(
                many0(terminated(expression, opt(token(";")))),
                token("}"),
            )),
        ),
        |expressions| Block { expressions },
    )(input)
}

fn expression(input: &str) -> ParseResult<Expression> {
    alt((
        parse_if,
        parse_while,
        map(parse_block, Expression::Block),
        parse_assignment,
        parse_comparative,
    ))(input)
}

fn parse_if(input: &str) -> ParseResult<Expression> {
    // `else if` nests the inner `if` as the only expression of the else block
    let else_clause = preceded(
        keyword("else"),
        cut(alt((
            parse_block,
            map(parse_if, |exp| Block {
                expressions: vec![exp],
            }),
        ))),
    );
    map(
        preceded(
            keyword("if"),
            cut(tuple((parse_comparative, parse_block, opt(else_clause)))),
        ),
        |(condition, then_clause, else_clause)| Expression::If {
            condition: Box::new(condition),
            then_clause,
            else_clause,
        },
    )(input)
}

fn parse_while(input: &str) -> ParseResult<Expression> {
    map(
        preceded(keyword("while"), cut(pair(parse_comparative, parse_block))),
        |(condition, body)| Expression::While {
            condition: Box::new(condition),
            body,
        },
    )(input)
}

fn parse_assignment(input: &str) -> ParseResult<Expression> {
    map(
        tuple((parse_identifier, assign_token, expression)),
        |(name, _, exp)| Expression::Assignment {
            name,
            expression: Box::new(exp),
        },
    )(input)
}

fn fold_binary(first: Expression, rest: Vec<(Operator, Expression)>) -> Expression {
    rest.into_iter()
        .fold(first, |cur, (operator, ex)| Expression::BinaryExpression {
            operator,
            lhs: Box::new(cur),
            rhs: Box::new(ex),
        })
}

fn parse_comparative(input: &str) -> ParseResult<Expression> {
    let operator = alt((
        value(Operator::LessOrEqual, token("<=")),
        value(Operator::GreaterOrEqual, token(">=")),
        value(Operator::Equal, token("==")),
        value(Operator::NotEqual, token("!=")),
        value(Operator::LessThan, token("<")),
        value(Operator::GreaterThan, token(">")),
    ));
    let (input, exp) = parse_additive(input)?;
    let (input, rest) = many0(pair(operator, parse_additive))(input)?;
    Ok((input, fold_binary(exp, rest)))
}

fn parse_additive(input: &str) -> ParseResult<Expression> {
    let operator = alt((
        value(Operator::Add, token("+")),
        value(Operator::Subtract, token("-")),
    ));
    let (input, exp) = parse_multitive(input)?;
    let (input, rest) = many0(pair(operator, parse_multitive))(input)?;
    Ok((input, fold_binary(exp, rest)))
}

fn parse_multitive(input: &str) -> ParseResult<Expression> {
    let operator = alt((
        value(Operator::Multiply, token("*")),
        value(Operator::Divide, token("/")),
    ));
    let (input, exp) = parse_primary(input)?;
    let (input, rest) = many0(pair(operator, parse_primary))(input)?;
    Ok((input, fold_binary(exp, rest)))
}

fn parse_primary(input: &str) -> ParseResult<Expression> {
    alt((
        preceded(token("("), cut(terminated(expression, token(")")))),
        parse_println,
        parse_function_call,
        parse_integer,
        map(parse_identifier, Expression::Identifier),
    ))(input)
}

fn parse_println(input: &str) -> ParseResult<Expression> {
    map(
        preceded(
            keyword("println"),
            cut(delimited(token("("), expression, token(")"))),
        ),
        |exp| Expression::Println(Box::new(exp)),
    )(input)
}

fn parse_function_call(input: &str) -> ParseResult<Expression> {
    // the opening parenthesis must follow the name directly
    let args = terminated(separated_list0(token(","), expression), token(")"));
    map(
        pair(terminated(parse_identifier, tag("(")), cut(args)),
        |(name, args)| Expression::FunctionCall { name, args },
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn expr(source: &str) -> Expression {
        parse_expression(source).unwrap()
    }

    #[test]
    fn parse_integer_literals() {
        assert_eq!(integer(42), expr("42"));
        assert_eq!(integer(-7), expr("-7"));
        assert_eq!(integer(i64::MAX), expr("9223372036854775807"));
    }

    #[test]
    fn parse_operator_precedence() {
        assert_eq!(
            add(integer(1), multiply(integer(2), integer(3))),
            expr("1 + 2 * 3")
        );
        assert_eq!(
            multiply(add(integer(1), integer(2)), integer(3)),
            expr("(1 + 2) * 3")
        );
        assert_eq!(
            less_than(subtract(identifier("n"), integer(1)), integer(2)),
            expr("n-1<2")
        );
    }

    #[test]
    fn parse_left_associative() {
        assert_eq!(
            subtract(subtract(integer(10), integer(3)), integer(2)),
            expr("10 - 3 - 2")
        );
        assert_eq!(
            divide(divide(integer(100), integer(10)), integer(5)),
            expr("100/10/5")
        );
    }

    #[test]
    fn parse_comparison_operators() {
        assert_eq!(less_or_equal(integer(1), integer(2)), expr("1<=2"));
        assert_eq!(greater_or_equal(integer(1), integer(2)), expr("1>=2"));
        assert_eq!(less_than(integer(1), integer(2)), expr("1<2"));
        assert_eq!(greater_than(integer(1), integer(2)), expr("1>2"));
        assert_eq!(equal(integer(1), integer(2)), expr("1==2"));
        assert_eq!(not_equal(integer(1), integer(2)), expr("1!=2"));
    }

    #[test]
    fn parse_assignment_and_calls() {
        assert_eq!(
            assign("n", multiply(identifier("n"), integer(2))),
            expr("n = n * 2")
        );
        assert_eq!(
            call("twoArgs", vec![integer(2), add(identifier("x"), integer(1))]),
            expr("twoArgs(2, x + 1)")
        );
        assert_eq!(call("two", vec![]), expr("two()"));
        assert_eq!(println(integer(2)), expr("println(2)"));
    }

    #[test]
    fn parse_control_flow() {
        assert_eq!(
            while_loop(
                greater_than(identifier("n"), integer(0)),
                block(vec![assign("n", subtract(identifier("n"), integer(1)))]),
            ),
            expr("while n>0 {\n  n=n-1\n}")
        );
        assert_eq!(
            if_then(integer(1), block(vec![integer(2)])),
            expr("if 1 { 2 }")
        );
        assert_eq!(
            if_else(
                identifier("a"),
                block(vec![integer(1)]),
                block(vec![if_else(
                    identifier("b"),
                    block(vec![integer(2)]),
                    block(vec![integer(3)]),
                )]),
            ),
            expr("if a { 1 } else if b { 2 } else { 3 }")
        );
    }

    #[test]
    fn parse_program() {
        let source = "
            // factorial
            global start = 5
            define factorial(n) {
                if n<2 {
                    1
                } else {
                    n*factorial(n-1)
                }
            }
            define main() {
                result=factorial(start); println(result)
            }
        ";

        let n = || identifier("n");
        let expected = Program::new(vec![
            define_global("start", integer(5)),
            define_function(
                "factorial",
                &["n"],
                block(vec![if_else(
                    less_than(n(), integer(2)),
                    block(vec![integer(1)]),
                    block(vec![multiply(
                        n(),
                        call("factorial", vec![subtract(n(), integer(1))]),
                    )]),
                )]),
            ),
            define_function(
                "main",
                &[],
                block(vec![
                    assign("result", call("factorial", vec![identifier("start")])),
                    println(identifier("result")),
                ]),
            ),
        ]);

        assert_eq!(expected, parse(source).unwrap());
    }

    #[test]
    fn display_output_parses_back() {
        let program = parse(
            "define f(a, b) { c = a - -1; while (c > b) { c = c / 2 } if c == 0 { println(c) } }",
        )
        .unwrap();

        assert_eq!(program, parse(&program.to_string()).unwrap());
    }

    #[test]
    fn keywords_are_not_identifiers() {
        assert!(parse_expression("while = 3").is_err());
        assert_eq!(identifier("iffy"), expr("iffy"));
    }

    #[test]
    fn reports_syntax_error_position() {
        let err = parse("define main() {\n  1 +\n}").unwrap_err();
        assert_eq!((2, 5), err.position());
    }

    #[test]
    fn reports_stray_top_level() {
        let err = parse("define main() { 1 }\nmain()").unwrap_err();
        assert_eq!(ParseError::ExpectedTopLevel { line: 2, column: 1 }, err);
    }

    #[test]
    fn reports_integer_out_of_range() {
        let err = parse("define main() { 99999999999999999999 }").unwrap_err();
        assert_eq!(
            ParseError::IntegerOutOfRange {
                line: 1,
                column: 17,
                literal: "99999999999999999999".to_string(),
            },
            err
        );
    }
}
