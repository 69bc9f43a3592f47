//! Syntax: pest grammar driver and AST construction.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::ast::*;
use crate::error::{CompileError, CompileResult};
use crate::fold::{BinOp, UnOp};

#[derive(Parser)]
#[grammar = "minipascal.pest"]
struct MiniPascalParser;

/// Parse a source string into a [`Program`].
pub fn parse(source: &str) -> CompileResult<Program> {
    let mut pairs = MiniPascalParser::parse(Rule::program, source).map_err(|e| {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos((l, c)) => (l, c),
            pest::error::LineColLocation::Span((l, c), _) => (l, c),
        };
        parse_fail(format!("at line {line}, column {col}: {e}"))
    })?;
    let program = pairs
        .next()
        .ok_or_else(|| parse_fail("no program".to_string()))?;
    build_program(program)
}

fn parse_fail(message: String) -> CompileError {
    CompileError::Parse { message }
}

fn build_program(pair: Pair<Rule>) -> CompileResult<Program> {
    let mut it = pair.into_inner();
    let name = it.next().unwrap().as_str().to_string();
    let block = build_block(it.next().unwrap())?;
    Ok(Program { name, block })
}

fn build_block(pair: Pair<Rule>) -> CompileResult<Block> {
    let mut block = Block::default();
    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::const_section => {
                for decl in item.into_inner() {
                    let mut it = decl.into_inner();
                    let name = it.next().unwrap().as_str().to_string();
                    let expr = build_const_expr(it.next().unwrap())?;
                    block.consts.push(ConstDecl { name, expr });
                }
            }
            Rule::type_section => {
                for decl in item.into_inner() {
                    let mut it = decl.into_inner();
                    let name = it.next().unwrap().as_str().to_string();
                    let spec = build_type_spec(it.next().unwrap())?;
                    block.types.push(TypeDecl { name, spec });
                }
            }
            Rule::var_section => {
                for decl in item.into_inner() {
                    let mut it = decl.into_inner();
                    let names = build_ident_list(it.next().unwrap());
                    let spec = build_type_spec(it.next().unwrap())?;
                    block.vars.push(VarDecl { names, spec });
                }
            }
            Rule::routine_decl => block.routines.push(build_routine(item)?),
            Rule::compound_stmt => block.body = build_compound(item)?,
            _ => {}
        }
    }
    Ok(block)
}

fn build_ident_list(pair: Pair<Rule>) -> Vec<String> {
    pair.into_inner().map(|p| p.as_str().to_string()).collect()
}

fn build_type_spec(pair: Pair<Rule>) -> CompileResult<TypeSpec> {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::ident => Ok(TypeSpec::Named(inner.as_str().to_string())),
        Rule::array_type => {
            let mut it = inner.into_inner();
            let lower = build_const_expr(it.next().unwrap())?;
            let upper = build_const_expr(it.next().unwrap())?;
            let elem = build_type_spec(it.next().unwrap())?;
            Ok(TypeSpec::Array {
                lower,
                upper,
                elem: Box::new(elem),
            })
        }
        Rule::record_type => {
            let mut groups = Vec::new();
            for group in inner.into_inner() {
                let mut it = group.into_inner();
                let names = build_ident_list(it.next().unwrap());
                let spec = build_type_spec(it.next().unwrap())?;
                groups.push(FieldGroup { names, spec });
            }
            Ok(TypeSpec::Record(groups))
        }
        other => Err(parse_fail(format!("unexpected type spec: {other:?}"))),
    }
}

fn build_routine(pair: Pair<Rule>) -> CompileResult<RoutineDecl> {
    let mut it = pair.into_inner();
    let head = it.next().unwrap();
    let is_function = head.as_rule() == Rule::function_head;
    let mut head_it = head.into_inner();
    let name = head_it.next().unwrap().as_str().to_string();
    let mut params = Vec::new();
    let mut ret = None;
    for item in head_it {
        match item.as_rule() {
            Rule::formal_params => params = build_formal_params(item),
            Rule::ident => ret = Some(item.as_str().to_string()),
            _ => {}
        }
    }
    if is_function && ret.is_none() {
        return Err(parse_fail(format!("missing return type for function {name}")));
    }
    let tail = it.next().unwrap().into_inner().next().unwrap();
    let body = match tail.as_rule() {
        Rule::forward_decl => RoutineBody::Forward,
        Rule::block => RoutineBody::Body(Box::new(build_block(tail)?)),
        other => return Err(parse_fail(format!("unexpected routine body: {other:?}"))),
    };
    Ok(RoutineDecl {
        name,
        params,
        ret,
        body,
    })
}

fn build_formal_params(pair: Pair<Rule>) -> Vec<ParamDecl> {
    let mut params = Vec::new();
    for group in pair.into_inner() {
        let mut it = group.into_inner();
        let names = build_ident_list(it.next().unwrap());
        let ty = it.next().unwrap().as_str().to_string();
        params.push(ParamDecl { names, ty });
    }
    params
}

fn build_compound(pair: Pair<Rule>) -> CompileResult<Stmt> {
    let mut stmts = Vec::new();
    for item in pair.into_inner() {
        if item.as_rule() == Rule::stmt_list {
            for s in item.into_inner() {
                stmts.push(build_stmt(s)?);
            }
        }
    }
    Ok(Stmt::Compound(stmts))
}

fn build_stmt(pair: Pair<Rule>) -> CompileResult<Stmt> {
    let inner = match pair.into_inner().next() {
        Some(inner) => inner,
        None => return Ok(Stmt::Empty),
    };
    match inner.as_rule() {
        Rule::compound_stmt => build_compound(inner),
        Rule::assign_stmt => {
            let mut it = inner.into_inner();
            let target = build_lvalue(it.next().unwrap())?;
            let value = build_expr(it.next().unwrap())?;
            Ok(Stmt::Assign(target, value))
        }
        Rule::write_stmt => {
            let args = inner
                .into_inner()
                .next()
                .unwrap()
                .into_inner()
                .map(build_expr)
                .collect::<CompileResult<Vec<_>>>()?;
            Ok(Stmt::Write(args))
        }
        Rule::read_stmt => {
            let targets = inner
                .into_inner()
                .next()
                .unwrap()
                .into_inner()
                .map(build_lvalue)
                .collect::<CompileResult<Vec<_>>>()?;
            Ok(Stmt::Read(targets))
        }
        other => Err(parse_fail(format!("unexpected statement: {other:?}"))),
    }
}

fn build_lvalue(pair: Pair<Rule>) -> CompileResult<LValue> {
    let mut it = pair.into_inner();
    let base = it.next().unwrap().as_str().to_string();
    let mut sels = Vec::new();
    for sel in it {
        let inner = sel.into_inner().next().unwrap();
        match inner.as_rule() {
            Rule::field_sel => {
                let name = inner.into_inner().next().unwrap().as_str().to_string();
                sels.push(Selector::Field(name));
            }
            Rule::index_sel => {
                let index = build_expr(inner.into_inner().next().unwrap())?;
                sels.push(Selector::Index(index));
            }
            other => return Err(parse_fail(format!("unexpected selector: {other:?}"))),
        }
    }
    Ok(LValue { base, sels })
}

fn build_expr(pair: Pair<Rule>) -> CompileResult<Expr> {
    match pair.as_rule() {
        Rule::expr | Rule::and_expr | Rule::add_expr | Rule::mul_expr => {
            let mut it = pair.into_inner();
            let mut expr = build_expr(it.next().unwrap())?;
            while let Some(op) = it.next() {
                let rhs = build_expr(it.next().unwrap())?;
                expr = Expr::Binary(Box::new(expr), binop(op.as_str())?, Box::new(rhs));
            }
            Ok(expr)
        }
        Rule::rel_expr => {
            let mut it = pair.into_inner();
            let left = build_expr(it.next().unwrap())?;
            if let Some(op) = it.next() {
                let right = build_expr(it.next().unwrap())?;
                Ok(Expr::Binary(
                    Box::new(left),
                    binop(op.as_str())?,
                    Box::new(right),
                ))
            } else {
                Ok(left)
            }
        }
        Rule::unary_expr => {
            let mut it = pair.into_inner();
            let first = it.next().unwrap();
            if first.as_rule() == Rule::unary_op {
                let inner = build_expr(it.next().unwrap())?;
                Ok(Expr::Unary(unop(first.as_str())?, Box::new(inner)))
            } else {
                build_expr(first)
            }
        }
        Rule::primary => {
            let inner = pair.into_inner().next().unwrap();
            match inner.as_rule() {
                Rule::expr => build_expr(inner),
                Rule::number => Ok(Expr::Int(parse_int(inner.as_str())?)),
                Rule::string_lit => {
                    let text = decode_string(inner.as_str())?;
                    if text.chars().count() == 1 {
                        Ok(Expr::Char(text.chars().next().unwrap()))
                    } else {
                        Ok(Expr::Str(text))
                    }
                }
                Rule::lvalue => Ok(Expr::Path(build_lvalue(inner)?)),
                other => Err(parse_fail(format!("unexpected expression node: {other:?}"))),
            }
        }
        other => Err(parse_fail(format!("unexpected expression node: {other:?}"))),
    }
}

fn build_const_expr(pair: Pair<Rule>) -> CompileResult<ConstExpr> {
    match pair.as_rule() {
        Rule::const_expr | Rule::const_and | Rule::const_add | Rule::const_mul => {
            let mut it = pair.into_inner();
            let mut expr = build_const_expr(it.next().unwrap())?;
            while let Some(op) = it.next() {
                let rhs = build_const_expr(it.next().unwrap())?;
                expr = ConstExpr::Binary(Box::new(expr), binop(op.as_str())?, Box::new(rhs));
            }
            Ok(expr)
        }
        Rule::const_rel => {
            let mut it = pair.into_inner();
            let left = build_const_expr(it.next().unwrap())?;
            if let Some(op) = it.next() {
                let right = build_const_expr(it.next().unwrap())?;
                Ok(ConstExpr::Binary(
                    Box::new(left),
                    binop(op.as_str())?,
                    Box::new(right),
                ))
            } else {
                Ok(left)
            }
        }
        Rule::const_unary => {
            let mut it = pair.into_inner();
            let first = it.next().unwrap();
            if first.as_rule() == Rule::unary_op {
                let inner = build_const_expr(it.next().unwrap())?;
                Ok(ConstExpr::Unary(unop(first.as_str())?, Box::new(inner)))
            } else {
                build_const_expr(first)
            }
        }
        Rule::const_primary => {
            let inner = pair.into_inner().next().unwrap();
            match inner.as_rule() {
                Rule::const_expr => build_const_expr(inner),
                Rule::number => Ok(ConstExpr::Int(parse_int(inner.as_str())?)),
                Rule::string_lit => {
                    let text = decode_string(inner.as_str())?;
                    if text.chars().count() == 1 {
                        Ok(ConstExpr::Char(text.chars().next().unwrap()))
                    } else {
                        Ok(ConstExpr::Str(text))
                    }
                }
                Rule::ident => Ok(ConstExpr::Ident(inner.as_str().to_string())),
                other => Err(parse_fail(format!("unexpected const expression: {other:?}"))),
            }
        }
        other => Err(parse_fail(format!("unexpected const expression: {other:?}"))),
    }
}

fn binop(text: &str) -> CompileResult<BinOp> {
    match text.to_ascii_lowercase().as_str() {
        "+" => Ok(BinOp::Add),
        "-" => Ok(BinOp::Sub),
        "*" => Ok(BinOp::Mult),
        "div" => Ok(BinOp::Div),
        "mod" => Ok(BinOp::Mod),
        ">" => Ok(BinOp::Gt),
        "<" => Ok(BinOp::Lt),
        ">=" => Ok(BinOp::Gte),
        "<=" => Ok(BinOp::Lte),
        "=" => Ok(BinOp::Eq),
        "<>" => Ok(BinOp::Neq),
        "and" => Ok(BinOp::And),
        "or" => Ok(BinOp::Or),
        other => Err(parse_fail(format!("unknown operator: {other}"))),
    }
}

fn unop(text: &str) -> CompileResult<UnOp> {
    match text.to_ascii_lowercase().as_str() {
        "-" => Ok(UnOp::Negate),
        "not" => Ok(UnOp::Not),
        other => Err(parse_fail(format!("unknown unary operator: {other}"))),
    }
}

fn parse_int(text: &str) -> CompileResult<i32> {
    text.parse::<i32>()
        .map_err(|e| parse_fail(format!("bad integer literal {text}: {e}")))
}

fn decode_string(source: &str) -> CompileResult<String> {
    if !source.starts_with('\'') || !source.ends_with('\'') || source.len() < 2 {
        return Err(parse_fail("invalid string literal".to_string()));
    }
    let inner = &source[1..source.len() - 1];
    let mut out = String::new();
    let mut it = inner.chars().peekable();
    while let Some(ch) = it.next() {
        if ch == '\'' {
            if it.peek() == Some(&'\'') {
                it.next();
                out.push('\'');
            } else {
                return Err(parse_fail("invalid quote in string literal".to_string()));
            }
        } else {
            out.push(ch);
        }
    }
    Ok(out)
}
