use crate::fold::{BinOp, UnOp};

#[derive(Debug, Clone)]
pub struct Program {
    pub name: String,
    pub block: Block,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub consts: Vec<ConstDecl>,
    pub types: Vec<TypeDecl>,
    pub vars: Vec<VarDecl>,
    pub routines: Vec<RoutineDecl>,
    pub body: Stmt,
}

#[derive(Debug, Clone)]
pub struct ConstDecl {
    pub name: String,
    pub expr: ConstExpr,
}

#[derive(Debug, Clone)]
pub enum ConstExpr {
    Int(i32),
    Char(char),
    Str(String),
    Ident(String),
    Binary(Box<ConstExpr>, BinOp, Box<ConstExpr>),
    Unary(UnOp, Box<ConstExpr>),
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub spec: TypeSpec,
}

#[derive(Debug, Clone)]
pub enum TypeSpec {
    Named(String),
    Array {
        lower: ConstExpr,
        upper: ConstExpr,
        elem: Box<TypeSpec>,
    },
    Record(Vec<FieldGroup>),
}

#[derive(Debug, Clone)]
pub struct FieldGroup {
    pub names: Vec<String>,
    pub spec: TypeSpec,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub names: Vec<String>,
    pub spec: TypeSpec,
}

#[derive(Debug, Clone)]
pub struct RoutineDecl {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub ret: Option<String>,
    pub body: RoutineBody,
}

/// One `a, b: integer` group from a formal parameter list. Parameter and
/// return types are type names; anonymous types are not allowed there.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub names: Vec<String>,
    pub ty: String,
}

#[derive(Debug, Clone)]
pub enum RoutineBody {
    Forward,
    Body(Box<Block>),
}

#[derive(Debug, Clone, Default)]
pub enum Stmt {
    #[default]
    Empty,
    Compound(Vec<Stmt>),
    Assign(LValue, Expr),
    Write(Vec<Expr>),
    Read(Vec<LValue>),
}

#[derive(Debug, Clone)]
pub struct LValue {
    pub base: String,
    pub sels: Vec<Selector>,
}

#[derive(Debug, Clone)]
pub enum Selector {
    Index(Expr),
    Field(String),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Int(i32),
    Char(char),
    Str(String),
    Path(LValue),
    Binary(Box<Expr>, BinOp, Box<Expr>),
    Unary(UnOp, Box<Expr>),
}
