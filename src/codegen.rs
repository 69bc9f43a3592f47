//! Expression evaluation and assembly emission.
//!
//! Every evaluation step produces an [`Operand`]: a compile-time literal, a
//! stack-resident word, or a register-resident temporary. Operators fold
//! when every input is a literal and emit instructions otherwise, drawing
//! temporaries from the statement-scoped register pool. [`Compiler`] walks
//! the AST once, declaring entities through the symbol table and lowering
//! statements as it goes, the way the original grammar actions did.

use std::collections::HashMap;

use crate::ast::{
    Block, ConstExpr, Expr, LValue, Program, RoutineBody, RoutineDecl, Selector, Stmt, TypeSpec,
};
use crate::error::{SemaError, SemaResult};
use crate::fold::{fold_binary, fold_unary, BinOp, UnOp};
use crate::symtab::{
    Const, Function, ParamGroup, SimpleKind, Symbol, SymbolTable, TypeId, TypeKind,
};

/// The transient result of one evaluation step.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Int(i32),
    Char(char),
    Bool(bool),
    /// Data-section label of a pooled string constant.
    Str(String),
    /// A word at `offset($sp)`. `char_like` reports that the word holds a
    /// char or string so I/O can pick the right load semantics.
    Stack { offset: i32, char_like: bool },
    /// A value currently held in a general-purpose register.
    Reg(u32),
}

impl Operand {
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Operand::Int(_) | Operand::Char(_) | Operand::Bool(_) | Operand::Str(_)
        )
    }
}

/// One step of an lvalue access path: an evaluated index expression or a
/// record field name.
#[derive(Debug, Clone, PartialEq)]
pub enum PathStep {
    Index(Operand),
    Field(String),
}

/// Ensure a value is in a register, loading literals and stack words as
/// needed. Register-resident operands are reused as-is.
fn materialize(tab: &mut SymbolTable, operand: &Operand) -> SemaResult<u32> {
    if let Operand::Reg(reg) = operand {
        return Ok(*reg);
    }
    let reg = tab.get_reg()?;
    match operand {
        Operand::Int(v) => tab.emit(&format!("li ${reg}, {v}")),
        Operand::Char(c) => tab.emit(&format!("li ${reg}, {}", *c as u32)),
        Operand::Bool(b) => tab.emit(&format!("li ${reg}, {}", *b as i32)),
        Operand::Str(label) => tab.emit(&format!("la ${reg}, {label}")),
        Operand::Stack { offset, .. } => tab.emit(&format!("lw ${reg}, {offset}($sp)")),
        Operand::Reg(_) => {}
    }
    Ok(reg)
}

fn literal_const(operand: &Operand) -> SemaResult<Const> {
    match operand {
        Operand::Int(v) => Ok(Const::Int(*v)),
        Operand::Char(c) => Ok(Const::Char(*c)),
        Operand::Bool(b) => Ok(Const::Bool(*b)),
        _ => Err(SemaError::Internal {
            detail: "operand is not a foldable literal".to_string(),
        }),
    }
}

/// Turn a concrete constant back into a literal operand.
pub fn const_operand(value: &Const) -> SemaResult<Operand> {
    match value {
        Const::Int(v) => Ok(Operand::Int(*v)),
        Const::Char(c) => Ok(Operand::Char(*c)),
        Const::Bool(b) => Ok(Operand::Bool(*b)),
        Const::Str { label, .. } => Ok(Operand::Str(label.clone())),
        Const::Ident(name) => Err(SemaError::NotAConstant { name: name.clone() }),
    }
}

fn fold_literals(
    tab: &mut SymbolTable,
    left: &Operand,
    right: &Operand,
    op: BinOp,
) -> SemaResult<Operand> {
    let folded = fold_binary(tab, op, &literal_const(left)?, &literal_const(right)?)?;
    const_operand(&folded)
}

/// Evaluate a binary operator. Two literals fold with no emission; anything
/// else materializes both sides and emits one instruction into a fresh
/// destination register. Multiply, divide, and modulo route through
/// [`eval_spec`].
pub fn eval(tab: &mut SymbolTable, left: &Operand, right: &Operand, op: BinOp) -> SemaResult<Operand> {
    if op.uses_product_registers() {
        return eval_spec(tab, left, right, op);
    }
    if left.is_literal() && right.is_literal() {
        return fold_literals(tab, left, right, op);
    }
    let dest = tab.get_reg()?;
    let lreg = materialize(tab, left)?;
    let rreg = materialize(tab, right)?;
    tab.emit(&format!("{} ${dest}, ${lreg}, ${rreg}", op.mnemonic()));
    Ok(Operand::Reg(dest))
}

/// Multiply/divide/modulo: the hardware issues into the product/quotient
/// register pair, so the result is pulled out with `mflo` (product or
/// quotient) or `mfhi` (remainder) into the left operand's register.
pub fn eval_spec(
    tab: &mut SymbolTable,
    left: &Operand,
    right: &Operand,
    op: BinOp,
) -> SemaResult<Operand> {
    if left.is_literal() && right.is_literal() {
        return fold_literals(tab, left, right, op);
    }
    let lreg = materialize(tab, left)?;
    let rreg = materialize(tab, right)?;
    let issue = if op == BinOp::Mult { "mult" } else { "div" };
    tab.emit(&format!("{issue} ${lreg}, ${rreg}"));
    let extract = if op == BinOp::Mod { "mfhi" } else { "mflo" };
    tab.emit(&format!("{extract} ${lreg}"));
    Ok(Operand::Reg(lreg))
}

/// Evaluate a unary operator: fold a literal, otherwise emit the unary
/// instruction into a fresh destination register.
pub fn eval_unary(tab: &mut SymbolTable, operand: &Operand, op: UnOp) -> SemaResult<Operand> {
    if operand.is_literal() {
        let folded = fold_unary(tab, op, &literal_const(operand)?)?;
        return const_operand(&folded);
    }
    let src = materialize(tab, operand)?;
    let dest = tab.get_reg()?;
    tab.emit(&format!("{} ${dest}, ${src}", op.mnemonic()));
    Ok(Operand::Reg(dest))
}

/// Resolve an access path rooted at a variable to a stack offset.
///
/// Literal index steps fold into the running offset; runtime index steps
/// emit address arithmetic into a dedicated address register allocated on
/// first use. Field steps add the field's recorded offset and advance the
/// type cursor. The terminal type must be simple; char- and string-typed
/// results are flagged for I/O.
pub fn lvalue(tab: &mut SymbolTable, base: &str, steps: &[PathStep]) -> SemaResult<Operand> {
    let var = match tab.get_symbol(base)? {
        Symbol::Var(v) => v.clone(),
        _ => return Err(SemaError::NotAVariable { name: base.to_string() }),
    };
    if steps.is_empty() {
        return Ok(Operand::Stack {
            offset: var.location,
            char_like: false,
        });
    }
    let mut offset = var.location;
    let mut cur = var.ty;
    let mut addr_reg: Option<u32> = None;
    for step in steps {
        match step {
            PathStep::Index(index) => {
                let (elem, lower) = match &tab.type_def(cur).kind {
                    TypeKind::Array { elem, lower, .. } => (*elem, *lower),
                    _ => return Err(SemaError::InvalidLvalue),
                };
                let elem_size = tab.type_size(elem);
                match index {
                    Operand::Int(v) => offset += (v - lower) * elem_size,
                    Operand::Stack { .. } | Operand::Reg(_) => {
                        let addr = match addr_reg {
                            Some(reg) => reg,
                            None => {
                                let reg = tab.get_reg()?;
                                tab.emit(&format!("move ${reg}, $zero"));
                                addr_reg = Some(reg);
                                reg
                            }
                        };
                        let idx = materialize(tab, index)?;
                        tab.emit(&format!("addi ${idx}, ${idx}, {}", -lower));
                        let scale = tab.get_reg()?;
                        tab.emit(&format!("li ${scale}, {elem_size}"));
                        tab.emit(&format!("mult ${idx}, ${scale}"));
                        tab.emit(&format!("mflo ${idx}"));
                        tab.emit(&format!("add ${addr}, ${addr}, ${idx}"));
                    }
                    _ => return Err(SemaError::InvalidLvalue),
                }
                cur = elem;
            }
            PathStep::Field(field) => {
                let (field_ty, field_offset) = match &tab.type_def(cur).kind {
                    TypeKind::Record { fields } => match fields.get(field) {
                        Some(entry) => *entry,
                        None => return Err(SemaError::InvalidLvalue),
                    },
                    _ => return Err(SemaError::InvalidLvalue),
                };
                offset += field_offset;
                cur = field_ty;
            }
        }
    }
    let char_like = match &tab.type_def(cur).kind {
        TypeKind::Simple(kind) => matches!(kind, SimpleKind::Char | SimpleKind::Str),
        _ => return Err(SemaError::InvalidLvalue),
    };
    Ok(Operand::Stack { offset, char_like })
}

/// Store a value to a resolved lvalue's stack offset, materializing the
/// value into a register first when it is not already in one.
pub fn assign(tab: &mut SymbolTable, lval: &Operand, rval: &Operand) -> SemaResult<()> {
    let Operand::Stack { offset, .. } = lval else {
        return Err(SemaError::InvalidLvalue);
    };
    let src = materialize(tab, rval)?;
    tab.emit(&format!("sw ${src}, {offset}($sp)"));
    Ok(())
}

/// Emit one print syscall per operand: code 1 for integers (including stack
/// and register words), 4 for strings, 11 for characters.
pub fn write(tab: &mut SymbolTable, args: &[Operand]) -> SemaResult<()> {
    for arg in args {
        match arg {
            Operand::Int(v) => {
                tab.emit(&format!("li $a0, {v}"));
                tab.emit("li $v0, 1");
            }
            Operand::Char(c) => {
                tab.emit(&format!("li $a0, {}", *c as u32));
                tab.emit("li $v0, 11");
            }
            Operand::Str(label) => {
                tab.emit(&format!("la $a0, {label}"));
                tab.emit("li $v0, 4");
            }
            Operand::Stack { offset, .. } => {
                tab.emit(&format!("lw $a0, {offset}($sp)"));
                tab.emit("li $v0, 1");
            }
            Operand::Reg(reg) => {
                tab.emit(&format!("move $a0, ${reg}"));
                tab.emit("li $v0, 1");
            }
            Operand::Bool(_) => {
                return Err(SemaError::Internal {
                    detail: "write of a boolean value".to_string(),
                })
            }
        }
        tab.emit("syscall");
    }
    Ok(())
}

/// Emit one read syscall per target lvalue (code 8 for char/string words,
/// 5 for integers), storing the result back to the target's stack offset.
pub fn read(tab: &mut SymbolTable, targets: &[Operand]) -> SemaResult<()> {
    for target in targets {
        let Operand::Stack { offset, char_like } = target else {
            return Err(SemaError::InvalidLvalue);
        };
        tab.emit(if *char_like { "li $v0, 8" } else { "li $v0, 5" });
        tab.emit("syscall");
        tab.emit(&format!("sw $v0, {offset}($sp)"));
    }
    Ok(())
}

/// Single-pass lowering of a parsed program.
pub struct Compiler {
    tab: SymbolTable,
    verbose: bool,
}

impl Compiler {
    pub fn new(verbose: bool) -> Self {
        Compiler {
            tab: SymbolTable::new(),
            verbose,
        }
    }

    pub fn compile(mut self, prog: &Program) -> SemaResult<String> {
        self.tab.emit(".text");
        self.declare_block(&prog.block)?;
        self.tab.emit("main:");
        self.gen_stmt(&prog.block.body)?;
        self.tab.clear_regs();
        self.tab.emit_epilogue();
        Ok(self.tab.into_output())
    }

    fn declare_block(&mut self, block: &Block) -> SemaResult<()> {
        for decl in &block.consts {
            let value = self.const_value(&decl.expr)?;
            self.tab.add_symbol(&decl.name, Symbol::Const(value), true)?;
        }
        for decl in &block.types {
            let id = self.resolve_type_spec(&decl.spec, &decl.name)?;
            self.tab.add_symbol(&decl.name, Symbol::Type(id), true)?;
        }
        for decl in &block.vars {
            let ty = self.resolve_type_spec(&decl.spec, "")?;
            for name in &decl.names {
                let var = self.tab.new_var(name, ty);
                self.tab.add_symbol(name, Symbol::Var(var), true)?;
            }
        }
        for routine in &block.routines {
            self.declare_routine(routine)?;
        }
        Ok(())
    }

    fn declare_routine(&mut self, decl: &RoutineDecl) -> SemaResult<()> {
        let mut params = Vec::new();
        for group in &decl.params {
            let ty = self.tab.check_type(&group.ty)?;
            params.push(ParamGroup {
                names: group.names.clone(),
                ty,
            });
        }
        let func = match &decl.ret {
            Some(ret_name) => {
                let ret = self.tab.check_type(ret_name)?;
                Function::function(&decl.name, params, ret)
            }
            None => Function::procedure(&decl.name, params),
        };
        match &decl.body {
            RoutineBody::Forward => self.tab.add_function(&decl.name, func, true),
            RoutineBody::Body(block) => {
                self.tab.add_function(&decl.name, func.clone(), false)?;
                self.tab.emit(&format!("{}:", func.label));
                self.tab.push_scope(&func)?;
                self.declare_block(block)?;
                self.gen_stmt(&block.body)?;
                self.tab.clear_regs();
                let bindings = self.tab.pop_scope();
                if self.verbose {
                    self.dump_scope(&decl.name, &bindings);
                }
                Ok(())
            }
        }
    }

    fn dump_scope(&self, scope_name: &str, bindings: &HashMap<String, Symbol>) {
        eprintln!("--- scope {scope_name} ---");
        let mut names: Vec<&String> = bindings.keys().collect();
        names.sort();
        for name in names {
            eprintln!("{}", self.tab.describe(name, &bindings[name]));
        }
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> SemaResult<()> {
        match stmt {
            Stmt::Empty => Ok(()),
            Stmt::Compound(stmts) => {
                for s in stmts {
                    self.gen_stmt(s)?;
                    self.tab.clear_regs();
                }
                Ok(())
            }
            Stmt::Assign(target, rhs) => {
                let target = self.resolve_lvalue(target)?;
                let value = self.gen_expr(rhs)?;
                assign(&mut self.tab, &target, &value)
            }
            Stmt::Write(args) => {
                let mut operands = Vec::new();
                for arg in args {
                    operands.push(self.gen_expr(arg)?);
                }
                write(&mut self.tab, &operands)
            }
            Stmt::Read(targets) => {
                let mut operands = Vec::new();
                for target in targets {
                    operands.push(self.resolve_lvalue(target)?);
                }
                read(&mut self.tab, &operands)
            }
        }
    }

    fn gen_expr(&mut self, expr: &Expr) -> SemaResult<Operand> {
        match expr {
            Expr::Int(v) => Ok(Operand::Int(*v)),
            Expr::Char(c) => Ok(Operand::Char(*c)),
            Expr::Str(text) => {
                let pooled = self.tab.string_const(text);
                const_operand(&pooled)
            }
            Expr::Binary(left, op, right) => {
                let left = self.gen_expr(left)?;
                let right = self.gen_expr(right)?;
                eval(&mut self.tab, &left, &right, *op)
            }
            Expr::Unary(op, inner) => {
                let operand = self.gen_expr(inner)?;
                eval_unary(&mut self.tab, &operand, *op)
            }
            Expr::Path(path) => {
                // A bare name may denote a constant; anything else resolves
                // as a storage location.
                if path.sels.is_empty() {
                    if let Symbol::Const(c) = self.tab.get_symbol(&path.base)?.clone() {
                        let resolved = self.tab.resolve_const(&c)?;
                        return const_operand(&resolved);
                    }
                }
                self.resolve_lvalue(path)
            }
        }
    }

    fn resolve_lvalue(&mut self, path: &LValue) -> SemaResult<Operand> {
        let mut steps = Vec::new();
        for sel in &path.sels {
            match sel {
                Selector::Index(e) => steps.push(PathStep::Index(self.gen_expr(e)?)),
                Selector::Field(name) => steps.push(PathStep::Field(name.clone())),
            }
        }
        lvalue(&mut self.tab, &path.base, &steps)
    }

    fn const_value(&mut self, expr: &ConstExpr) -> SemaResult<Const> {
        match expr {
            ConstExpr::Int(v) => Ok(Const::Int(*v)),
            ConstExpr::Char(c) => Ok(Const::Char(*c)),
            ConstExpr::Str(text) => Ok(self.tab.string_const(text)),
            ConstExpr::Ident(name) => Ok(Const::Ident(name.clone())),
            ConstExpr::Binary(left, op, right) => {
                let left = self.const_value(left)?;
                let right = self.const_value(right)?;
                fold_binary(&self.tab, *op, &left, &right)
            }
            ConstExpr::Unary(op, inner) => {
                let value = self.const_value(inner)?;
                fold_unary(&self.tab, *op, &value)
            }
        }
    }

    fn resolve_type_spec(&mut self, spec: &TypeSpec, name: &str) -> SemaResult<TypeId> {
        match spec {
            TypeSpec::Named(type_name) => self.tab.check_type(type_name),
            TypeSpec::Array { lower, upper, elem } => {
                let elem = self.resolve_type_spec(elem, "")?;
                let lower = self.const_value(lower)?;
                let upper = self.const_value(upper)?;
                self.tab.array_type(elem, &lower, &upper)
            }
            TypeSpec::Record(groups) => {
                let mut resolved = Vec::new();
                for group in groups {
                    let ty = self.resolve_type_spec(&group.spec, "")?;
                    resolved.push((group.names.clone(), ty));
                }
                Ok(self.tab.record_type(&resolved, name))
            }
        }
    }
}
