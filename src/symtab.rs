//! Symbol table, type arena, and the rest of the per-compilation state.
//!
//! The [`SymbolTable`] is the single compilation context: it owns the scope
//! stack, the per-scope stack-frame offset counters, the label counter, the
//! string-constant pool, the register pool, the type arena, and the assembly
//! output buffer. Parsing collaborators construct entities through it and the
//! code generator emits through it; nothing here is global.

use std::collections::HashMap;
use std::fmt;

use crate::error::{SemaError, SemaResult};

/// Every simple type occupies one machine word.
pub const WORD_SIZE: i32 = 4;

/// Size of the general-purpose register pool.
pub const NUM_REGS: usize = 18;

/// Pool slot 0 maps to machine register `$7`; slot i to `$(7 + i)`.
pub const REG_BASE: u32 = 7;

/// Stable index of a type in the arena owned by [`SymbolTable`].
///
/// Vars, array element types, record fields, and function return types all
/// hold `TypeId`s; the arena outlives every entity that points into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleKind {
    Integer,
    Boolean,
    Char,
    Str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Simple(SimpleKind),
    Array {
        elem: TypeId,
        lower: i32,
        upper: i32,
    },
    Record {
        /// Field name to (element type, byte offset). Offsets are the prefix
        /// sums of field sizes in declaration order. A duplicate field name
        /// overwrites the earlier entry; the consumed size still counts both.
        fields: HashMap<String, (TypeId, i32)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub size: i32,
    pub kind: TypeKind,
}

/// A compile-time constant value.
///
/// `Ident` is not a value itself: it names another constant in the symbol
/// table and must be resolved (one level) before use. String constants carry
/// the data-section label assigned at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Const {
    Int(i32),
    Char(char),
    Str { text: String, label: String },
    Bool(bool),
    Ident(String),
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Int(v) => write!(f, "{v}"),
            Const::Char(c) => write!(f, "'{c}'"),
            Const::Str { text, label } => write!(f, "\"{text}\", location: {label}"),
            Const::Bool(b) => write!(f, "{b}"),
            Const::Ident(name) => write!(f, "{name}"),
        }
    }
}

/// A stack-resident variable. `location` is the `$sp`-relative byte offset
/// assigned when the variable was created in its scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub name: String,
    pub ty: TypeId,
    pub location: i32,
}

/// One `a, b: integer` group from a routine's formal parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGroup {
    pub names: Vec<String>,
    pub ty: TypeId,
}

/// A function or procedure signature. Procedures have no return type.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub label: String,
    pub params: Vec<ParamGroup>,
    pub ret: Option<TypeId>,
    pub defined: bool,
}

impl Function {
    pub fn function(name: &str, params: Vec<ParamGroup>, ret: TypeId) -> Self {
        Function {
            name: name.to_string(),
            label: format!("__{name}"),
            params,
            ret: Some(ret),
            defined: false,
        }
    }

    pub fn procedure(name: &str, params: Vec<ParamGroup>) -> Self {
        Function {
            name: name.to_string(),
            label: format!("__{name}"),
            params,
            ret: None,
            defined: false,
        }
    }
}

/// Everything a name can be bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Type(TypeId),
    Const(Const),
    Var(Var),
    Function(Function),
}

impl Symbol {
    /// Only type bindings may appear where a type name is expected.
    pub fn is_type(&self) -> bool {
        matches!(self, Symbol::Type(_))
    }
}

pub struct SymbolTable {
    /// Innermost scope last. Scope 0 holds the builtins, scope 1 is the
    /// top-level program scope; both exist for the whole compilation.
    scopes: Vec<HashMap<String, Symbol>>,
    /// Next free stack offset, one counter per active scope.
    offsets: Vec<i32>,
    labels: u32,
    string_consts: Vec<(String, String)>,
    /// true = free. Slot i is machine register `$(REG_BASE + i)`.
    registers: [bool; NUM_REGS],
    types: Vec<TypeDef>,
    out: String,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut tab = SymbolTable {
            scopes: vec![HashMap::new(), HashMap::new()],
            offsets: vec![0, 0],
            labels: 0,
            string_consts: Vec::new(),
            registers: [true; NUM_REGS],
            types: Vec::new(),
            out: String::new(),
        };
        for (lower, upper, kind) in [
            ("integer", "INTEGER", SimpleKind::Integer),
            ("char", "CHAR", SimpleKind::Char),
            ("boolean", "BOOLEAN", SimpleKind::Boolean),
            ("string", "STRING", SimpleKind::Str),
        ] {
            let id = tab.intern(TypeDef {
                name: lower.to_string(),
                size: WORD_SIZE,
                kind: TypeKind::Simple(kind),
            });
            tab.scopes[0].insert(lower.to_string(), Symbol::Type(id));
            tab.scopes[0].insert(upper.to_string(), Symbol::Type(id));
        }
        for (name, val) in [("true", true), ("TRUE", true), ("false", false), ("FALSE", false)] {
            tab.scopes[0].insert(name.to_string(), Symbol::Const(Const::Bool(val)));
        }
        tab
    }

    // --- Type arena ---

    fn intern(&mut self, def: TypeDef) -> TypeId {
        self.types.push(def);
        TypeId(self.types.len() - 1)
    }

    pub fn type_def(&self, id: TypeId) -> &TypeDef {
        &self.types[id.0]
    }

    pub fn type_size(&self, id: TypeId) -> i32 {
        self.types[id.0].size
    }

    pub fn type_name(&self, id: TypeId) -> &str {
        &self.types[id.0].name
    }

    /// Build an array type. Bounds are constants, possibly identifier
    /// references; both must resolve to ints and the range must be non-empty.
    pub fn array_type(&mut self, elem: TypeId, lower: &Const, upper: &Const) -> SemaResult<TypeId> {
        let lower = self.array_bound(lower)?;
        let upper = self.array_bound(upper)?;
        if upper <= lower {
            return Err(SemaError::InvalidArrayBounds { lower, upper });
        }
        let name = format!("array[{lower}:{upper}] of {}", self.type_name(elem));
        let size = self.type_size(elem) * (upper - lower);
        Ok(self.intern(TypeDef {
            name,
            size,
            kind: TypeKind::Array { elem, lower, upper },
        }))
    }

    fn array_bound(&self, bound: &Const) -> SemaResult<i32> {
        match bound {
            Const::Int(v) => Ok(*v),
            Const::Ident(name) => match self.get_symbol(name)? {
                Symbol::Const(Const::Int(v)) => Ok(*v),
                _ => Err(SemaError::ArrayBoundNotInt),
            },
            _ => Err(SemaError::ArrayBoundNotInt),
        }
    }

    /// Build a record type from `(names, type)` groups, assigning each field
    /// the next sequential offset in declaration order.
    pub fn record_type(&mut self, groups: &[(Vec<String>, TypeId)], name: &str) -> TypeId {
        let mut fields = HashMap::new();
        let mut offset = 0;
        for (names, ty) in groups {
            let size = self.type_size(*ty);
            for field in names {
                fields.insert(field.clone(), (*ty, offset));
                offset += size;
            }
        }
        self.intern(TypeDef {
            name: name.to_string(),
            size: offset,
            kind: TypeKind::Record { fields },
        })
    }

    // --- Scopes and symbols ---

    /// Create a variable in the innermost scope, advancing that scope's
    /// running offset by the variable's type size. The caller still has to
    /// bind it with [`SymbolTable::add_symbol`].
    pub fn new_var(&mut self, name: &str, ty: TypeId) -> Var {
        let size = self.type_size(ty);
        let offset = self.offsets.last_mut().expect("scope stack is empty");
        let location = *offset;
        *offset += size;
        Var {
            name: name.to_string(),
            ty,
            location,
        }
    }

    /// Open a new scope for a routine body, binding every parameter as a
    /// variable at the scope's running offset.
    pub fn push_scope(&mut self, func: &Function) -> SemaResult<()> {
        self.scopes.push(HashMap::new());
        self.offsets.push(0);
        for group in &func.params {
            for name in &group.names {
                let var = self.new_var(name, group.ty);
                self.add_symbol(name, Symbol::Var(var), true)?;
            }
        }
        Ok(())
    }

    /// Close the innermost scope, returning its bindings so the driver can
    /// dump them when running verbose. The bindings are otherwise discarded.
    pub fn pop_scope(&mut self) -> HashMap<String, Symbol> {
        self.offsets.pop();
        self.scopes.pop().unwrap_or_default()
    }

    /// Bind `name` in the innermost scope. With `initial_check` set, an
    /// existing binding of the same name is a declaration error; without it
    /// an existing binding is silently kept.
    pub fn add_symbol(&mut self, name: &str, symbol: Symbol, initial_check: bool) -> SemaResult<()> {
        let scope = self.scopes.last_mut().expect("scope stack is empty");
        if scope.contains_key(name) {
            if initial_check {
                return Err(SemaError::AlreadyDefined { name: name.to_string() });
            }
            return Ok(());
        }
        scope.insert(name.to_string(), symbol);
        Ok(())
    }

    /// Bind a function, honoring forward declarations: completing an
    /// undefined forward declaration marks it defined in place; colliding
    /// with a defined function, or forward-declaring twice, is an error.
    pub fn add_function(&mut self, name: &str, mut func: Function, forward: bool) -> SemaResult<()> {
        let scope = self.scopes.last_mut().expect("scope stack is empty");
        if let Some(existing) = scope.get_mut(name) {
            return match existing {
                Symbol::Function(prev) => {
                    if prev.defined || forward {
                        Err(SemaError::FunctionAlreadyDefined { name: name.to_string() })
                    } else {
                        prev.defined = true;
                        Ok(())
                    }
                }
                _ => Err(SemaError::RedeclaringSymbol { name: name.to_string() }),
            };
        }
        func.defined = !forward;
        scope.insert(name.to_string(), Symbol::Function(func));
        Ok(())
    }

    /// Existence probe across every active scope.
    pub fn lookup(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains_key(name))
    }

    /// Resolve a name, innermost scope first.
    pub fn get_symbol(&self, name: &str) -> SemaResult<&Symbol> {
        for scope in self.scopes.iter().rev() {
            if let Some(sym) = scope.get(name) {
                return Ok(sym);
            }
        }
        Err(SemaError::SymbolNotFound { name: name.to_string() })
    }

    /// Check that `name` denotes a type and return it.
    pub fn check_type(&self, name: &str) -> SemaResult<TypeId> {
        if self.lookup(name) {
            if let Symbol::Type(id) = self.get_symbol(name)? {
                return Ok(*id);
            }
        }
        Err(SemaError::TypeUndefined { name: name.to_string() })
    }

    /// Resolve an identifier-reference constant one level; concrete
    /// constants come back unchanged.
    pub fn resolve_const(&self, value: &Const) -> SemaResult<Const> {
        match value {
            Const::Ident(name) => match self.get_symbol(name)? {
                Symbol::Const(c) => Ok(c.clone()),
                _ => Err(SemaError::NotAConstant { name: name.clone() }),
            },
            concrete => Ok(concrete.clone()),
        }
    }

    // --- Registers, labels, string pool ---

    /// Claim the lowest-numbered free register. There is no spill path: a
    /// statement that needs more than the pool holds is a fatal error.
    pub fn get_reg(&mut self) -> SemaResult<u32> {
        for (slot, free) in self.registers.iter_mut().enumerate() {
            if *free {
                *free = false;
                return Ok(REG_BASE + slot as u32);
            }
        }
        Err(SemaError::OutOfRegisters)
    }

    /// Release every register. Called between statements; values are never
    /// kept live in registers across a statement boundary.
    pub fn clear_regs(&mut self) {
        self.registers = [true; NUM_REGS];
    }

    pub fn next_label(&mut self) -> u32 {
        let n = self.labels;
        self.labels += 1;
        n
    }

    /// Build a string constant, assigning it a data-section label and
    /// registering it in the pool emitted at program end.
    pub fn string_const(&mut self, text: &str) -> Const {
        let label = format!("__stringConstLabel{}", self.next_label());
        self.string_consts.push((label.clone(), text.to_string()));
        Const::Str {
            text: text.to_string(),
            label,
        }
    }

    pub fn string_pool(&self) -> &[(String, String)] {
        &self.string_consts
    }

    // --- Emission ---

    pub fn emit(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    /// Exit syscall followed by the data section: the newline constant and
    /// every registered string constant, in construction order.
    pub fn emit_epilogue(&mut self) {
        self.emit("li $v0, 10");
        self.emit("syscall");
        self.emit(".data");
        self.emit("__newline: .asciiz \"\\n\"");
        let entries: Vec<String> = self
            .string_consts
            .iter()
            .map(|(label, text)| format!("{label}: .asciiz \"{}\"", escape_asciiz(text)))
            .collect();
        for entry in entries {
            self.emit(&entry);
        }
    }

    pub fn output(&self) -> &str {
        &self.out
    }

    pub fn into_output(self) -> String {
        self.out
    }

    // --- Debug dump ---

    /// One-line description of a binding, for the verbose scope dump.
    pub fn describe(&self, name: &str, symbol: &Symbol) -> String {
        match symbol {
            Symbol::Const(c) => format!("const {name}: {c}"),
            Symbol::Var(v) => format!(
                "var {name} of type {}, location: {}",
                self.type_name(v.ty),
                v.location
            ),
            Symbol::Function(f) => {
                let params: Vec<String> = f
                    .params
                    .iter()
                    .map(|g| format!("{}: {}", g.names.join(", "), self.type_name(g.ty)))
                    .collect();
                let head = if f.ret.is_some() { "function" } else { "procedure" };
                let ret = match f.ret {
                    Some(ty) => format!(" -> {}", self.type_name(ty)),
                    None => String::new(),
                };
                format!("{head} {name}({}){ret}, location: {}", params.join("; "), f.label)
            }
            Symbol::Type(id) => {
                let def = self.type_def(*id);
                match &def.kind {
                    TypeKind::Simple(kind) => {
                        format!("type {name} of simple type {}", simple_kind_name(*kind))
                    }
                    TypeKind::Array { elem, lower, upper } => format!(
                        "type {name}: array {lower} to {upper} of {}, size: {}",
                        self.type_name(*elem),
                        def.size
                    ),
                    TypeKind::Record { fields } => {
                        let mut entries: Vec<(&String, &(TypeId, i32))> = fields.iter().collect();
                        entries.sort_by_key(|(_, (_, offset))| *offset);
                        let body: Vec<String> = entries
                            .iter()
                            .map(|(field, (ty, offset))| {
                                format!("{field}: {} at offset {offset}", self.type_name(*ty))
                            })
                            .collect();
                        format!("type {name}: record {{ {} }}, size: {}", body.join("; "), def.size)
                    }
                }
            }
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

fn simple_kind_name(kind: SimpleKind) -> &'static str {
    match kind {
        SimpleKind::Integer => "integer",
        SimpleKind::Boolean => "boolean",
        SimpleKind::Char => "char",
        SimpleKind::Str => "string",
    }
}

fn escape_asciiz(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}
