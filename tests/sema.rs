use minipascal::error::SemaError;
use minipascal::fold::{fold_binary, fold_unary, BinOp, UnOp};
use minipascal::symtab::{Const, Function, ParamGroup, Symbol, SymbolTable, TypeKind};

#[test]
fn array_type_computes_size_and_name() {
    let mut tab = SymbolTable::new();
    let int_ty = tab.check_type("integer").unwrap();
    let arr = tab
        .array_type(int_ty, &Const::Int(1), &Const::Int(10))
        .unwrap();
    let def = tab.type_def(arr);
    assert_eq!(def.size, 36);
    assert_eq!(def.name, "array[1:10] of integer");
}

#[test]
fn array_with_empty_range_is_rejected() {
    let mut tab = SymbolTable::new();
    let int_ty = tab.check_type("integer").unwrap();
    assert_eq!(
        tab.array_type(int_ty, &Const::Int(5), &Const::Int(5)),
        Err(SemaError::InvalidArrayBounds { lower: 5, upper: 5 })
    );
    assert_eq!(
        tab.array_type(int_ty, &Const::Int(9), &Const::Int(3)),
        Err(SemaError::InvalidArrayBounds { lower: 9, upper: 3 })
    );
}

#[test]
fn array_bounds_resolve_named_constants() {
    let mut tab = SymbolTable::new();
    let int_ty = tab.check_type("integer").unwrap();
    tab.add_symbol("n", Symbol::Const(Const::Int(8)), true).unwrap();
    let arr = tab
        .array_type(int_ty, &Const::Int(0), &Const::Ident("n".to_string()))
        .unwrap();
    assert_eq!(tab.type_size(arr), 32);
}

#[test]
fn array_bound_must_be_an_int_constant() {
    let mut tab = SymbolTable::new();
    let int_ty = tab.check_type("integer").unwrap();
    let pooled = tab.string_const("hi");
    tab.add_symbol("s", Symbol::Const(pooled), true).unwrap();
    assert_eq!(
        tab.array_type(int_ty, &Const::Ident("s".to_string()), &Const::Int(3)),
        Err(SemaError::ArrayBoundNotInt)
    );
    assert_eq!(
        tab.array_type(int_ty, &Const::Ident("missing".to_string()), &Const::Int(3)),
        Err(SemaError::SymbolNotFound { name: "missing".to_string() })
    );
}

#[test]
fn record_fields_get_sequential_offsets() {
    let mut tab = SymbolTable::new();
    let int_ty = tab.check_type("integer").unwrap();
    let char_ty = tab.check_type("char").unwrap();
    let rec = tab.record_type(
        &[
            (vec!["x".to_string(), "y".to_string()], int_ty),
            (vec!["tag".to_string()], char_ty),
        ],
        "point",
    );
    let def = tab.type_def(rec);
    assert_eq!(def.size, 12);
    match &def.kind {
        TypeKind::Record { fields } => {
            assert_eq!(fields["x"], (int_ty, 0));
            assert_eq!(fields["y"], (int_ty, 4));
            assert_eq!(fields["tag"], (char_ty, 8));
        }
        other => panic!("expected a record, got {other:?}"),
    }
}

#[test]
fn register_pool_exhausts_and_resets() {
    let mut tab = SymbolTable::new();
    for i in 0..18u32 {
        assert_eq!(tab.get_reg().unwrap(), 7 + i);
    }
    assert_eq!(tab.get_reg(), Err(SemaError::OutOfRegisters));
    tab.clear_regs();
    assert_eq!(tab.get_reg().unwrap(), 7);
}

#[test]
fn scope_pop_discards_parameter_bindings() {
    let mut tab = SymbolTable::new();
    let int_ty = tab.check_type("integer").unwrap();
    let proc = Function::procedure(
        "p",
        vec![ParamGroup {
            names: vec!["a".to_string(), "b".to_string()],
            ty: int_ty,
        }],
    );
    tab.push_scope(&proc).unwrap();
    let Symbol::Var(a) = tab.get_symbol("a").unwrap().clone() else {
        panic!("parameter a is not a var");
    };
    let Symbol::Var(b) = tab.get_symbol("b").unwrap().clone() else {
        panic!("parameter b is not a var");
    };
    assert_eq!(a.location, 0);
    assert_eq!(b.location, 4);
    tab.pop_scope();
    assert!(!tab.lookup("a"));
    assert!(tab.get_symbol("a").is_err());
}

#[test]
fn duplicate_parameter_names_are_rejected() {
    let mut tab = SymbolTable::new();
    let int_ty = tab.check_type("integer").unwrap();
    let proc = Function::procedure(
        "p",
        vec![ParamGroup {
            names: vec!["x".to_string(), "x".to_string()],
            ty: int_ty,
        }],
    );
    assert_eq!(
        tab.push_scope(&proc),
        Err(SemaError::AlreadyDefined { name: "x".to_string() })
    );
}

#[test]
fn forward_declaration_is_completed_in_place() {
    let mut tab = SymbolTable::new();
    let proc = Function::procedure("p", vec![]);
    tab.add_function("p", proc.clone(), true).unwrap();
    tab.add_function("p", proc.clone(), false).unwrap();
    match tab.get_symbol("p").unwrap() {
        Symbol::Function(f) => assert!(f.defined),
        other => panic!("expected a function, got {other:?}"),
    }
    assert_eq!(
        tab.add_function("p", proc, false),
        Err(SemaError::FunctionAlreadyDefined { name: "p".to_string() })
    );
}

#[test]
fn double_forward_declaration_is_rejected() {
    let mut tab = SymbolTable::new();
    let proc = Function::procedure("q", vec![]);
    tab.add_function("q", proc.clone(), true).unwrap();
    assert_eq!(
        tab.add_function("q", proc, true),
        Err(SemaError::FunctionAlreadyDefined { name: "q".to_string() })
    );
}

#[test]
fn function_name_cannot_shadow_other_symbols() {
    let mut tab = SymbolTable::new();
    let int_ty = tab.check_type("integer").unwrap();
    let var = tab.new_var("x", int_ty);
    tab.add_symbol("x", Symbol::Var(var), true).unwrap();
    assert_eq!(
        tab.add_function("x", Function::procedure("x", vec![]), false),
        Err(SemaError::RedeclaringSymbol { name: "x".to_string() })
    );
}

#[test]
fn check_type_accepts_builtins_in_both_cases() {
    let tab = SymbolTable::new();
    assert_eq!(tab.check_type("integer"), tab.check_type("INTEGER"));
    assert!(tab.check_type("boolean").is_ok());
    assert_eq!(
        tab.check_type("true"),
        Err(SemaError::TypeUndefined { name: "true".to_string() })
    );
    assert_eq!(
        tab.check_type("widget"),
        Err(SemaError::TypeUndefined { name: "widget".to_string() })
    );
}

#[test]
fn folding_arithmetic_is_pure() {
    let tab = SymbolTable::new();
    assert_eq!(
        fold_binary(&tab, BinOp::Add, &Const::Int(2), &Const::Int(3)),
        Ok(Const::Int(5))
    );
    assert_eq!(
        fold_binary(&tab, BinOp::Div, &Const::Int(-7), &Const::Int(2)),
        Ok(Const::Int(-3))
    );
    assert_eq!(
        fold_binary(&tab, BinOp::Mod, &Const::Int(-7), &Const::Int(2)),
        Ok(Const::Int(-1))
    );
    assert!(tab.output().is_empty());
}

#[test]
fn folding_resolves_named_constants_one_level() {
    let mut tab = SymbolTable::new();
    tab.add_symbol("n", Symbol::Const(Const::Int(4)), true).unwrap();
    assert_eq!(
        fold_binary(&tab, BinOp::Mult, &Const::Ident("n".to_string()), &Const::Int(3)),
        Ok(Const::Int(12))
    );
    assert_eq!(
        fold_binary(&tab, BinOp::Add, &Const::Ident("ghost".to_string()), &Const::Int(1)),
        Err(SemaError::SymbolNotFound { name: "ghost".to_string() })
    );
}

#[test]
fn relational_folding_covers_int_char_string() {
    let mut tab = SymbolTable::new();
    assert_eq!(
        fold_binary(&tab, BinOp::Lt, &Const::Int(1), &Const::Int(2)),
        Ok(Const::Bool(true))
    );
    assert_eq!(
        fold_binary(&tab, BinOp::Gte, &Const::Char('a'), &Const::Char('b')),
        Ok(Const::Bool(false))
    );
    let abc = tab.string_const("abc");
    let abd = tab.string_const("abd");
    assert_eq!(fold_binary(&tab, BinOp::Lt, &abc, &abd), Ok(Const::Bool(true)));
    assert_eq!(
        fold_binary(&tab, BinOp::Gt, &Const::Int(1), &Const::Char('a')),
        Err(SemaError::OperandTypeMismatch)
    );
    assert!(matches!(
        fold_binary(&tab, BinOp::Gt, &Const::Bool(true), &Const::Bool(false)),
        Err(SemaError::Internal { .. })
    ));
}

#[test]
fn logical_folding_requires_booleans() {
    let tab = SymbolTable::new();
    assert_eq!(
        fold_binary(&tab, BinOp::And, &Const::Bool(true), &Const::Bool(false)),
        Ok(Const::Bool(false))
    );
    assert_eq!(
        fold_binary(&tab, BinOp::Or, &Const::Bool(false), &Const::Bool(true)),
        Ok(Const::Bool(true))
    );
    assert_eq!(
        fold_binary(&tab, BinOp::And, &Const::Int(1), &Const::Int(1)),
        Err(SemaError::InvalidConstOp)
    );
}

#[test]
fn unary_folding_checks_operand_tags() {
    let tab = SymbolTable::new();
    assert_eq!(fold_unary(&tab, UnOp::Negate, &Const::Int(5)), Ok(Const::Int(-5)));
    assert_eq!(fold_unary(&tab, UnOp::Not, &Const::Bool(true)), Ok(Const::Bool(false)));
    assert_eq!(
        fold_unary(&tab, UnOp::Negate, &Const::Bool(true)),
        Err(SemaError::InvalidConstOp)
    );
}

#[test]
fn folded_division_by_zero_is_reported() {
    let tab = SymbolTable::new();
    assert_eq!(
        fold_binary(&tab, BinOp::Div, &Const::Int(1), &Const::Int(0)),
        Err(SemaError::ConstDivisionByZero)
    );
}

#[test]
fn string_constants_pool_in_construction_order() {
    let mut tab = SymbolTable::new();
    let first = tab.string_const("one");
    tab.string_const("two");
    tab.string_const("three");
    let pool = tab.string_pool();
    assert_eq!(pool.len(), 3);
    assert_eq!(pool[0], ("__stringConstLabel0".to_string(), "one".to_string()));
    assert_eq!(pool[1], ("__stringConstLabel1".to_string(), "two".to_string()));
    assert_eq!(pool[2], ("__stringConstLabel2".to_string(), "three".to_string()));
    match first {
        Const::Str { label, .. } => assert_eq!(label, "__stringConstLabel0"),
        other => panic!("expected a string constant, got {other:?}"),
    }
}
