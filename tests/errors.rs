use minipascal::compile;
use minipascal::error::{CompileError, SemaError};

fn sema_err(src: &str) -> SemaError {
    match compile(src) {
        Err(CompileError::Sema { source }) => source,
        other => panic!("expected a semantic error, got {other:?}"),
    }
}

#[test]
fn duplicate_variable_in_a_scope() {
    let src = r#"
program demo;
var
  x: integer;
  x: boolean;
begin
end.
"#;
    assert_eq!(sema_err(src), SemaError::AlreadyDefined { name: "x".to_string() });
}

#[test]
fn unknown_type_name() {
    let src = r#"
program demo;
var
  x: widget;
begin
end.
"#;
    assert_eq!(sema_err(src), SemaError::TypeUndefined { name: "widget".to_string() });
}

#[test]
fn assignment_to_an_unknown_name() {
    let src = r#"
program demo;
begin
  y := 1
end.
"#;
    assert_eq!(sema_err(src), SemaError::SymbolNotFound { name: "y".to_string() });
}

#[test]
fn assignment_to_a_constant() {
    let src = r#"
program demo;
const
  c = 1;
begin
  c := 2
end.
"#;
    assert_eq!(sema_err(src), SemaError::NotAVariable { name: "c".to_string() });
}

#[test]
fn empty_array_range() {
    let src = r#"
program demo;
type
  t = array[5..3] of integer;
begin
end.
"#;
    assert_eq!(sema_err(src), SemaError::InvalidArrayBounds { lower: 5, upper: 3 });
}

#[test]
fn array_bound_referencing_a_char_constant() {
    let src = r#"
program demo;
const
  c = 'x';
type
  t = array[c..3] of integer;
begin
end.
"#;
    assert_eq!(sema_err(src), SemaError::ArrayBoundNotInt);
}

#[test]
fn unknown_record_field() {
    let src = r#"
program demo;
type
  p = record
    x: integer;
  end;
var
  r: p;
begin
  r.z := 1
end.
"#;
    assert_eq!(sema_err(src), SemaError::InvalidLvalue);
}

#[test]
fn indexing_a_scalar_variable() {
    let src = r#"
program demo;
var
  x: integer;
begin
  x[1] := 1
end.
"#;
    assert_eq!(sema_err(src), SemaError::InvalidLvalue);
}

#[test]
fn arithmetic_on_mixed_constant_tags() {
    let src = r#"
program demo;
const
  k = 1 + 'a';
begin
end.
"#;
    assert_eq!(sema_err(src), SemaError::InvalidConstOp);
}

#[test]
fn comparison_of_mismatched_constant_tags() {
    let src = r#"
program demo;
const
  k = 1 > 'a';
begin
end.
"#;
    assert_eq!(sema_err(src), SemaError::OperandTypeMismatch);
}

#[test]
fn constant_division_by_zero() {
    let src = r#"
program demo;
const
  k = 1 div 0;
begin
end.
"#;
    assert_eq!(sema_err(src), SemaError::ConstDivisionByZero);
}

#[test]
fn duplicate_procedure_definition() {
    let src = r#"
program demo;
procedure p;
begin
end;
procedure p;
begin
end;
begin
end.
"#;
    assert_eq!(
        sema_err(src),
        SemaError::FunctionAlreadyDefined { name: "p".to_string() }
    );
}

#[test]
fn duplicate_forward_declaration() {
    let src = r#"
program demo;
procedure p; forward;
procedure p; forward;
begin
end.
"#;
    assert_eq!(
        sema_err(src),
        SemaError::FunctionAlreadyDefined { name: "p".to_string() }
    );
}

#[test]
fn procedure_name_colliding_with_a_variable() {
    let src = r#"
program demo;
var
  p: integer;
procedure p;
begin
end;
begin
end.
"#;
    assert_eq!(sema_err(src), SemaError::RedeclaringSymbol { name: "p".to_string() });
}

#[test]
fn statement_exhausting_the_register_pool() {
    let src = r#"
program demo;
var
  v: integer;
  x: integer;
begin
  x := v + v + v + v + v + v + v + v + v + v
end.
"#;
    assert_eq!(sema_err(src), SemaError::OutOfRegisters);
}

#[test]
fn syntax_errors_surface_as_parse_errors() {
    assert!(matches!(
        compile("program;"),
        Err(CompileError::Parse { .. })
    ));
    assert!(matches!(
        compile("program p; begin x := end."),
        Err(CompileError::Parse { .. })
    ));
}
