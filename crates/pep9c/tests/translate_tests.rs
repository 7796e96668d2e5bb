//! End-to-end translation tests: source in, full assembly text out.

use pep9c::{Error, ErrorKind, compile_source};
use pretty_assertions::assert_eq;

fn translate(source: &str) -> String {
    let mut out = Vec::new();
    compile_source(source, "test.py", &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn translate_err(source: &str) -> Error {
    let mut out = Vec::new();
    compile_source(source, "test.py", &mut out).unwrap_err()
}

#[test]
fn constant_equate_emits_no_code() {
    assert_eq!(
        translate("_N = 3 + 4"),
        "; Translating test.py\n\
         ; Branching to top level (main) instructions\n\
         \t\tBR main\n\
         ; Allocating Global (static) memory\n\
         A:       \t.EQUATE 7     ; global variable _N #2d\n\
         ; Top Level instructions\n\
         ; Top Level instructions\n\
         main:    \t.END\n"
    );
}

#[test]
fn runtime_global_reads_and_prints() {
    assert_eq!(
        translate("x = input()\nprint(x)"),
        "; Translating test.py\n\
         ; Branching to top level (main) instructions\n\
         \t\tBR main\n\
         ; Allocating Global (static) memory\n\
         A:       \t.BLOCK 2      ; global variable x #2d\n\
         ; Top Level instructions\n\
         ; Top Level instructions\n\
         main:    \tDECI A,d\n\
         \t\tDECO A,d\n\
         \t\t.END\n"
    );
}

#[test]
fn while_loop_inverts_the_comparison() {
    assert_eq!(
        translate("i = 0\nwhile i < 10:\n    i = i + 1"),
        "; Translating test.py\n\
         ; Branching to top level (main) instructions\n\
         \t\tBR main\n\
         ; Allocating Global (static) memory\n\
         A:       \t.WORD 0       ; global variable i #2d\n\
         ; Top Level instructions\n\
         ; Top Level instructions\n\
         main:    \tNOP1\n\
         Z:       \tLDWA A,d\n\
         \t\tCPWA 10,i\n\
         \t\tBRGE Y\n\
         \t\tADDA 1,i\n\
         \t\tSTWA A,d\n\
         \t\tBR Z\n\
         Y:       \t.END\n"
    );
}

#[test]
fn function_call_marshals_arguments_below_the_frame() {
    assert_eq!(
        translate("def f(a, b):\n    return a + b\ny = f(2, 3)"),
        "; Translating test.py\n\
         ; Branching to top level (main) instructions\n\
         \t\tBR main\n\
         ; Allocating Global (static) memory\n\
         A:       \t.BLOCK 2      ; global variable y #2d\n\
         ; Allocating Local memory for f\n\
         Y:       \t.EQUATE 2     ; local var a #2d\n\
         X:       \t.EQUATE 0     ; local var b #2d\n\
         ; Top Level instructions\n\
         \t\t; Function f\n\
         Z:       \tSUBSP 4,i ; push #Y #X\n\
         \t\tLDWA Y,s\n\
         \t\tADDA X,s\n\
         \t\tADDSP 4,i ; pop #Y #X\n\
         \t\tRET\n\
         ; Top Level instructions\n\
         main:    \tLDWA 2,i\n\
         \t\tSTWA -4,s\n\
         \t\tLDWA 3,i\n\
         \t\tSTWA -6,s\n\
         \t\tCALL Z\n\
         \t\tSTWA A,d\n\
         \t\t.END\n"
    );
}

#[test]
fn array_subscript_store_scales_the_index() {
    assert_eq!(
        translate("arr_ = [0] * 4\narr_[2] = 9"),
        "; Translating test.py\n\
         ; Branching to top level (main) instructions\n\
         \t\tBR main\n\
         ; Allocating Global (static) memory\n\
         A:       \t.BLOCK 8      ; global variable arr_ #2d4a\n\
         ; Top Level instructions\n\
         ; Top Level instructions\n\
         main:    \tLDWA 9,i\n\
         \t\tLDWX 2,i\n\
         \t\tASLX\n\
         \t\tSTWA A,x\n\
         \t\t.END\n"
    );
}

#[test]
fn full_program_snapshot() {
    let source = "\
_LIMIT = 10
count = 0
total = input()
def bump(step):
    return total + step
while count < _LIMIT:
    count = count + 1
    total = bump(2)
print(total)
";
    assert_eq!(
        translate(source),
        "; Translating test.py\n\
         ; Branching to top level (main) instructions\n\
         \t\tBR main\n\
         ; Allocating Global (static) memory\n\
         A:       \t.EQUATE 10    ; global variable _LIMIT #2d\n\
         B:       \t.WORD 0       ; global variable count #2d\n\
         C:       \t.BLOCK 2      ; global variable total #2d\n\
         ; Allocating Local memory for bump\n\
         W:       \t.EQUATE 0     ; local var step #2d\n\
         ; Top Level instructions\n\
         \t\t; Function bump\n\
         X:       \tSUBSP 2,i ; push #W\n\
         \t\tLDWA C,d\n\
         \t\tADDA W,s\n\
         \t\tADDSP 2,i ; pop #W\n\
         \t\tRET\n\
         ; Top Level instructions\n\
         main:    \tDECI C,d\n\
         Z:       \tLDWA B,d\n\
         \t\tCPWA A,i\n\
         \t\tBRGE Y\n\
         \t\tADDA 1,i\n\
         \t\tSTWA B,d\n\
         \t\tLDWA 2,i\n\
         \t\tSTWA -4,s\n\
         \t\tCALL X\n\
         \t\tSTWA C,d\n\
         \t\tBR Z\n\
         Y:       \tDECO C,d\n\
         \t\t.END\n"
    );
}

#[test]
fn identifier_and_branch_labels_stay_disjoint() {
    let source = "\
a = input()
b = input()
def f(n):
    m = n + 1
    return m
if a < b:
    a = f(b)
while b < a:
    b = b + 1
print(b)
";
    let output = translate(source);

    let mut defined = Vec::new();
    for line in output.lines() {
        if let Some((label, _)) = line.split_once(':') {
            if !label.is_empty() && !label.starts_with(';') {
                defined.push(label.trim().to_string());
            }
        }
    }
    let count = defined.len();
    defined.sort();
    defined.dedup();
    assert_eq!(count, defined.len(), "duplicate label defined:\n{output}");
}

#[test]
fn frame_bytes_balance_on_every_exit() {
    let source = "\
def f(a):
    b = a + 1
    if b < 10:
        return b
    return b - 1
x = f(5)
";
    let output = translate(source);
    let subsp: Vec<&str> = output
        .lines()
        .filter(|l| l.contains("SUBSP"))
        .collect();
    let addsp: Vec<&str> = output
        .lines()
        .filter(|l| l.contains("ADDSP"))
        .collect();
    assert_eq!(subsp.len(), 1);
    assert_eq!(addsp.len(), 2);
    assert!(subsp[0].contains("SUBSP 4,i"));
    assert!(addsp.iter().all(|l| l.contains("ADDSP 4,i")));
}

#[test]
fn every_comparator_maps_to_its_inverse() {
    let cases = [
        ("<", "BRGE"),
        ("<=", "BRGT"),
        (">", "BRLE"),
        (">=", "BRLT"),
        ("==", "BRNE"),
        ("!=", "BREQ"),
    ];
    for (cmp, branch) in cases {
        let source = format!("a = input()\nif a {cmp} 0:\n    print(a)");
        let output = translate(&source);
        assert!(
            output.contains(branch),
            "{cmp} should emit {branch}:\n{output}"
        );
    }
}

#[test]
fn undeclared_identifier_reports_coordinates() {
    let err = translate_err("x = 5\nprint(y)\n");
    assert_eq!(
        err.render("x = 5\nprint(y)\n"),
        "Error at Ln 2, Col 7: Use of undeclared identifier \"y\""
    );
}

#[test]
fn unknown_function_is_rejected() {
    let err = translate_err("x = g(1)");
    assert!(matches!(
        err,
        Error::Compile {
            kind: ErrorKind::UnsupportedCall(_),
            ..
        }
    ));
}

#[test]
fn wrong_arity_is_rejected() {
    let err = translate_err("def f(a):\n    return a\nx = f(1, 2)");
    assert!(matches!(
        err,
        Error::Compile {
            kind: ErrorKind::ArgumentCount { expected: 1, got: 2 },
            ..
        }
    ));
}

#[test]
fn chained_comparison_is_rejected() {
    let err = translate_err("a = input()\nif 0 < a < 9:\n    print(a)");
    assert!(matches!(
        err,
        Error::Compile {
            kind: ErrorKind::MultipleComparisons,
            ..
        }
    ));
}

#[test]
fn unsupported_statements_are_rejected() {
    let err = translate_err("for i in x:\n    print(i)");
    assert!(matches!(
        err,
        Error::Compile {
            kind: ErrorKind::UnsupportedNode("For"),
            ..
        }
    ));
}

#[test]
fn syntax_errors_surface_as_parse_errors() {
    let err = translate_err("def f(:\n");
    assert!(matches!(err, Error::Parse(_)));
}

#[test]
fn exit_emits_stop() {
    let output = translate("exit()");
    assert!(output.contains("STOP"));
}
