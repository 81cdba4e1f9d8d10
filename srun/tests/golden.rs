//! End-to-end scenarios: assemble a source text, run the machine against an
//! input stream, and pin the output together with the instruction and tick
//! counters.

use scpu::{simulation, MachineConfig, SimulationResult, Value};
use srun::{encode_input, render_output};

fn run(source: &str, input: &str) -> SimulationResult {
    let assembly = sasm::assemble(source).expect("source assembles");
    simulation(
        &assembly.image,
        encode_input(input),
        &MachineConfig::default(),
    )
    .expect("program runs to completion")
}

#[test]
fn hello_world() {
    let source = r#"
section .data:
s: "hi"
section .text:
push s      ; the character count
out 1
push 2      ; 'h'
out 1
push 3      ; 'i'
out 1
halt
"#;
    let result = run(source, "");

    assert_eq!(result.output, vec![2, 104, 105]);
    assert_eq!(render_output(&result.output), "\u{2}hi");
    assert_eq!(result.instructions, 7);
    assert_eq!(result.ticks, 33);
}

#[test]
fn image_survives_the_file_format() {
    let source = "section .data:\ns: \"hi\"\nsection .text:\npush 2\nout 1\npush 3\nout 1\nhalt";
    let assembly = sasm::assemble(source).expect("source assembles");

    let mut buffer = Vec::new();
    simg::write(&mut buffer, &assembly.image).expect("image serializes");
    let loaded = simg::read(&mut &buffer[..]).expect("image loads");
    assert_eq!(loaded, assembly.image);

    let result = simulation(&loaded, encode_input(""), &MachineConfig::default())
        .expect("loaded image runs");
    assert_eq!(render_output(&result.output), "hi");
}

#[test]
fn empty_input_reads_the_length_prefix() {
    let source = "section .data:\nn: 0\nsection .text:\nin 0\nhalt";
    let result = run(source, "");

    assert_eq!(result.output, Vec::<Value>::new());
    assert_eq!(result.instructions, 2);
    assert_eq!(result.ticks, 7);
}

#[test]
fn counting_loop() {
    let source = r#"
section .data:
n: 3
section .text:
loop: push n
dec
dup
pop n
jnz loop
halt
"#;
    let result = run(source, "");

    assert_eq!(result.output, Vec::<Value>::new());
    assert_eq!(result.instructions, 16);
    assert_eq!(result.ticks, 77);
}

#[test]
fn conditional_branch_on_equal() {
    let source = r#"
section .data:
a: 5
b: 5
section .text:
push a
push b
cmp
drop
drop
jz eq
lit 0
out 1
halt
eq: lit 1
out 1
halt
"#;
    let result = run(source, "");

    assert_eq!(result.output, vec![1]);
    assert_eq!(result.instructions, 9);
    assert_eq!(result.ticks, 34);
}

#[test]
fn conditional_branch_on_unequal() {
    let source = r#"
section .data:
a: 5
b: 6
section .text:
push a
push b
cmp
drop
drop
jz eq
lit 0
out 1
halt
eq: lit 1
out 1
halt
"#;
    let result = run(source, "");

    assert_eq!(result.output, vec![0]);
    assert_eq!(result.instructions, 9);
    assert_eq!(result.ticks, 33);
}

#[test]
fn subroutine_call_returns() {
    let source = r#"
section .data:
section .text:
call f
halt
f: lit 7
out 1
ret
"#;
    let result = run(source, "");

    assert_eq!(result.output, vec![7]);
    assert_eq!(result.instructions, 5);
    assert_eq!(result.ticks, 18);
}

#[test]
fn pointer_indirection_into_a_buffer() {
    let source = r#"
section .data:
buf: bf 4
p: buf
section .text:
lit 42
pop [p]
push [p]
out 1
halt
"#;
    let result = run(source, "");

    assert_eq!(result.output, vec![42]);
    assert_eq!(result.instructions, 5);
    assert_eq!(result.ticks, 22);
}

#[test]
fn echo_copies_input_to_output() {
    let source = r#"
section .data:
n: 0
section .text:
in 0        ; the length prefix
pop n
loop: push n
lit 0
cmp
drop
drop
jz end
in 0
out 1
push n
dec
pop n
jmp loop
end: halt
"#;
    let result = run(source, "ok");

    assert_eq!(render_output(&result.output), "ok");
    assert_eq!(result.instructions, 33);
}

#[test]
fn echo_handles_empty_input() {
    let source = r#"
section .data:
n: 0
section .text:
in 0
pop n
loop: push n
lit 0
cmp
drop
drop
jz end
in 0
out 1
push n
dec
pop n
jmp loop
end: halt
"#;
    let result = run(source, "");

    assert_eq!(result.output, Vec::<Value>::new());
    assert_eq!(result.instructions, 9);
}
