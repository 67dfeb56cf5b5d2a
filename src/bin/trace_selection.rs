//! Trace instruction selection and register allocation on a sample function.
//!
//! Run with `RUST_LOG=debug` (or `--verbose`) to see per-node labeling and
//! per-rule reductions.

use std::process;

use clap::Parser;

use arbor::core::{Backend, BackendConfig};
use arbor::ir::{BinaryOp, CmpOp, IrTree, Node, NodeId, Variable};

#[derive(Parser)]
#[command(name = "trace_selection", version, about = "Trace tree-pattern selection and linear scan")]
struct Args {
    /// Number of allocatable physical registers
    #[arg(short, long, default_value_t = 8)]
    registers: usize,
    /// Log every labeling and reduction step
    #[arg(short, long)]
    verbose: bool,
}

/// `*(p + 8) = f(x * 3, y / z) + 1;  r = p < 100;`
fn sample(tree: &mut IrTree) -> Vec<NodeId> {
    let p = tree.push(Node::Var(Variable::new("p", -8)));
    let eight = tree.push(Node::Literal(8));
    let addr = tree.push(Node::Binary { op: BinaryOp::Add, lhs: p, rhs: eight });
    let target = tree.push(Node::Deref(addr));

    let x = tree.push(Node::Var(Variable::new("x", -16)));
    let three = tree.push(Node::Literal(3));
    let mul = tree.push(Node::Binary { op: BinaryOp::Mul, lhs: x, rhs: three });
    let y = tree.push(Node::Var(Variable::new("y", -24)));
    let z = tree.push(Node::Var(Variable::new("z", -32)));
    let div = tree.push(Node::Binary { op: BinaryOp::Div, lhs: y, rhs: z });
    let call = tree.push(Node::Call { callee: "f".to_string(), args: vec![mul, div] });
    let one = tree.push(Node::Literal(1));
    let value = tree.push(Node::Binary { op: BinaryOp::Add, lhs: call, rhs: one });
    let store = tree.push(Node::Assign { target, value });

    let r = tree.push(Node::Var(Variable::new("r", -40)));
    let p2 = tree.push(Node::Var(Variable::new("p", -8)));
    let hundred = tree.push(Node::Literal(100));
    let cmp = tree.push(Node::Compare { op: CmpOp::Lt, lhs: p2, rhs: hundred });
    let flag = tree.push(Node::Assign { target: r, value: cmp });

    vec![store, flag]
}

fn main() {
    let args = Args::parse();
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Trace)
            .init();
    } else {
        env_logger::init();
    }

    let config = BackendConfig::default().with_register_count(args.registers);
    let backend = match Backend::x64(config) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    println!(
        "rule set: {} rules, automaton: {} states",
        backend.rules().len(),
        backend.automaton().state_count()
    );

    let mut tree = IrTree::new();
    let roots = sample(&mut tree);
    let compiled = match backend.compile_function(&mut tree, &roots) {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    println!("\nInstructions:");
    for (pos, inst) in compiled.stream.iter().enumerate() {
        println!("  [{pos:3}] {:?} {:?}, {:?}", inst.opcode, inst.dst, inst.src);
    }

    println!("\nLive intervals:");
    for interval in &compiled.allocation.intervals {
        let reg = compiled.allocation.register_of(interval.vreg);
        println!("  v{} [{}, {}] -> {:?}", interval.vreg, interval.start, interval.end, reg);
    }
    println!("\nPeak pressure: {}", compiled.allocation.max_pressure);
    println!("\n{}", compiled.stats);
}
