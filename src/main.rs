//! Radiate demo: boot a machine, run a few programs, print the console

use radiate_core::cpu::{AluOp, Register};
use radiate_core::translate::encode;
use radiate_core::{
    console, Instruction, Kernel, KernelConfig, KernelResult, PageNumber, PolicyKind, Priority,
    VERSION,
};

fn reg(index: u8) -> Register {
    Register::new(index).unwrap_or_else(|| panic!("register r{} out of range", index))
}

/// Sum 1..=n into r0 and store it at page 1, offset 0
fn summation(n: u32) -> Vec<u8> {
    let (acc, counter, one) = (reg(0), reg(1), reg(2));
    encode(&[
        Instruction::LoadImm { rd: acc, imm: 0 },
        Instruction::LoadImm { rd: counter, imm: n },
        Instruction::LoadImm { rd: one, imm: 1 },
        Instruction::Alu { op: AluOp::Add, rd: acc, ra: acc, rb: counter },
        Instruction::Alu { op: AluOp::Sub, rd: counter, ra: counter, rb: one },
        Instruction::BranchNonZero { rs: counter, target: 3 },
        Instruction::Store { rs: acc, page: 1, offset: 0 },
        Instruction::Halt,
    ])
}

fn main() -> KernelResult<()> {
    console::init(log::LevelFilter::Info);
    console::print(format_args!("radiate-core v{}", VERSION));

    let config = KernelConfig::new()
        .with_policy(PolicyKind::PriorityAging)
        .with_base_quantum(16);
    let mut kernel = Kernel::new(config);
    kernel.boot()?;

    kernel.memory().allocate(PageNumber(1), 4)?;
    kernel.launch(&summation(100), Priority::new(1))?;
    kernel.launch(&[0x00; 256], Priority::default())?;
    let sleeper = kernel.launch(&encode(&[Instruction::Wait]), Priority::lowest())?;

    let exit = kernel.run(10_000);
    println!("scheduler returned: {:?}", exit);

    kernel.wake(sleeper)?;
    kernel.run(10_000);

    let total = kernel.memory().read_u32(PageNumber(1), 0)?;
    println!("sum(1..=100) = {}", total);

    for process in kernel.list_processes() {
        println!(
            "{} {:?} at {} retired {} in {} dispatches{}",
            process.pid,
            process.state,
            process.priority,
            process.cpu_time,
            process.dispatches,
            process
                .fault
                .as_ref()
                .map(|f| format!(" ({})", f))
                .unwrap_or_default()
        );
    }

    kernel.shutdown();

    println!("--- console ---");
    for line in console::recent_lines() {
        println!("{}", line);
    }
    Ok(())
}
