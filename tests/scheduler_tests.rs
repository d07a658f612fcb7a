//! Scheduler integration tests, one section per policy

use radiate_core::cpu::{AluOp, Register};
use radiate_core::sched::{FaultReason, ProcessCounts};
use radiate_core::{
    Cpu, Instruction, KernelConfig, MemoryManager, PolicyKind, Priority, ProcessId, ProcessState,
    Program, RunExit, Scheduler, TickOutcome, PAGE_SIZE,
};

fn nops(n: usize) -> Program {
    let mut instructions = vec![Instruction::Nop; n];
    instructions.push(Instruction::Halt);
    Program::new(instructions)
}

fn machine() -> (Cpu, MemoryManager) {
    let mut cpu = Cpu::new();
    cpu.power_on();
    let memory = MemoryManager::new();
    memory.initialize(16 * PAGE_SIZE).unwrap();
    (cpu, memory)
}

fn started(config: KernelConfig) -> Scheduler {
    let mut sched = Scheduler::from_config(&config);
    sched.start();
    sched
}

/// Tick until idle, recording which process each dispatch ran
fn dispatch_order(sched: &mut Scheduler, cpu: &mut Cpu, memory: &MemoryManager) -> Vec<ProcessId> {
    let mut order = Vec::new();
    for _ in 0..10_000 {
        match sched.tick(cpu, memory) {
            TickOutcome::Ran { pid, .. } => order.push(pid),
            TickOutcome::Idle => break,
            other => panic!("unexpected tick outcome {:?}", other),
        }
        sched.check_invariants().unwrap();
    }
    order
}

// ════════════════════════════════════════════════════════════
// Round-Robin
// ════════════════════════════════════════════════════════════

#[test]
fn round_robin_alternates_equal_priority_processes() {
    let (mut cpu, memory) = machine();
    let mut sched = started(KernelConfig::new().with_base_quantum(3));
    let a = sched.submit_with_priority(nops(20), Priority::new(0));
    let b = sched.submit_with_priority(nops(20), Priority::new(0));

    let order = dispatch_order(&mut sched, &mut cpu, &memory);
    assert!(order.len() > 4);
    // While both are live neither runs twice in a row
    let both_live = order.len() - 1;
    for window in order[..both_live].windows(2) {
        assert_ne!(window[0], window[1], "order: {:?}", order);
    }
    assert_eq!(order[0], a);
    assert_eq!(order[1], b);
}

#[test]
fn round_robin_serves_higher_levels_first() {
    let (mut cpu, memory) = machine();
    let mut sched = started(KernelConfig::new().with_base_quantum(64));
    let low = sched.submit_with_priority(nops(1), Priority::new(4));
    let high = sched.submit_with_priority(nops(1), Priority::new(1));
    let order = dispatch_order(&mut sched, &mut cpu, &memory);
    assert_eq!(order, vec![high, low]);
}

#[test]
fn round_robin_never_demotes() {
    let (mut cpu, memory) = machine();
    let mut sched = started(
        KernelConfig::new()
            .with_base_quantum(1)
            .with_demotion_threshold(1),
    );
    let pid = sched.submit_with_priority(nops(10), Priority::new(0));
    dispatch_order(&mut sched, &mut cpu, &memory);
    assert_eq!(sched.process(pid).unwrap().priority, Priority::new(0));
    assert_eq!(sched.stats().demotions, 0);
}

// ════════════════════════════════════════════════════════════
// Priority with aging
// ════════════════════════════════════════════════════════════

#[test]
fn aging_lets_starved_process_climb() {
    let (mut cpu, memory) = machine();
    let mut sched = started(
        KernelConfig::new()
            .with_policy(PolicyKind::PriorityAging)
            .with_base_quantum(1)
            .with_aging_threshold(3)
            .with_demotion_threshold(1000),
    );
    let hog = sched.submit_with_priority(nops(100), Priority::new(0));
    let starved = sched.submit_with_priority(nops(1), Priority::new(2));

    // Ticks 1..=3: the hog runs; tick 4 promotes the starved process to
    // level 1; tick 8 promotes it to level 0 behind the hog
    for _ in 0..8 {
        sched.tick(&mut cpu, &memory);
    }
    assert_eq!(sched.process(starved).unwrap().priority, Priority::new(0));
    assert_eq!(sched.stats().promotions, 2);

    let order = dispatch_order(&mut sched, &mut cpu, &memory);
    assert!(order.contains(&starved));
    assert_eq!(sched.process(starved).unwrap().state, ProcessState::Terminated);
    assert_eq!(sched.process(hog).unwrap().cpu_time, 100);
}

#[test]
fn aging_demotes_cpu_bound_process() {
    let (mut cpu, memory) = machine();
    let mut sched = started(
        KernelConfig::new()
            .with_policy(PolicyKind::PriorityAging)
            .with_base_quantum(2)
            .with_demotion_threshold(3)
            .with_aging_threshold(10_000),
    );
    let pid = sched.submit_with_priority(nops(1000), Priority::new(0));
    dispatch_order(&mut sched, &mut cpu, &memory);
    let snap = sched.process(pid).unwrap();
    assert_eq!(snap.priority, Priority::lowest());
    assert_eq!(snap.base_priority, Priority::new(0));
    assert_eq!(snap.cpu_time, 1000);
    assert_eq!(sched.stats().demotions, 4);
}

// ════════════════════════════════════════════════════════════
// Shortest-Job-First
// ════════════════════════════════════════════════════════════

#[test]
fn sjf_runs_shortest_first_ties_by_submission() {
    let (mut cpu, memory) = machine();
    let mut sched = started(
        KernelConfig::new()
            .with_policy(PolicyKind::ShortestJobFirst)
            .with_base_quantum(1000),
    );
    let long = sched.submit(nops(50));
    let short_a = sched.submit(nops(5));
    let short_b = sched.submit(nops(5));
    let medium = sched.submit_with_priority(nops(20), Priority::new(0));

    let order = dispatch_order(&mut sched, &mut cpu, &memory);
    assert_eq!(order, vec![short_a, short_b, medium, long]);
}

#[test]
fn sjf_reestimates_partially_run_processes() {
    let (mut cpu, memory) = machine();
    let mut sched = started(
        KernelConfig::new()
            .with_policy(PolicyKind::ShortestJobFirst)
            .with_base_quantum(8),
    );
    let a = sched.submit(nops(12));
    sched.tick(&mut cpu, &memory);
    // a has 5 instructions left; b is longer
    let b = sched.submit(nops(6));
    let order = dispatch_order(&mut sched, &mut cpu, &memory);
    assert_eq!(order, vec![a, b]);
}

// ════════════════════════════════════════════════════════════
// Real-time
// ════════════════════════════════════════════════════════════

#[test]
fn realtime_band_runs_to_completion_first() {
    let (mut cpu, memory) = machine();
    let mut sched = started(
        KernelConfig::new()
            .with_policy(PolicyKind::RealTime)
            .with_base_quantum(2),
    );
    let background = sched.submit_with_priority(nops(10), Priority::new(3));
    let rt = sched.submit_with_priority(nops(500), Priority::realtime());

    let order = dispatch_order(&mut sched, &mut cpu, &memory);
    let first_background = order.iter().position(|&pid| pid == background).unwrap();
    assert!(first_background > 0);
    assert!(order[..first_background].iter().all(|&pid| pid == rt));
    assert!(order[first_background..].iter().all(|&pid| pid == background));
    assert_eq!(sched.process(rt).map(|p| p.cpu_time), Some(500));
    assert_eq!(sched.process(background).map(|p| p.cpu_time), Some(10));
}

#[test]
fn realtime_band_is_fifo() {
    let (mut cpu, memory) = machine();
    let mut sched = started(
        KernelConfig::new()
            .with_policy(PolicyKind::RealTime)
            .with_base_quantum(2),
    );
    let a = sched.submit_with_priority(nops(30), Priority::realtime());
    let b = sched.submit_with_priority(nops(30), Priority::realtime());

    let order = dispatch_order(&mut sched, &mut cpu, &memory);
    let first_b = order.iter().position(|&pid| pid == b).unwrap();
    assert!(first_b > 1, "order: {:?}", order);
    assert!(order[..first_b].iter().all(|&pid| pid == a));
    assert!(order[first_b..].iter().all(|&pid| pid == b));
}

#[test]
fn realtime_process_preempts_partly_run_process() {
    let (mut cpu, memory) = machine();
    let mut sched = started(
        KernelConfig::new()
            .with_policy(PolicyKind::RealTime)
            .with_base_quantum(2),
    );
    let background = sched.submit_with_priority(nops(40), Priority::new(3));
    assert_eq!(
        sched.tick(&mut cpu, &memory),
        TickOutcome::Ran {
            pid: background,
            retired: 8,
            state: ProcessState::Ready
        }
    );

    let rt = sched.submit_with_priority(nops(5), Priority::realtime());
    assert_eq!(
        sched.tick(&mut cpu, &memory),
        TickOutcome::Ran {
            pid: rt,
            retired: 5,
            state: ProcessState::Terminated
        }
    );
    assert_eq!(sched.run(&mut cpu, &memory, 100), RunExit::Idle);
    assert_eq!(sched.process(background).map(|p| p.cpu_time), Some(40));
}

#[test]
fn looping_realtime_process_still_yields_ticks() {
    let (mut cpu, memory) = machine();
    let mut sched = started(
        KernelConfig::new()
            .with_policy(PolicyKind::RealTime)
            .with_base_quantum(4),
    );
    let spinner = sched.submit_with_priority(
        Program::new(vec![Instruction::Jump { target: 0 }]),
        Priority::realtime(),
    );
    let background = sched.submit_with_priority(nops(1), Priority::new(2));

    assert_eq!(sched.run(&mut cpu, &memory, 1), RunExit::TickLimit);
    assert_eq!(sched.run(&mut cpu, &memory, 50), RunExit::TickLimit);
    assert_eq!(sched.process(spinner).map(|p| p.state), Some(ProcessState::Ready));
    assert_eq!(sched.process(spinner).map(|p| p.dispatches), Some(51));
    // The spinner keeps the band; lower levels wait
    assert_eq!(sched.process(background).map(|p| p.cpu_time), Some(0));

    sched.stop_handle().request_stop();
    assert_eq!(sched.run(&mut cpu, &memory, 1000), RunExit::Stopped);

    sched.start();
    sched.kill(spinner).unwrap();
    assert_eq!(sched.run(&mut cpu, &memory, 10), RunExit::Idle);
    assert_eq!(sched.process(spinner).and_then(|p| p.fault), Some(FaultReason::Killed));
    assert_eq!(sched.process(background).map(|p| p.cpu_time), Some(1));
}

// ════════════════════════════════════════════════════════════
// Lifecycle
// ════════════════════════════════════════════════════════════

#[test]
fn memory_fault_terminates_only_the_faulting_process() {
    let (mut cpu, memory) = machine();
    let mut sched = started(KernelConfig::new());
    let r1 = Register::new(1).unwrap();
    let faulty = sched.submit(Program::new(vec![
        Instruction::Load { rd: r1, page: 9, offset: 0 },
        Instruction::Halt,
    ]));
    let healthy = sched.submit(nops(4));

    assert_eq!(sched.run(&mut cpu, &memory, 100), RunExit::Idle);
    let faulty = sched.process(faulty).unwrap();
    assert_eq!(faulty.state, ProcessState::Terminated);
    assert!(matches!(faulty.fault, Some(FaultReason::Cpu(_))));
    assert_eq!(sched.process(healthy).unwrap().fault, None);
    assert_eq!(
        sched.counts(),
        ProcessCounts {
            terminated: 2,
            ..ProcessCounts::default()
        }
    );
}

#[test]
fn processes_share_memory() {
    let (mut cpu, memory) = machine();
    memory.allocate(radiate_core::PageNumber(2), 4).unwrap();
    let mut sched = started(KernelConfig::new());
    let r0 = Register::new(0).unwrap();
    let r1 = Register::new(1).unwrap();

    sched.submit(Program::new(vec![
        Instruction::LoadImm { rd: r0, imm: 40 },
        Instruction::LoadImm { rd: r1, imm: 2 },
        Instruction::Alu { op: AluOp::Add, rd: r0, ra: r0, rb: r1 },
        Instruction::Store { rs: r0, page: 2, offset: 0 },
        Instruction::Halt,
    ]));
    let reader = sched.submit(Program::new(vec![
        Instruction::Load { rd: r0, page: 2, offset: 0 },
        Instruction::BranchZero { rs: r0, target: 3 },
        Instruction::Halt,
        Instruction::Jump { target: 99 },
    ]));

    sched.run(&mut cpu, &memory, 100);
    assert_eq!(sched.process(reader).unwrap().fault, None);
    assert_eq!(memory.read_u32(radiate_core::PageNumber(2), 0).unwrap(), 42);
}

#[test]
fn kill_waiting_process() {
    let (mut cpu, memory) = machine();
    let mut sched = started(KernelConfig::new());
    let pid = sched.submit(Program::new(vec![Instruction::Wait, Instruction::Halt]));
    sched.run(&mut cpu, &memory, 10);
    assert_eq!(sched.process(pid).unwrap().state, ProcessState::Waiting);

    sched.kill(pid).unwrap();
    sched.check_invariants().unwrap();
    assert_eq!(sched.process(pid).unwrap().state, ProcessState::Ready);
    sched.run(&mut cpu, &memory, 10);
    let snap = sched.process(pid).unwrap();
    assert_eq!(snap.state, ProcessState::Terminated);
    assert_eq!(snap.fault, Some(FaultReason::Killed));
    assert_eq!(sched.stats().kills, 1);
}

#[test]
fn stop_and_restart_preserve_queues() {
    let (mut cpu, memory) = machine();
    let mut sched = started(KernelConfig::new().with_base_quantum(1));
    let a = sched.submit(nops(5));
    let b = sched.submit(nops(5));
    sched.tick(&mut cpu, &memory);
    sched.stop();
    assert_eq!(sched.tick(&mut cpu, &memory), TickOutcome::Stopped);
    sched.check_invariants().unwrap();
    assert_eq!(sched.counts().ready, 2);

    sched.start();
    sched.run(&mut cpu, &memory, 1000);
    assert_eq!(sched.process(a).unwrap().cpu_time, 5);
    assert_eq!(sched.process(b).unwrap().cpu_time, 5);
}

#[test]
fn stop_handle_from_another_thread() {
    let (mut cpu, memory) = machine();
    let mut sched = started(KernelConfig::new().with_base_quantum(1));
    sched.submit(nops(10_000));
    let handle = sched.stop_handle();

    let stopper = std::thread::spawn(move || handle.request_stop());
    stopper.join().unwrap();

    assert_eq!(sched.run(&mut cpu, &memory, u64::MAX), RunExit::Stopped);
    assert!(!sched.is_started());
    sched.check_invariants().unwrap();
}

#[test]
fn tick_budget_is_respected() {
    let (mut cpu, memory) = machine();
    let mut sched = started(KernelConfig::new().with_base_quantum(1));
    sched.submit(nops(100));
    assert_eq!(sched.run(&mut cpu, &memory, 10), RunExit::TickLimit);
    assert_eq!(sched.stats().ticks, 10);
}
