//! End-to-end scenarios exercising the full load -> compile -> simulate
//! pipeline against small, hand-built processor descriptions.

use pipesim::common::error::SimError;
use pipesim::common::ident::Capability;
use pipesim::config::{RawProcessor, RawUnit};
use pipesim::microarch::parse;
use pipesim::planner::build_access_plan;
use pipesim::program::HwInstruction;
use pipesim::sim::{Simulator, StallState};

fn unit(name: &str, width: i64, caps: &[&str], read_lock: bool, write_lock: bool) -> RawUnit {
    RawUnit {
        name: name.to_string(),
        width,
        capabilities: caps.iter().map(|s| (*s).to_string()).collect(),
        read_lock,
        write_lock,
        memory_access: Vec::new(),
    }
}

fn edge(a: &str, b: &str) -> Vec<String> {
    vec![a.to_string(), b.to_string()]
}

fn instr(sources: &[&str], dest: &str, cap: &str) -> HwInstruction {
    HwInstruction {
        sources: sources.iter().map(|s| (*s).to_string()).collect(),
        destination: dest.to_string(),
        category: Capability::new(cap),
    }
}

/// S1 — one unit, one instruction, retires in its only cycle.
#[test]
fn s1_single_alu_single_instruction() {
    let raw = RawProcessor {
        units: vec![unit("fullSys", 1, &["ALU"], true, true)],
        data_path: vec![],
    };
    let processor = parse(&raw).unwrap();
    let program = vec![instr(&["R11", "R15"], "R14", "ALU")];
    let plan = build_access_plan(&program);
    let table = Simulator::new(&processor, &program, plan).run().unwrap();

    let cycle0 = table.display_cycle(0, &processor);
    let entries = &cycle0["fullSys"];
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].instr, 0);
    assert_eq!(entries[0].stalled, StallState::NoStall);
}

/// S2 — a single multiplexed input feeds two capability-specific outputs;
/// each instruction is routed to the output matching its category.
#[test]
fn s2_split_input_output() {
    let raw = RawProcessor {
        units: vec![
            unit("input", 2, &["ALU", "MEM"], true, false),
            unit("ALU output", 1, &["ALU"], false, true),
            unit("MEM output", 1, &["MEM"], false, true),
        ],
        data_path: vec![edge("input", "ALU output"), edge("input", "MEM output")],
    };
    let processor = parse(&raw).unwrap();
    let program = vec![instr(&[], "R12", "MEM"), instr(&["R11", "R15"], "R14", "ALU")];
    let plan = build_access_plan(&program);
    let table = Simulator::new(&processor, &program, plan).run().unwrap();

    assert_eq!(table.len(), 2);
    let cycle0 = table.display_cycle(0, &processor);
    let input_entries = &cycle0["input"];
    assert_eq!(input_entries.len(), 2);
    assert!(input_entries.iter().any(|e| e.instr == 0 && e.stalled == StallState::NoStall));
    assert!(input_entries.iter().any(|e| e.instr == 1 && e.stalled == StallState::NoStall));

    let cycle1 = table.display_cycle(1, &processor);
    let alu_out = &cycle1["ALU output"];
    assert_eq!(alu_out.len(), 1);
    assert_eq!(alu_out[0].instr, 1);
    assert_eq!(alu_out[0].stalled, StallState::NoStall);
    let mem_out = &cycle1["MEM output"];
    assert_eq!(mem_out.len(), 1);
    assert_eq!(mem_out[0].instr, 0);
    assert_eq!(mem_out[0].stalled, StallState::NoStall);
}

/// S3 — a narrowing pipeline forces a structural stall partway through,
/// but both instructions eventually retire.
#[test]
fn s3_structural_stall_resolves() {
    let raw = RawProcessor {
        units: vec![
            unit("input", 2, &["ALU"], false, false),
            unit("middle", 2, &["ALU"], false, false),
            unit("output", 1, &["ALU"], true, true),
        ],
        data_path: vec![edge("input", "middle"), edge("middle", "output")],
    };
    let processor = parse(&raw).unwrap();
    let program = vec![instr(&[], "R1", "ALU"), instr(&[], "R2", "ALU")];
    let plan = build_access_plan(&program);
    let table = Simulator::new(&processor, &program, plan).run().unwrap();

    assert_eq!(table.len(), 4);

    let cycle0 = table.display_cycle(0, &processor);
    let input0 = &cycle0["input"];
    assert_eq!(input0.len(), 2);
    assert!(input0.iter().any(|e| e.instr == 0 && e.stalled == StallState::NoStall));
    assert!(input0.iter().any(|e| e.instr == 1 && e.stalled == StallState::NoStall));

    let cycle1 = table.display_cycle(1, &processor);
    let middle1 = &cycle1["middle"];
    assert_eq!(middle1.len(), 2);
    assert!(middle1.iter().any(|e| e.instr == 0 && e.stalled == StallState::NoStall));
    assert!(middle1.iter().any(|e| e.instr == 1 && e.stalled == StallState::NoStall));

    let cycle2 = table.display_cycle(2, &processor);
    let middle2 = &cycle2["middle"];
    assert_eq!(middle2.len(), 1);
    assert_eq!(middle2[0].instr, 1);
    assert_eq!(middle2[0].stalled, StallState::Structural);
    let output2 = &cycle2["output"];
    assert_eq!(output2.len(), 1);
    assert_eq!(output2[0].instr, 0);
    assert_eq!(output2[0].stalled, StallState::NoStall);

    let cycle3 = table.display_cycle(3, &processor);
    let output3 = &cycle3["output"];
    assert_eq!(output3.len(), 1);
    assert_eq!(output3[0].instr, 1);
    assert_eq!(output3[0].stalled, StallState::NoStall);
}

/// S4 — the second instruction waits on a DATA hazard at the shared,
/// locked output until the first retires.
#[test]
fn s4_data_stall_resolves_in_program_order() {
    let raw = RawProcessor {
        units: vec![unit("fullSys", 2, &["ALU"], true, true)],
        data_path: vec![],
    };
    let processor = parse(&raw).unwrap();
    let program = vec![instr(&[], "R1", "ALU"), instr(&["R1"], "R2", "ALU")];
    let plan = build_access_plan(&program);
    let table = Simulator::new(&processor, &program, plan).run().unwrap();
    assert_eq!(table.len(), 2);

    let cycle0 = table.display_cycle(0, &processor);
    let fullsys0 = &cycle0["fullSys"];
    assert_eq!(fullsys0.len(), 2);
    assert!(fullsys0.iter().any(|e| e.instr == 0 && e.stalled == StallState::NoStall));
    assert!(
        fullsys0.iter().any(|e| e.instr == 1 && e.stalled == StallState::Data),
        "instruction 1 must enter DATA while instruction 0's write to R1 is still pending"
    );

    let cycle1 = table.display_cycle(1, &processor);
    let fullsys1 = &cycle1["fullSys"];
    assert_eq!(fullsys1.len(), 1);
    assert_eq!(fullsys1[0].instr, 1);
    assert_eq!(fullsys1[0].stalled, StallState::NoStall, "instruction 1 clears DATA once instruction 0 has retired");
}

/// S5 — a program whose required capability no unit supports never
/// advances, and the simulator reports `SimError::Stall`.
#[test]
fn s5_unfillable_program_raises_stall() {
    let raw = RawProcessor {
        units: vec![unit("fullSys", 1, &["ALU"], false, false)],
        data_path: vec![],
    };
    let processor = parse(&raw).unwrap();
    let program = vec![instr(&[], "R1", "BRANCH")];
    let plan = build_access_plan(&program);
    let err = Simulator::new(&processor, &program, plan).run().unwrap_err();
    assert!(matches!(err, SimError::Stall { .. }));
}

/// S6 — with two equally-eligible inputs, the earlier program index
/// advances first; the later one stalls structurally behind it.
#[test]
fn s6_earliest_instruction_arbitrates_first() {
    let raw = RawProcessor {
        units: vec![
            unit("alu_in", 1, &["ALU"], false, false),
            unit("mem_in", 1, &["MEM"], false, false),
            unit("output", 1, &["ALU", "MEM"], true, true),
        ],
        data_path: vec![edge("alu_in", "output"), edge("mem_in", "output")],
    };
    let processor = parse(&raw).unwrap();
    let program = vec![instr(&[], "R1", "MEM"), instr(&[], "R2", "ALU")];
    let plan = build_access_plan(&program);
    let table = Simulator::new(&processor, &program, plan).run().unwrap();

    let cycle1 = table.display_cycle(1, &processor);
    let output1 = &cycle1["output"];
    assert_eq!(output1.len(), 1);
    assert_eq!(output1[0].instr, 0);
    assert_eq!(output1[0].stalled, StallState::NoStall, "earlier instruction (index 0) should arbitrate first");
    let alu_in1 = &cycle1["alu_in"];
    assert_eq!(alu_in1.len(), 1);
    assert_eq!(alu_in1[0].instr, 1);
    assert_eq!(alu_in1[0].stalled, StallState::Structural, "instruction 1 stalls behind the output it lost arbitration for");
}
